// Frame queue
// FIFO of decoded frames plus the duration of audio not yet scheduled

use std::collections::VecDeque;

use crate::audio::AudioFrame;

pub struct FrameQueue {
    frames: VecDeque<AudioFrame>,
    buffered_secs: f64,
    channels: u16,
    sample_rate: u32,
    max_secs: Option<f64>,
}

impl FrameQueue {
    /// Unbounded queue
    pub fn new(channels: u16, sample_rate: u32) -> Self {
        Self {
            frames: VecDeque::new(),
            buffered_secs: 0.0,
            channels,
            sample_rate,
            max_secs: None,
        }
    }

    /// Queue that sheds its oldest frames once more than `max_secs` of
    /// audio is waiting. The newest frame is always kept.
    pub fn with_limit(channels: u16, sample_rate: u32, max_secs: Option<f64>) -> Self {
        Self {
            max_secs,
            ..Self::new(channels, sample_rate)
        }
    }

    /// Append to the tail. Returns how many old frames were shed to stay
    /// under the limit.
    pub fn push(&mut self, frame: AudioFrame) -> usize {
        self.buffered_secs += frame.duration(self.channels, self.sample_rate);
        self.frames.push_back(frame);

        let mut dropped = 0;
        if let Some(max) = self.max_secs {
            while self.buffered_secs > max && self.frames.len() > 1 {
                self.drop_oldest();
                dropped += 1;
            }
        }
        dropped
    }

    /// Take the oldest frame. Buffered duration is left to the scheduler,
    /// which subtracts what it actually schedules.
    pub fn pop(&mut self) -> Option<AudioFrame> {
        self.frames.pop_front()
    }

    /// Drop the oldest frame and account for its duration
    pub fn drop_oldest(&mut self) -> Option<AudioFrame> {
        let frame = self.frames.pop_front()?;
        self.consume(frame.duration(self.channels, self.sample_rate));
        Some(frame)
    }

    /// Subtract scheduled audio, floored at zero
    pub fn consume(&mut self, secs: f64) {
        self.buffered_secs = (self.buffered_secs - secs).max(0.0);
    }

    pub fn clear(&mut self) {
        self.frames.clear();
        self.buffered_secs = 0.0;
    }

    pub fn buffered_secs(&self) -> f64 {
        self.buffered_secs
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
