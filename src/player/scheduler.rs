// Playback scheduler
// Moves one frame per tick from the queue onto the device clock, back to back

use crate::audio::{AudioBuffer, AudioDevice, DeviceState};
use crate::error::Result;
use crate::player::queue::FrameQueue;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Nothing queued, or no usable output
    Idle,
    /// Output suspended; frames stay queued until the gate resumes it
    Held,
    Scheduled { start: f64, duration: f64, underrun: bool },
}

pub struct PlaybackScheduler {
    cursor: f64,
    channels: u16,
    sample_rate: u32,
}

impl PlaybackScheduler {
    pub fn new(channels: u16, sample_rate: u32) -> Self {
        Self {
            cursor: 0.0,
            channels,
            sample_rate,
        }
    }

    /// Next start time on the device clock
    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    /// Re-anchor on a fresh device
    pub fn reset(&mut self, now: f64) {
        self.cursor = now;
    }

    pub fn tick<D: AudioDevice>(
        &mut self,
        queue: &mut FrameQueue,
        device: Option<&mut D>,
    ) -> Result<TickOutcome> {
        let Some(device) = device else {
            return Ok(TickOutcome::Idle);
        };
        match device.state() {
            DeviceState::Closed => return Ok(TickOutcome::Idle),
            DeviceState::Suspended => return Ok(TickOutcome::Held),
            DeviceState::Running => {}
        }
        let Some(frame) = queue.pop() else {
            return Ok(TickOutcome::Idle);
        };

        let buffer = AudioBuffer::from_interleaved(frame.samples(), self.channels, self.sample_rate);
        let duration = buffer.duration();

        // Behind the hardware: the previous audio ran out before this tick.
        // Restart at "now" and accept the gap.
        let now = device.current_time();
        let underrun = self.cursor < now;
        if underrun {
            log::debug!("underrun: cursor {:.4}s behind by {:.4}s", self.cursor, now - self.cursor);
            self.cursor = now;
        }

        // The frame has left the queue whether or not the device took it
        let scheduled = device.schedule(buffer, self.cursor);
        queue.consume(duration);
        let start = scheduled?;
        self.cursor = start + duration;

        Ok(TickOutcome::Scheduled { start, duration, underrun })
    }
}
