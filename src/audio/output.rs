// Audio output using cpal
// Mixes buffers scheduled at absolute frame positions and exposes the
// rendered frame count as the device clock

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};
use parking_lot::Mutex;
use ringbuf::{traits::{Consumer, Producer, Split}, HeapRb};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::audio::analyser::Analyser;
use crate::audio::buffer::AudioBuffer;
use crate::audio::device::{AudioDevice, DeviceFactory, DeviceState};
use crate::error::{PlayerError, Result};
use crate::settings::PlayerConfiguration;

type TapProducer = ringbuf::HeapProd<f32>;
type TapConsumer = ringbuf::HeapCons<f32>;

struct Voice {
    start_frame: u64,
    buffer: AudioBuffer,
}

impl Voice {
    fn end_frame(&self) -> u64 {
        self.start_frame + self.buffer.frames() as u64
    }
}

/// Buffers waiting for, or in the middle of, playback
#[derive(Default)]
struct Mixer {
    voices: Vec<Voice>,
    // first frame not yet rendered
    rendered: u64,
}

impl Mixer {
    /// Add a voice. A start already rendered past is moved up to the next
    /// unrendered frame so the buffer still plays from its first sample.
    /// Returns the frame it will actually start on.
    fn add(&mut self, start_frame: u64, buffer: AudioBuffer) -> u64 {
        let start_frame = start_frame.max(self.rendered);
        self.voices.push(Voice { start_frame, buffer });
        start_frame
    }

    /// Render the next `out.len() / out_channels` frames into `out`
    /// (interleaved), then drop finished voices.
    fn render(&mut self, out: &mut [f32], out_channels: usize, gain: f32) {
        out.iter_mut().for_each(|s| *s = 0.0);
        let frames = (out.len() / out_channels) as u64;
        let base = self.rendered;
        let end = base + frames;

        for voice in &self.voices {
            if voice.start_frame >= end || voice.end_frame() <= base {
                continue;
            }
            let from = voice.start_frame.max(base);
            let to = voice.end_frame().min(end);
            let planes = voice.buffer.channel_count();

            for abs in from..to {
                let src = (abs - voice.start_frame) as usize;
                let dst = (abs - base) as usize * out_channels;
                for ch in 0..out_channels {
                    let value = match (planes, out_channels) {
                        (1, _) => voice.buffer.channel(0)[src],
                        (_, 1) => 0.5 * (voice.buffer.channel(0)[src] + voice.buffer.channel(1)[src]),
                        _ if ch < planes => voice.buffer.channel(ch)[src],
                        _ => 0.0,
                    };
                    out[dst + ch] += value;
                }
            }
        }

        if gain != 1.0 {
            out.iter_mut().for_each(|s| *s *= gain);
        }
        self.voices.retain(|v| v.end_frame() > end);
        self.rendered = end;
    }
}

pub struct CpalDevice {
    stream: Option<Stream>,
    state: DeviceState,
    sample_rate: u32,
    mixer: Arc<Mutex<Mixer>>,
    frames_rendered: Arc<AtomicU64>,
    gain: Arc<Mutex<f32>>,
    tap: TapConsumer,
    analyser: Analyser,
    tap_scratch: Vec<f32>,
}

impl CpalDevice {
    /// Open the default output device at the configured sample rate.
    /// The stream starts suspended.
    pub fn new(config: &PlayerConfiguration) -> Result<Self> {
        let host = cpal::default_host();

        let device = host.default_output_device()
            .ok_or(PlayerError::NoOutputDevice)?;

        let supported = Self::pick_config(&device, config.sample_rate, config.channels)?;
        let sample_format = supported.sample_format();
        let stream_config: StreamConfig = supported.into();
        let out_channels = stream_config.channels as usize;

        // ~0.5 s of mono post-gain audio for the analyser
        let tap = HeapRb::<f32>::new(config.sample_rate as usize / 2);
        let (producer, consumer) = tap.split();

        let mixer = Arc::new(Mutex::new(Mixer::default()));
        let frames_rendered = Arc::new(AtomicU64::new(0));
        let gain = Arc::new(Mutex::new(1.0f32));

        let shared = CallbackShared {
            mixer: mixer.clone(),
            frames_rendered: frames_rendered.clone(),
            gain: gain.clone(),
            tap: producer,
            out_channels,
            scratch: Vec::new(),
        };

        let stream = match sample_format {
            cpal::SampleFormat::F32 => Self::build_stream::<f32>(&device, &stream_config, shared)?,
            cpal::SampleFormat::I16 => Self::build_stream::<i16>(&device, &stream_config, shared)?,
            cpal::SampleFormat::U16 => Self::build_stream::<u16>(&device, &stream_config, shared)?,
            format => {
                return Err(PlayerError::Device(format!("Unsupported sample format: {:?}", format)))
            }
        };

        // Some hosts start streams immediately
        if let Err(e) = stream.pause() {
            log::warn!("output stream could not be paused, starting live: {}", e);
        }

        log::info!(
            "opened output device at {} Hz, {} channel(s), {:?}",
            config.sample_rate, out_channels, sample_format
        );

        Ok(Self {
            stream: Some(stream),
            state: DeviceState::Suspended,
            sample_rate: config.sample_rate,
            mixer,
            frames_rendered,
            gain,
            tap: consumer,
            analyser: Analyser::new(config.visualizer.fft_size),
            tap_scratch: Vec::with_capacity(config.visualizer.fft_size),
        })
    }

    fn pick_config(
        device: &cpal::Device,
        sample_rate: u32,
        channels: u16,
    ) -> Result<cpal::SupportedStreamConfig> {
        let rate = SampleRate(sample_rate);
        let mut ranges: Vec<_> = device
            .supported_output_configs()?
            .filter(|r| r.min_sample_rate() <= rate && rate <= r.max_sample_rate())
            .collect();

        // Prefer the stream's own channel count, then f32 output
        ranges.sort_by_key(|r| {
            (
                r.channels() != channels,
                r.sample_format() != cpal::SampleFormat::F32,
            )
        });

        ranges
            .into_iter()
            .next()
            .map(|r| r.with_sample_rate(rate))
            .ok_or(PlayerError::UnsupportedStreamConfig { sample_rate, channels })
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &cpal::Device,
        config: &StreamConfig,
        mut shared: CallbackShared,
    ) -> Result<Stream> {
        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                shared.fill(data);
            },
            move |err| {
                log::error!("audio output error: {}", err);
            },
            None,
        )?;

        Ok(stream)
    }

    /// Names of the output devices on the default host
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host
            .output_devices()
            .map_err(|e| PlayerError::Device(format!("Failed to list devices: {}", e)))?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }
}

/// State moved into the realtime callback
struct CallbackShared {
    mixer: Arc<Mutex<Mixer>>,
    frames_rendered: Arc<AtomicU64>,
    gain: Arc<Mutex<f32>>,
    tap: TapProducer,
    out_channels: usize,
    scratch: Vec<f32>,
}

impl CallbackShared {
    fn fill<T: cpal::SizedSample + cpal::FromSample<f32>>(&mut self, data: &mut [T]) {
        if self.scratch.len() != data.len() {
            self.scratch.resize(data.len(), 0.0);
        }

        let gain = *self.gain.lock();
        {
            // The clock moves under the mixer lock, so a concurrent schedule
            // sees either the old block unrendered or the new clock
            let mut mixer = self.mixer.lock();
            mixer.render(&mut self.scratch, self.out_channels, gain);
            self.frames_rendered.store(mixer.rendered, Ordering::Release);
        }

        for (sample, &value) in data.iter_mut().zip(self.scratch.iter()) {
            *sample = T::from_sample(value);
        }

        // Mono mix for the analyser; drop on overflow
        for frame in self.scratch.chunks_exact(self.out_channels) {
            let mono = frame.iter().sum::<f32>() / self.out_channels as f32;
            if self.tap.try_push(mono).is_err() {
                break;
            }
        }
    }
}

impl AudioDevice for CpalDevice {
    fn current_time(&self) -> f64 {
        self.frames_rendered.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }

    fn state(&self) -> DeviceState {
        self.state
    }

    fn resume(&mut self) -> Result<()> {
        if let Some(stream) = &self.stream {
            stream.play()?;
            self.state = DeviceState::Running;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        // Dropping the stream stops the callback
        self.stream = None;
        self.mixer.lock().voices.clear();
        self.state = DeviceState::Closed;
        Ok(())
    }

    fn set_gain(&mut self, gain: f32) {
        *self.gain.lock() = gain.clamp(0.0, 1.0);
    }

    fn schedule(&mut self, buffer: AudioBuffer, start_at: f64) -> Result<f64> {
        if self.state == DeviceState::Closed {
            return Ok(start_at);
        }
        let start_frame = (start_at * self.sample_rate as f64).round().max(0.0) as u64;
        let actual = self.mixer.lock().add(start_frame, buffer);
        Ok(actual as f64 / self.sample_rate as f64)
    }

    fn frequency_bin_count(&self) -> usize {
        self.analyser.bin_count()
    }

    fn frequency_data(&mut self, out: &mut [u8]) {
        self.tap_scratch.clear();
        while let Some(s) = self.tap.try_pop() {
            self.tap_scratch.push(s);
        }
        self.analyser.push_samples(&self.tap_scratch);
        self.analyser.byte_frequency_data(out);
    }
}

/// Opens a [`CpalDevice`] per connection
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalDeviceFactory;

impl DeviceFactory for CpalDeviceFactory {
    type Device = CpalDevice;

    fn open(&mut self, config: &PlayerConfiguration) -> Result<CpalDevice> {
        CpalDevice::new(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(mixer: &mut Mixer, start_frame: u64, samples: &[f32], channels: u16) -> u64 {
        mixer.add(start_frame, AudioBuffer::from_interleaved(samples, channels, 48000))
    }

    #[test]
    fn test_back_to_back_voices_are_contiguous() {
        let mut mixer = Mixer::default();
        add(&mut mixer, 0, &[1.0, 1.0, 1.0], 1);
        add(&mut mixer, 3, &[2.0, 2.0], 1);

        let mut out = vec![0.0; 6];
        mixer.render(&mut out, 1, 1.0);
        assert_eq!(out, vec![1.0, 1.0, 1.0, 2.0, 2.0, 0.0]);
        assert!(mixer.voices.is_empty());
        assert_eq!(mixer.rendered, 6);
    }

    #[test]
    fn test_voice_spanning_callbacks() {
        let mut mixer = Mixer::default();
        add(&mut mixer, 2, &[0.5, 0.5, 0.5, 0.5], 1);

        let mut out = vec![0.0; 4];
        mixer.render(&mut out, 1, 1.0);
        assert_eq!(out, vec![0.0, 0.0, 0.5, 0.5]);
        assert_eq!(mixer.voices.len(), 1);

        mixer.render(&mut out, 1, 1.0);
        assert_eq!(out, vec![0.5, 0.5, 0.0, 0.0]);
        assert!(mixer.voices.is_empty());
    }

    #[test]
    fn test_late_voice_plays_from_first_sample() {
        let mut mixer = Mixer::default();
        let mut out = vec![0.0; 4];
        // the clock read 0, then a block was rendered before the voice landed
        mixer.render(&mut out, 1, 1.0);

        let start = add(&mut mixer, 0, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 1);
        assert_eq!(start, 4);

        mixer.render(&mut out, 1, 1.0);
        assert_eq!(out, vec![1.0, 2.0, 3.0, 4.0]);
        mixer.render(&mut out, 1, 1.0);
        assert_eq!(out, vec![5.0, 6.0, 0.0, 0.0]);
        assert!(mixer.voices.is_empty());
    }

    #[test]
    fn test_channel_mapping_and_gain() {
        let mut mixer = Mixer::default();
        add(&mut mixer, 0, &[0.4, 0.8], 2);

        let mut stereo = vec![0.0; 2];
        mixer.render(&mut stereo, 2, 0.5);
        assert_eq!(stereo, vec![0.2, 0.4]);

        let mut mixer = Mixer::default();
        add(&mut mixer, 0, &[0.4, 0.8], 2);
        let mut mono = vec![0.0; 1];
        mixer.render(&mut mono, 1, 1.0);
        assert!((mono[0] - 0.6).abs() < 1e-6);

        let mut mixer = Mixer::default();
        add(&mut mixer, 0, &[0.3], 1);
        let mut quad = vec![0.0; 4];
        mixer.render(&mut quad, 4, 1.0);
        assert_eq!(quad, vec![0.3; 4]);
    }
}
