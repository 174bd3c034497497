// In-crate fakes for the audio device and transport collaborators

use parking_lot::Mutex;
use std::sync::Arc;

use crate::audio::{AudioBuffer, AudioDevice, DeviceFactory, DeviceState};
use crate::error::{PlayerError, Result};
use crate::settings::PlayerConfiguration;
use crate::transport::{EventSink, TaggedEvent, Transport, TransportEvent, TransportHandle};

#[derive(Debug, Clone)]
pub struct Scheduled {
    pub start: f64,
    pub now: f64,
    pub buffer: AudioBuffer,
}

#[derive(Debug)]
pub struct FakeDeviceInner {
    pub now: f64,
    pub state: DeviceState,
    pub initial_state: DeviceState,
    pub scheduled: Vec<Scheduled>,
    pub resumes: usize,
    pub closes: usize,
    pub opens: usize,
    pub gain: f32,
    pub magnitudes: Vec<u8>,
    pub fail_open: bool,
    pub fail_schedule: bool,
    // added to every requested start, like an output that renders ahead
    pub start_lag: f64,
}

/// Manually clocked device; clones share state so tests can inspect it
#[derive(Debug, Clone)]
pub struct FakeDevice {
    pub inner: Arc<Mutex<FakeDeviceInner>>,
}

impl FakeDevice {
    pub fn new(initial_state: DeviceState, bin_count: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeDeviceInner {
                now: 0.0,
                state: initial_state,
                initial_state,
                scheduled: Vec::new(),
                resumes: 0,
                closes: 0,
                opens: 0,
                gain: 1.0,
                magnitudes: vec![0; bin_count],
                fail_open: false,
                fail_schedule: false,
                start_lag: 0.0,
            })),
        }
    }

    pub fn running() -> Self {
        Self::new(DeviceState::Running, 1024)
    }

    pub fn suspended() -> Self {
        Self::new(DeviceState::Suspended, 1024)
    }

    pub fn advance(&self, secs: f64) {
        self.inner.lock().now += secs;
    }

    pub fn set_magnitudes(&self, value: u8) {
        self.inner.lock().magnitudes.iter_mut().for_each(|m| *m = value);
    }

    pub fn scheduled(&self) -> Vec<Scheduled> {
        self.inner.lock().scheduled.clone()
    }
}

impl AudioDevice for FakeDevice {
    fn current_time(&self) -> f64 {
        self.inner.lock().now
    }

    fn state(&self) -> DeviceState {
        self.inner.lock().state
    }

    fn resume(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.resumes += 1;
        inner.state = DeviceState::Running;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.closes += 1;
        inner.state = DeviceState::Closed;
        Ok(())
    }

    fn set_gain(&mut self, gain: f32) {
        self.inner.lock().gain = gain;
    }

    fn schedule(&mut self, buffer: AudioBuffer, start_at: f64) -> Result<f64> {
        let mut inner = self.inner.lock();
        if inner.fail_schedule {
            return Err(PlayerError::Device("schedule rejected".into()));
        }
        let now = inner.now;
        let start = start_at + inner.start_lag;
        inner.scheduled.push(Scheduled { start, now, buffer });
        Ok(start)
    }

    fn frequency_bin_count(&self) -> usize {
        self.inner.lock().magnitudes.len()
    }

    fn frequency_data(&mut self, out: &mut [u8]) {
        let inner = self.inner.lock();
        for (o, m) in out.iter_mut().zip(inner.magnitudes.iter()) {
            *o = *m;
        }
    }
}

/// Hands out the same shared [`FakeDevice`], reset to its initial state
impl DeviceFactory for FakeDevice {
    type Device = FakeDevice;

    fn open(&mut self, _config: &PlayerConfiguration) -> Result<FakeDevice> {
        let mut inner = self.inner.lock();
        if inner.fail_open {
            return Err(PlayerError::NoOutputDevice);
        }
        inner.opens += 1;
        inner.state = inner.initial_state;
        Ok(self.clone())
    }
}

#[derive(Debug, Default)]
pub struct FakeTransportInner {
    pub endpoints: Vec<String>,
    pub sink: Option<EventSink>,
    pub closes: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FakeTransport {
    pub inner: Arc<Mutex<FakeTransportInner>>,
}

impl FakeTransport {
    /// Event tagged for the most recent connection
    pub fn tagged(&self, event: TransportEvent) -> TaggedEvent {
        let inner = self.inner.lock();
        let generation = inner.sink.as_ref().map_or(0, EventSink::generation);
        TaggedEvent { generation, event }
    }

    /// Push an event through the real channel, as a network task would
    pub fn emit(&self, event: TransportEvent) -> bool {
        let inner = self.inner.lock();
        inner.sink.as_ref().is_some_and(|sink| sink.emit(event))
    }

    pub fn closes(&self) -> usize {
        self.inner.lock().closes
    }
}

struct FakeHandle {
    inner: Arc<Mutex<FakeTransportInner>>,
}

impl TransportHandle for FakeHandle {
    fn close(&mut self) {
        self.inner.lock().closes += 1;
    }
}

impl Transport for FakeTransport {
    fn open(&mut self, endpoint: &str, events: EventSink) -> Result<Box<dyn TransportHandle>> {
        let mut inner = self.inner.lock();
        inner.endpoints.push(endpoint.to_string());
        inner.sink = Some(events);
        Ok(Box::new(FakeHandle { inner: self.inner.clone() }))
    }
}

/// Interleaved 16-bit payload of `frames` frames, every sample set to `value`
pub fn pcm_payload(frames: usize, channels: u16, value: i16) -> Vec<u8> {
    std::iter::repeat(value.to_le_bytes())
        .take(frames * channels as usize)
        .flatten()
        .collect()
}
