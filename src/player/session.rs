// Connection session
// Owns the transport link, the output device and all playback state.
// Every entry point runs to completion; the driver serialises the calls.

use tokio::sync::mpsc;

use crate::audio::{decode_frame, logarithmic_volume, AudioDevice, DeviceFactory, DeviceState};
use crate::error::Result;
use crate::player::gate::BufferingGate;
use crate::player::queue::FrameQueue;
use crate::player::scheduler::PlaybackScheduler;
use crate::player::visualizer::{Decay, Visualizer};
use crate::settings::PlayerConfiguration;
use crate::transport::{EventSink, TaggedEvent, Transport, TransportEvent, TransportHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    NotConnected,
    Connecting,
    Connected,
    Error,
}

pub struct Session<F: DeviceFactory, T: Transport> {
    config: PlayerConfiguration,
    factory: F,
    transport: T,
    events_tx: mpsc::UnboundedSender<TaggedEvent>,

    state: PlaybackState,
    // bumped on every connect and teardown so late events are dropped
    generation: u64,
    link: Option<Box<dyn TransportHandle>>,
    device: Option<F::Device>,
    scheduler_running: bool,

    queue: FrameQueue,
    scheduler: PlaybackScheduler,
    gate: BufferingGate,
    visualizer: Visualizer,
    decay: Decay,

    volume: f32,
    spectrum: Vec<f32>,
}

impl<F: DeviceFactory, T: Transport> Session<F, T> {
    pub fn new(
        config: PlayerConfiguration,
        factory: F,
        transport: T,
        events_tx: mpsc::UnboundedSender<TaggedEvent>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            queue: FrameQueue::with_limit(config.channels, config.sample_rate, config.max_buffer_secs()),
            scheduler: PlaybackScheduler::new(config.channels, config.sample_rate),
            gate: BufferingGate::new(config.target_latency_secs()),
            visualizer: Visualizer::new(&config.visualizer),
            decay: Decay::new(&config.visualizer),
            spectrum: vec![0.0; config.visualizer.bins],
            volume: 1.0,
            state: PlaybackState::NotConnected,
            generation: 0,
            link: None,
            device: None,
            scheduler_running: false,
            config,
            factory,
            transport,
            events_tx,
        })
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn spectrum(&self) -> &[f32] {
        &self.spectrum
    }

    pub fn config(&self) -> &PlayerConfiguration {
        &self.config
    }

    pub fn buffered_secs(&self) -> f64 {
        self.queue.buffered_secs()
    }

    pub fn queued_frames(&self) -> usize {
        self.queue.len()
    }

    pub fn scheduler_running(&self) -> bool {
        self.scheduler_running
    }

    /// Whether a render tick would do any work
    pub fn needs_render(&self) -> bool {
        self.visualizer.is_active() || self.decay.is_active()
    }

    /// Open the output and start connecting. Ignored unless NotConnected.
    pub fn connect(&mut self) -> Result<()> {
        if self.state != PlaybackState::NotConnected {
            log::debug!("connect ignored in state {:?}", self.state);
            return Ok(());
        }

        let mut device = match self.factory.open(&self.config) {
            Ok(device) => device,
            Err(e) => {
                log::error!("failed to open audio output: {}", e);
                self.state = PlaybackState::Error;
                return Err(e);
            }
        };
        device.set_gain(logarithmic_volume(self.volume));

        self.scheduler.reset(device.current_time());
        self.queue.clear();
        self.device = Some(device);
        self.scheduler_running = true;

        self.generation += 1;
        let sink = EventSink::new(self.generation, self.events_tx.clone());
        match self.transport.open(&self.config.endpoint, sink) {
            Ok(link) => self.link = Some(link),
            Err(e) => {
                log::error!("failed to open transport to {}: {}", self.config.endpoint, e);
                self.state = PlaybackState::Error;
                self.teardown();
                return Err(e);
            }
        }

        self.state = PlaybackState::Connecting;
        log::info!("connecting to {}", self.config.endpoint);
        Ok(())
    }

    /// Tear everything down and return to NotConnected.
    ///
    /// Accepted from Connecting as well, so a pending connection can be
    /// abandoned. Ignored when already NotConnected.
    pub fn disconnect(&mut self) {
        if self.state == PlaybackState::NotConnected {
            log::debug!("disconnect ignored, not connected");
            return;
        }
        self.teardown();
        self.state = PlaybackState::NotConnected;
        log::info!("disconnected");
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(device) = self.device.as_mut() {
            device.set_gain(logarithmic_volume(self.volume));
        }
    }

    pub fn on_transport_event(&mut self, tagged: TaggedEvent) {
        if tagged.generation != self.generation || self.link.is_none() {
            return;
        }

        match tagged.event {
            TransportEvent::Open => {
                if self.state == PlaybackState::Connecting {
                    self.state = PlaybackState::Connected;
                    self.decay.cancel();
                    self.visualizer.start();
                    log::info!("connected to {}", self.config.endpoint);
                }
            }
            TransportEvent::Message(bytes) => self.on_frame(&bytes),
            TransportEvent::Close => {
                log::info!("transport closed");
                self.disconnect();
            }
            TransportEvent::Error(msg) => {
                log::error!("transport error: {}", msg);
                self.state = PlaybackState::Error;
                self.teardown();
            }
        }
    }

    fn on_frame(&mut self, bytes: &[u8]) {
        if bytes.len() != self.config.frame_bytes() {
            log::trace!(
                "frame of {} bytes, nominal size is {}",
                bytes.len(), self.config.frame_bytes()
            );
        }
        let frame = decode_frame(bytes, self.config.bytes_per_sample);
        if frame.sample_count() == 0 {
            return;
        }

        let dropped = self.queue.push(frame);
        if dropped > 0 {
            log::warn!(
                "frame queue over {:?} ms, dropped {} oldest frame(s)",
                self.config.max_buffer_ms, dropped
            );
        }

        if let Some(device) = self.device.as_mut() {
            if let Err(e) = self.gate.on_push(self.queue.buffered_secs(), device) {
                log::error!("failed to resume audio output: {}", e);
            }
        }
    }

    /// One scheduler period elapsed
    pub fn tick_scheduler(&mut self) {
        if !self.scheduler_running {
            return;
        }
        if let Err(e) = self.scheduler.tick(&mut self.queue, self.device.as_mut()) {
            log::error!("failed to schedule audio: {}", e);
        }
    }

    /// One display refresh elapsed
    pub fn render_tick(&mut self) {
        if self.visualizer.is_active() {
            match self.device.as_mut() {
                Some(device) if self.state == PlaybackState::Connected => {
                    self.visualizer.tick(device, &mut self.spectrum);
                }
                _ => self.visualizer.stop(),
            }
        }
        if self.decay.is_active() {
            self.decay.tick(&mut self.spectrum);
        }
    }

    /// Shared by clean close, error and user disconnect
    fn teardown(&mut self) {
        self.generation += 1;

        if let Some(mut link) = self.link.take() {
            link.close();
        }
        self.scheduler_running = false;

        if let Some(mut device) = self.device.take() {
            if device.state() != DeviceState::Closed {
                if let Err(e) = device.close() {
                    log::error!("failed to close audio output: {}", e);
                }
            }
        }

        self.queue.clear();
        self.visualizer.stop();
        self.decay.start();
    }
}
