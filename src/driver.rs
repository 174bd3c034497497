// Player driver
// Single owner of the session. Commands, transport events, the scheduler
// period and the render period are all funnelled through one select loop, so
// session state is never touched from two places at once.

use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};

use crate::audio::DeviceFactory;
use crate::error::Result;
use crate::player::{PlaybackState, Session};
use crate::settings::PlayerConfiguration;
use crate::state::{Command, PlayerHandle};
use crate::transport::{TaggedEvent, Transport};

pub struct Driver<F: DeviceFactory, T: Transport> {
    session: Session<F, T>,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedReceiver<TaggedEvent>,
    status_tx: watch::Sender<PlaybackState>,
    volume_tx: watch::Sender<f32>,
    spectrum_tx: watch::Sender<Vec<f32>>,
}

impl<F: DeviceFactory, T: Transport> Driver<F, T> {
    /// Build a driver and the handle that controls it. Nothing runs until
    /// [`Driver::run`] is awaited.
    pub fn new(config: PlayerConfiguration, factory: F, transport: T) -> Result<(Self, PlayerHandle)> {
        let (events_tx, events) = mpsc::unbounded_channel();
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let session = Session::new(config, factory, transport, events_tx)?;

        let (status_tx, status_rx) = watch::channel(session.state());
        let (volume_tx, volume_rx) = watch::channel(session.volume());
        let (spectrum_tx, spectrum_rx) = watch::channel(session.spectrum().to_vec());

        let handle = PlayerHandle::new(commands_tx, status_rx, volume_rx, spectrum_rx);
        let driver = Self {
            session,
            commands,
            events,
            status_tx,
            volume_tx,
            spectrum_tx,
        };
        Ok((driver, handle))
    }

    /// Run until [`PlayerHandle::shutdown`] is called or every handle is
    /// dropped. The session is disconnected on the way out.
    pub async fn run(mut self) {
        let mut scheduler = interval(self.session.config().scheduler_period());
        scheduler.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut render = interval(self.session.config().render_period());
        render.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let scheduler_running = self.session.scheduler_running();
            let needs_render = self.session.needs_render();

            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Connect) => {
                        if let Err(e) = self.session.connect() {
                            log::error!("connect failed: {}", e);
                        }
                    }
                    Some(Command::Disconnect) => self.session.disconnect(),
                    Some(Command::SetVolume(v)) => self.session.set_volume(v),
                    Some(Command::Shutdown) | None => break,
                },
                Some(event) = self.events.recv() => self.session.on_transport_event(event),
                _ = scheduler.tick(), if scheduler_running => self.session.tick_scheduler(),
                _ = render.tick(), if needs_render => {
                    self.session.render_tick();
                    self.spectrum_tx.send_replace(self.session.spectrum().to_vec());
                }
            }

            self.publish();
        }

        self.session.disconnect();
        self.publish();
        log::debug!("player driver stopped");
    }

    fn publish(&self) {
        let state = self.session.state();
        self.status_tx.send_if_modified(|s| {
            if *s != state {
                *s = state;
                true
            } else {
                false
            }
        });

        let volume = self.session.volume();
        self.volume_tx.send_if_modified(|v| {
            if *v != volume {
                *v = volume;
                true
            } else {
                false
            }
        });
    }
}
