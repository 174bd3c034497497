// Player handle
// The surface a UI binds to: three commands and three observables

use tokio::sync::{mpsc, watch};

use crate::error::{PlayerError, Result};
use crate::player::PlaybackState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Connect,
    Disconnect,
    SetVolume(f32),
    Shutdown,
}

/// Cheap to clone and safe to share across threads.
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<PlaybackState>,
    volume: watch::Receiver<f32>,
    spectrum: watch::Receiver<Vec<f32>>,
}

impl PlayerHandle {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<Command>,
        status: watch::Receiver<PlaybackState>,
        volume: watch::Receiver<f32>,
        spectrum: watch::Receiver<Vec<f32>>,
    ) -> Self {
        Self { commands, status, volume, spectrum }
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands.send(command).map_err(|_| PlayerError::DriverClosed)
    }

    pub fn connect(&self) -> Result<()> {
        self.send(Command::Connect)
    }

    pub fn disconnect(&self) -> Result<()> {
        self.send(Command::Disconnect)
    }

    /// Linear slider position; clamped to [0, 1] by the player
    pub fn set_volume(&self, volume: f32) -> Result<()> {
        self.send(Command::SetVolume(volume))
    }

    /// Stop the driver after disconnecting
    pub fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown)
    }

    pub fn status(&self) -> PlaybackState {
        *self.status.borrow()
    }

    pub fn volume(&self) -> f32 {
        *self.volume.borrow()
    }

    pub fn spectrum(&self) -> Vec<f32> {
        self.spectrum.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<PlaybackState> {
        self.status.clone()
    }

    pub fn subscribe_volume(&self) -> watch::Receiver<f32> {
        self.volume.clone()
    }

    pub fn subscribe_spectrum(&self) -> watch::Receiver<Vec<f32>> {
        self.spectrum.clone()
    }
}
