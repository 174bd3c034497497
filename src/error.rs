// Error types shared by the player core, the audio output and the transport
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to (de)serialize settings: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no output device available")]
    NoOutputDevice,

    #[error("output device does not support {channels} channel(s) at {sample_rate} Hz")]
    UnsupportedStreamConfig { sample_rate: u32, channels: u16 },

    #[error("audio device error: {0}")]
    Device(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("player driver has shut down")]
    DriverClosed,
}

pub type Result<T> = std::result::Result<T, PlayerError>;

impl From<cpal::BuildStreamError> for PlayerError {
    fn from(e: cpal::BuildStreamError) -> Self {
        PlayerError::Device(format!("Failed to build output stream: {}", e))
    }
}

impl From<cpal::PlayStreamError> for PlayerError {
    fn from(e: cpal::PlayStreamError) -> Self {
        PlayerError::Device(format!("Failed to start stream: {}", e))
    }
}

impl From<cpal::SupportedStreamConfigsError> for PlayerError {
    fn from(e: cpal::SupportedStreamConfigsError) -> Self {
        PlayerError::Device(format!("Failed to query output configs: {}", e))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for PlayerError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        PlayerError::Transport(e.to_string())
    }
}
