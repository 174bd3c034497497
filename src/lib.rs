// PCM stream player
// Module declarations
pub mod audio;
pub mod driver;
pub mod error;
pub mod player;
pub mod settings;
pub mod state;
pub mod transport;

#[cfg(test)]
mod testing;

pub use driver::Driver;
pub use error::{PlayerError, Result};
pub use player::PlaybackState;
pub use settings::PlayerConfiguration;
pub use state::PlayerHandle;

use audio::CpalDeviceFactory;
use transport::WsTransport;

/// Driver wired to the default cpal output and a WebSocket transport.
///
/// The returned driver is not `Send` on every platform; await
/// [`Driver::run`] on the thread that built it.
pub fn default_player(
    config: PlayerConfiguration,
) -> Result<(Driver<CpalDeviceFactory, WsTransport>, PlayerHandle)> {
    Driver::new(config, CpalDeviceFactory, WsTransport)
}
