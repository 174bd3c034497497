// Settings module
// Player configuration loaded from and saved to JSON

#[allow(clippy::module_inception)]
pub mod settings;

pub use settings::{PlayerConfiguration, VisualizerSettings};
