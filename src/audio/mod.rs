// Audio module
// Sample conversion, buffers, analysis and cpal output

pub mod analyser;
pub mod buffer;
pub mod convert;
pub mod device;
pub mod output;
pub mod volume;

pub use buffer::AudioBuffer;
pub use convert::{decode_frame, pcm_to_f32, AudioFrame};
pub use device::{AudioDevice, DeviceFactory, DeviceState};
pub use output::{CpalDevice, CpalDeviceFactory};
pub use volume::logarithmic_volume;
