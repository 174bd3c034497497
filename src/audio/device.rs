// Audio output device abstraction
// The player core only talks to the hardware through these traits

use crate::audio::buffer::AudioBuffer;
use crate::error::Result;
use crate::settings::PlayerConfiguration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Suspended,
    Running,
    Closed,
}

/// An output with its own monotonic clock, a gain stage and a
/// post-gain frequency tap.
pub trait AudioDevice {
    /// Seconds of audio the hardware has rendered so far
    fn current_time(&self) -> f64;

    fn state(&self) -> DeviceState;

    fn resume(&mut self) -> Result<()>;

    /// Release the hardware. Further schedules are ignored.
    fn close(&mut self) -> Result<()>;

    fn set_gain(&mut self, gain: f32);

    /// Queue `buffer` to start at `start_at` on the device clock. If that
    /// moment has already been rendered the buffer starts at the next
    /// unrendered one instead. Returns the start actually used.
    fn schedule(&mut self, buffer: AudioBuffer, start_at: f64) -> Result<f64>;

    /// Length of the array filled by [`AudioDevice::frequency_data`]
    fn frequency_bin_count(&self) -> usize;

    /// Fill `out` with byte magnitudes of the live post-gain signal
    fn frequency_data(&mut self, out: &mut [u8]);
}

/// Opens a fresh device for every connection.
pub trait DeviceFactory {
    type Device: AudioDevice;

    fn open(&mut self, config: &PlayerConfiguration) -> Result<Self::Device>;
}
