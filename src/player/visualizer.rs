// Spectrum visualizer
// Per render tick: read analyser bytes, fold into N bins, ease toward them.
// After disconnect a separate decay task fades the bins out.

use crate::audio::AudioDevice;
use crate::settings::VisualizerSettings;

/// Average `magnitudes` into `out.len()` equal groups scaled to [0, 1].
/// Magnitudes past `out.len() * step` are ignored.
pub fn downsample(magnitudes: &[u8], out: &mut [f32]) {
    let bins = out.len();
    if bins == 0 {
        return;
    }
    let step = magnitudes.len() / bins;
    if step == 0 {
        out.iter_mut().for_each(|v| *v = 0.0);
        return;
    }

    for (i, slot) in out.iter_mut().enumerate() {
        let group = &magnitudes[i * step..(i + 1) * step];
        let sum: u32 = group.iter().map(|&m| m as u32).sum();
        *slot = sum as f32 / step as f32 / 255.0;
    }
}

/// Eases the displayed spectrum toward the live one while connected.
pub struct Visualizer {
    active: bool,
    smoothing: f32,
    magnitudes: Vec<u8>,
    targets: Vec<f32>,
}

impl Visualizer {
    pub fn new(settings: &VisualizerSettings) -> Self {
        Self {
            active: false,
            smoothing: settings.smoothing,
            magnitudes: vec![0; settings.fft_size / 2],
            targets: vec![0.0; settings.bins],
        }
    }

    pub fn start(&mut self) {
        self.active = true;
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn tick<D: AudioDevice>(&mut self, device: &mut D, spectrum: &mut [f32]) {
        let bin_count = device.frequency_bin_count();
        if self.magnitudes.len() != bin_count {
            self.magnitudes.resize(bin_count, 0);
        }
        device.frequency_data(&mut self.magnitudes);
        downsample(&self.magnitudes, &mut self.targets);
        self.smooth(spectrum);
    }

    /// One-pole low-pass of every bin toward its target
    fn smooth(&self, spectrum: &mut [f32]) {
        for (shown, &target) in spectrum.iter_mut().zip(self.targets.iter()) {
            *shown += (target - *shown) * self.smoothing;
        }
    }
}

/// Fades the spectrum out once the stream has stopped.
pub struct Decay {
    active: bool,
    factor: f32,
    floor: f32,
}

impl Decay {
    pub fn new(settings: &VisualizerSettings) -> Self {
        Self {
            active: false,
            factor: settings.decay_factor,
            floor: settings.decay_floor,
        }
    }

    pub fn start(&mut self) {
        self.active = true;
    }

    pub fn cancel(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns whether another tick is wanted
    pub fn tick(&mut self, spectrum: &mut [f32]) -> bool {
        let mut any_active = false;
        for v in spectrum.iter_mut() {
            *v *= self.factor;
            if *v > self.floor {
                any_active = true;
            }
        }
        self.active = any_active;
        any_active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDevice;
    use crate::audio::DeviceState;

    #[test]
    fn test_downsample_groups_and_remainder() {
        // 10 magnitudes into 3 bins: step 3, the last one is dropped
        let magnitudes = [255, 255, 255, 0, 0, 0, 51, 102, 153, 255];
        let mut out = [0.0f32; 3];
        downsample(&magnitudes, &mut out);
        assert_eq!(out[0], 1.0);
        assert_eq!(out[1], 0.0);
        assert!((out[2] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_smoothing_converges_geometrically() {
        let settings = VisualizerSettings::default();
        let mut viz = Visualizer::new(&settings);
        let mut device = FakeDevice::new(DeviceState::Running, settings.fft_size / 2);
        device.set_magnitudes(255);

        let mut spectrum = vec![0.0f32; settings.bins];
        viz.start();
        for k in 1..=10 {
            viz.tick(&mut device, &mut spectrum);
            let expected_error = 0.75f32.powi(k);
            for &v in &spectrum {
                assert!(((1.0 - v) - expected_error).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_decay_stops_after_44_ticks_from_full_scale() {
        let settings = VisualizerSettings::default();
        let mut decay = Decay::new(&settings);
        let mut spectrum = vec![1.0f32; settings.bins];
        spectrum[3] = 0.5;

        decay.start();
        let mut ticks = 0;
        while decay.tick(&mut spectrum) {
            ticks += 1;
            assert!(ticks < 1000);
        }
        ticks += 1;

        let expected = (0.01f64.ln() / 0.9f64.ln()).ceil() as usize;
        assert_eq!(expected, 44);
        assert_eq!(ticks, expected);
        assert!(!decay.is_active());
        assert!(spectrum.iter().all(|&v| v <= 0.01));
    }

    #[test]
    fn test_decay_of_silence_is_single_tick() {
        let mut decay = Decay::new(&VisualizerSettings::default());
        let mut spectrum = vec![0.0f32; 64];
        decay.start();
        assert!(!decay.tick(&mut spectrum));
        assert!(!decay.is_active());
    }
}
