// Frequency analyser over the live post-gain signal
// Produces byte magnitudes with the same scaling browsers use for
// AnalyserNode::getByteFrequencyData

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

const MIN_DECIBELS: f32 = -100.0;
const MAX_DECIBELS: f32 = -30.0;
const SMOOTHING_TIME_CONSTANT: f32 = 0.8;

pub struct Analyser {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    window: Vec<f32>,
    // circular history of the newest `fft_size` samples
    history: Vec<f32>,
    write_pos: usize,
    smoothed: Vec<f32>,
    scratch: Vec<Complex<f32>>,
}

impl Analyser {
    /// `fft_size` must be a power of two
    pub fn new(fft_size: usize) -> Self {
        let fft = FftPlanner::<f32>::new().plan_fft_forward(fft_size);

        // Blackman window, alpha = 0.16
        let alpha = 0.16;
        let a0 = (1.0 - alpha) / 2.0;
        let a1 = 0.5;
        let a2 = alpha / 2.0;
        let n = fft_size as f32;
        let window = (0..fft_size)
            .map(|i| {
                let x = i as f32 / n;
                a0 - a1 * (2.0 * PI * x).cos() + a2 * (4.0 * PI * x).cos()
            })
            .collect();

        Self {
            fft,
            fft_size,
            window,
            history: vec![0.0; fft_size],
            write_pos: 0,
            smoothed: vec![0.0; fft_size / 2],
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
        }
    }

    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Append mono samples, keeping only the newest `fft_size`
    pub fn push_samples(&mut self, samples: &[f32]) {
        let skip = samples.len().saturating_sub(self.fft_size);
        for &s in &samples[skip..] {
            self.history[self.write_pos] = s;
            self.write_pos = (self.write_pos + 1) % self.fft_size;
        }
    }

    /// Run the transform and write `min(out.len(), bin_count)` bytes.
    pub fn byte_frequency_data(&mut self, out: &mut [u8]) {
        let n = self.fft_size;
        for i in 0..n {
            let sample = self.history[(self.write_pos + i) % n];
            self.scratch[i] = Complex::new(sample * self.window[i], 0.0);
        }
        self.fft.process(&mut self.scratch);

        let range = MAX_DECIBELS - MIN_DECIBELS;
        for (k, slot) in out.iter_mut().take(self.bin_count()).enumerate() {
            let magnitude = self.scratch[k].norm() / n as f32;
            let smoothed = SMOOTHING_TIME_CONSTANT * self.smoothed[k]
                + (1.0 - SMOOTHING_TIME_CONSTANT) * magnitude;
            self.smoothed[k] = smoothed;

            let db = if smoothed > 0.0 {
                20.0 * smoothed.log10()
            } else {
                f32::NEG_INFINITY
            };
            let scaled = 255.0 * (db - MIN_DECIBELS) / range;
            *slot = scaled.clamp(0.0, 255.0) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_is_zero() {
        let mut analyser = Analyser::new(2048);
        analyser.push_samples(&vec![0.0; 4096]);
        let mut out = vec![7u8; analyser.bin_count()];
        analyser.byte_frequency_data(&mut out);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let size = 1024;
        let bin = 64;
        let mut analyser = Analyser::new(size);
        let tone: Vec<f32> = (0..size)
            .map(|i| (2.0 * PI * bin as f32 * i as f32 / size as f32).sin())
            .collect();

        let mut out = vec![0u8; analyser.bin_count()];
        // let the smoothing settle
        for _ in 0..20 {
            analyser.push_samples(&tone);
            analyser.byte_frequency_data(&mut out);
        }

        let max = *out.iter().max().unwrap();
        assert_eq!(out[bin], max);
        assert!(out[bin] > 200);
        assert!(out[bin + 20] < out[bin]);
        assert!(out[bin * 4] < out[bin]);
    }

    #[test]
    fn test_history_keeps_newest_samples() {
        let mut analyser = Analyser::new(8);
        analyser.push_samples(&[1.0; 5]);
        analyser.push_samples(&[2.0; 20]);
        assert!(analyser.history.iter().all(|&s| s == 2.0));
    }
}
