// Wire PCM to normalized f32 conversion
// Frames arrive as little-endian signed integers, interleaved by channel

/// An immutable run of interleaved, normalized samples as received from the
/// transport.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    samples: Vec<f32>,
}

impl AudioFrame {
    pub fn new(samples: Vec<f32>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Total samples across all channels
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Playback length in seconds for the given layout
    pub fn duration(&self, channels: u16, sample_rate: u32) -> f64 {
        (self.samples.len() / channels.max(1) as usize) as f64 / sample_rate as f64
    }
}

/// Convert a little-endian signed integer buffer to floats.
///
/// Each sample is divided by `2^(bits - 1)`, so `-32768` maps to exactly
/// `-1.0` while `32767` stays just below `1.0`. A trailing partial sample is
/// dropped.
pub fn pcm_to_f32(bytes: &[u8], bytes_per_sample: usize) -> Vec<f32> {
    match bytes_per_sample {
        1 => bytes.iter().map(|&b| b as i8 as f32 / 128.0).collect(),
        2 => {
            let scale = 1.0 / 32768.0;
            bytes
                .chunks_exact(2)
                .map(|c| i16::from_le_bytes([c[0], c[1]]) as f32 * scale)
                .collect()
        }
        3 => {
            let scale = 1.0 / 8388608.0;
            bytes
                .chunks_exact(3)
                .map(|c| {
                    // sign-extend through the top byte
                    let v = i32::from_le_bytes([0, c[0], c[1], c[2]]) >> 8;
                    v as f32 * scale
                })
                .collect()
        }
        4 => {
            let scale = 1.0 / 2147483648.0;
            bytes
                .chunks_exact(4)
                .map(|c| (i32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64 * scale) as f32)
                .collect()
        }
        _ => Vec::new(),
    }
}

/// Convert a wire payload straight into a frame
pub fn decode_frame(bytes: &[u8], bytes_per_sample: usize) -> AudioFrame {
    AudioFrame::new(pcm_to_f32(bytes, bytes_per_sample))
}
