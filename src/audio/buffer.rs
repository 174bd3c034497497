// Planar sample buffer handed to the output device

/// Fixed-format audio buffer, one plane per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    planes: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl AudioBuffer {
    /// De-interleave `samples` into `channels` planes.
    ///
    /// Stereo input sends even indices left and odd indices right; mono is
    /// copied as is. A dangling odd sample in stereo input is dropped.
    pub fn from_interleaved(samples: &[f32], channels: u16, sample_rate: u32) -> Self {
        let planes = if channels == 2 {
            let frames = samples.len() / 2;
            let mut left = Vec::with_capacity(frames);
            let mut right = Vec::with_capacity(frames);
            for pair in samples.chunks_exact(2) {
                left.push(pair[0]);
                right.push(pair[1]);
            }
            vec![left, right]
        } else {
            vec![samples.to_vec()]
        };

        Self { planes, sample_rate }
    }

    pub fn channel_count(&self) -> usize {
        self.planes.len()
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.planes[index]
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames per channel
    pub fn frames(&self) -> usize {
        self.planes.first().map_or(0, Vec::len)
    }

    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }
}
