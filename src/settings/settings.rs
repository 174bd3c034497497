// Player configuration and persistence
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{PlayerError, Result};

/// Spectrum display tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizerSettings {
    pub fft_size: usize,
    pub bins: usize,
    pub render_fps: u32,
    pub smoothing: f32,     // lerp factor per render tick
    pub decay_factor: f32,  // multiplier per tick after disconnect
    pub decay_floor: f32,
}

impl Default for VisualizerSettings {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            bins: 64,
            render_fps: 60,
            smoothing: 0.25,
            decay_factor: 0.9,
            decay_floor: 0.01,
        }
    }
}

/// Immutable once a player is built from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfiguration {
    pub version: i32, // Settings schema version for future migrations
    pub endpoint: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub bytes_per_sample: usize,
    pub frame_size: usize, // samples per frame per channel
    pub buffer_latency_ms: u32,
    pub scheduler_period_ms: u64,
    /// Upper bound on queued audio. `None` keeps the queue unbounded.
    pub max_buffer_ms: Option<u32>,
    pub visualizer: VisualizerSettings,
}

impl Default for PlayerConfiguration {
    fn default() -> Self {
        Self {
            version: 1,
            endpoint: "ws://localhost:8080/ws".to_string(),
            sample_rate: 48000,
            channels: 2,
            bytes_per_sample: 2,
            frame_size: 480,
            buffer_latency_ms: 200,
            scheduler_period_ms: 5,
            max_buffer_ms: None,
            visualizer: VisualizerSettings::default(),
        }
    }
}

impl PlayerConfiguration {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(PlayerError::Config("sample rate must be positive".into()));
        }
        if !(1..=2).contains(&self.channels) {
            return Err(PlayerError::Config(format!(
                "channel count must be 1 or 2, got {}",
                self.channels
            )));
        }
        if !(1..=4).contains(&self.bytes_per_sample) {
            return Err(PlayerError::Config(format!(
                "bytes per sample must be between 1 and 4, got {}",
                self.bytes_per_sample
            )));
        }
        if self.scheduler_period_ms == 0 {
            return Err(PlayerError::Config("scheduler period must be non-zero".into()));
        }
        if let Some(max) = self.max_buffer_ms {
            if max < self.buffer_latency_ms {
                return Err(PlayerError::Config(format!(
                    "max buffer ({} ms) is below the target latency ({} ms)",
                    max, self.buffer_latency_ms
                )));
            }
        }

        let viz = &self.visualizer;
        if viz.bins == 0 || !viz.fft_size.is_power_of_two() || viz.fft_size / 2 < viz.bins {
            return Err(PlayerError::Config(format!(
                "fft size {} cannot feed {} spectrum bins",
                viz.fft_size, viz.bins
            )));
        }
        if viz.render_fps == 0 {
            return Err(PlayerError::Config("render rate must be non-zero".into()));
        }
        if !(viz.smoothing > 0.0 && viz.smoothing <= 1.0) {
            return Err(PlayerError::Config("smoothing must be in (0, 1]".into()));
        }
        if !(viz.decay_factor > 0.0 && viz.decay_factor < 1.0) {
            return Err(PlayerError::Config("decay factor must be in (0, 1)".into()));
        }
        Ok(())
    }

    pub fn target_latency_secs(&self) -> f64 {
        self.buffer_latency_ms as f64 / 1000.0
    }

    pub fn max_buffer_secs(&self) -> Option<f64> {
        self.max_buffer_ms.map(|ms| ms as f64 / 1000.0)
    }

    pub fn scheduler_period(&self) -> Duration {
        Duration::from_millis(self.scheduler_period_ms)
    }

    pub fn render_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.visualizer.render_fps as f64)
    }

    /// Size in bytes of one nominal frame on the wire
    pub fn frame_bytes(&self) -> usize {
        self.frame_size * self.channels as usize * self.bytes_per_sample
    }

    /// Load settings from file, or return defaults if file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("no settings file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let settings: PlayerConfiguration = serde_json::from_str(&content)?;
        settings.validate()?;

        log::info!("loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;

        log::info!("saved settings to {:?}", path);
        Ok(())
    }
}
