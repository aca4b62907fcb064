//! Service loop configuration

use serde::Deserialize;
use std::time::Duration;

/// Sampling cadence and camera warm-up
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Minimum time between two analyses (ms)
    pub analysis_interval_ms: u64,
    /// Sleep between frame polls (ms)
    pub poll_interval_ms: u64,
    /// Frames read at most while waiting for a non-dark frame
    pub warmup_frames: usize,
    /// Mean brightness (0-255) above which a frame counts as lit
    pub dark_threshold: f32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            analysis_interval_ms: 3000,
            poll_interval_ms: 100,
            warmup_frames: 10,
            dark_threshold: 10.0,
        }
    }
}

impl MonitorConfig {
    pub fn analysis_interval(&self) -> Duration {
        Duration::from_millis(self.analysis_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
