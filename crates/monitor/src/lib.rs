//! Emotion Monitor
//!
//! Owns the current [`EmotionSnapshot`] and the camera sampling loop that
//! keeps it fresh. HTTP handlers and the loop share one [`EmotionMonitor`].

mod analyzer;
mod config;
mod snapshot;
mod stats;
mod service;
mod worker;

pub use analyzer::{Analysis, Analyzer};
pub use config::MonitorConfig;
pub use snapshot::{EmotionSnapshot, SnapshotStore};
pub use stats::{LabelSummary, SessionStats, StatsSummary};
pub use service::EmotionMonitor;
pub use worker::LoopExit;

use camera_capture::CameraError;
use thiserror::Error;

/// Monitor error types
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Camera already active")]
    AlreadyActive,

    #[error("Camera unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CameraError> for MonitorError {
    fn from(e: CameraError) -> Self {
        MonitorError::DeviceUnavailable(e.to_string())
    }
}
