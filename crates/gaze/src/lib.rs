//! Gaze Estimation
//!
//! Decides whether a viewer is looking at the screen:
//! - Facial landmark extraction (refined face mesh with iris points)
//! - Horizontal iris midpoint against a central band

pub mod config;
pub mod estimator;
pub mod landmarks;
pub mod mesh;

pub use config::GazeConfig;
pub use estimator::{GazeEstimator, GazeReading};
pub use landmarks::{FaceLandmarks, Landmark, LandmarkModel, LEFT_IRIS, RIGHT_IRIS};
pub use mesh::FaceMeshModel;

use thiserror::Error;

/// Gaze error types
#[derive(Error, Debug)]
pub enum GazeError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),
}
