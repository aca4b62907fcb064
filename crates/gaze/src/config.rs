//! Gaze configuration

use serde::{Deserialize, Serialize};

/// Gaze configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeConfig {
    /// Lower bound of the on-screen band (normalized x, exclusive)
    pub band_min: f32,

    /// Upper bound of the on-screen band (normalized x, exclusive)
    pub band_max: f32,

    /// Face presence score needed to accept a mesh
    pub face_confidence: f32,

    /// Face mesh ONNX model path
    pub mesh_model_path: Option<String>,
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            band_min: 0.35,
            band_max: 0.65,
            face_confidence: 0.5,
            mesh_model_path: None,
        }
    }
}

impl GazeConfig {
    /// Narrow band used by the full-screen local display
    pub fn narrow() -> Self {
        Self {
            band_min: 0.40,
            band_max: 0.60,
            ..Default::default()
        }
    }
}
