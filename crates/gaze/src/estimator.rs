//! On-screen gaze estimation from iris landmarks

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::landmarks::{FaceLandmarks, LEFT_IRIS, RIGHT_IRIS};
use crate::GazeConfig;

/// Gaze decision for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GazeReading {
    /// Looking at the screen (only meaningful when `face_detected`)
    pub looking_at_screen: bool,
    /// A face was found
    pub face_detected: bool,
    /// Horizontal gaze coordinate (normalized), if both irises were present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gaze_x: Option<f32>,
}

impl GazeReading {
    /// Reading for a frame without a face
    pub fn no_face() -> Self {
        Self::default()
    }
}

/// Classifies the horizontal iris midpoint against an open central band.
///
/// Frames are classified independently; there is no smoothing.
#[derive(Debug, Clone)]
pub struct GazeEstimator {
    band_min: f32,
    band_max: f32,
}

impl GazeEstimator {
    pub fn new(config: &GazeConfig) -> Self {
        Self {
            band_min: config.band_min,
            band_max: config.band_max,
        }
    }

    /// Mean of the left and right iris cluster means
    pub fn gaze_coordinate(face: &FaceLandmarks) -> Option<f32> {
        let left = face.cluster_mean_x(&LEFT_IRIS)?;
        let right = face.cluster_mean_x(&RIGHT_IRIS)?;
        Some((left + right) / 2.0)
    }

    /// Whether a normalized coordinate lies strictly inside the band
    pub fn is_on_screen(&self, gaze_x: f32) -> bool {
        self.band_min < gaze_x && gaze_x < self.band_max
    }

    /// Same decision in pixel units for a frame `width` pixels wide
    pub fn is_on_screen_px(&self, gaze_x: f32, width: u32) -> bool {
        let w = width as f64;
        let px = gaze_x as f64 * w;
        self.band_min as f64 * w < px && px < self.band_max as f64 * w
    }

    /// Decide from the faces found in a frame (first face wins)
    pub fn estimate(&self, faces: &[FaceLandmarks]) -> GazeReading {
        let Some(face) = faces.first() else {
            return GazeReading::no_face();
        };

        match Self::gaze_coordinate(face) {
            Some(gaze_x) => GazeReading {
                looking_at_screen: self.is_on_screen(gaze_x),
                face_detected: true,
                gaze_x: Some(gaze_x),
            },
            None => {
                debug!(points = face.points.len(), "iris landmarks missing");
                GazeReading {
                    looking_at_screen: false,
                    face_detected: true,
                    gaze_x: None,
                }
            }
        }
    }
}

impl Default for GazeEstimator {
    fn default() -> Self {
        Self::new(&GazeConfig::default())
    }
}
