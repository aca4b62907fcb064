//! Facial landmark types

use camera_capture::VideoFrame;
use serde::{Deserialize, Serialize};

use crate::GazeError;

/// Left iris cluster in the refined 478-point face mesh
pub const LEFT_IRIS: [usize; 4] = [468, 469, 470, 471];

/// Right iris cluster in the refined 478-point face mesh
pub const RIGHT_IRIS: [usize; 4] = [473, 474, 475, 476];

/// Number of points in a refined face mesh
pub const MESH_POINTS: usize = 478;

/// One landmark, x/y normalized to the frame (0-1)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }
}

/// Landmarks of one detected face
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FaceLandmarks {
    pub points: Vec<Landmark>,
    /// Face presence score from the model
    pub score: f32,
}

impl FaceLandmarks {
    pub fn new(points: Vec<Landmark>, score: f32) -> Self {
        Self { points, score }
    }

    /// Mean horizontal position of a landmark cluster
    pub fn cluster_mean_x(&self, indices: &[usize]) -> Option<f32> {
        if indices.is_empty() {
            return None;
        }
        let mut sum = 0.0;
        for &i in indices {
            sum += self.points.get(i)?.x;
        }
        Some(sum / indices.len() as f32)
    }
}

/// External model producing facial landmarks for a frame.
///
/// Returns one entry per detected face; an empty list means no face.
pub trait LandmarkModel: Send + Sync {
    fn detect(&self, frame: &VideoFrame) -> Result<Vec<FaceLandmarks>, GazeError>;

    /// Whether a real model backs this detector
    fn is_loaded(&self) -> bool {
        true
    }
}
