//! Face mesh landmark model (ONNX)

use camera_capture::VideoFrame;
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use tracing::{error, info, warn};

use crate::landmarks::{FaceLandmarks, Landmark, LandmarkModel, MESH_POINTS};
use crate::{GazeConfig, GazeError};

/// Square input resolution of the face mesh network
const INPUT_SIZE: u32 = 192;

/// Refined face mesh (478 points with irises) running through ONNX Runtime.
///
/// Expects a network with input `[1, 192, 192, 3]` (RGB, 0-1) and two
/// outputs: landmarks `[.., 1434]` in input pixels, then a face presence
/// logit. The whole frame is fed to the network, so the face should be
/// roughly centered as in a webcam session.
pub struct FaceMeshModel {
    confidence_threshold: f32,
    session: Option<Session>,
}

impl FaceMeshModel {
    pub fn new(config: &GazeConfig) -> Result<Self, GazeError> {
        let session = match &config.mesh_model_path {
            Some(path) => {
                info!("Loading face mesh model from {}", path);
                Some(load_session(path)?)
            }
            None => {
                warn!("No face mesh model path configured. Landmarks unavailable.");
                None
            }
        };

        Ok(Self {
            confidence_threshold: config.face_confidence,
            session,
        })
    }

    /// Model that never reports a face
    pub fn unloaded() -> Self {
        Self {
            confidence_threshold: GazeConfig::default().face_confidence,
            session: None,
        }
    }

    fn preprocess(frame: &VideoFrame) -> Result<Array4<f32>, GazeError> {
        let img = frame
            .to_rgb_image()
            .map_err(|e| GazeError::ImageProcessing(e.to_string()))?;
        let resized = image::imageops::resize(
            &img,
            INPUT_SIZE,
            INPUT_SIZE,
            image::imageops::FilterType::Triangle,
        );

        let size = INPUT_SIZE as usize;
        let mut input = Array4::<f32>::zeros((1, size, size, 3));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                input[[0, y as usize, x as usize, c]] = pixel[c] as f32 / 255.0;
            }
        }
        Ok(input)
    }
}

fn load_session(path: &str) -> Result<Session, GazeError> {
    Session::builder()
        .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
        .and_then(|b| b.commit_from_file(path))
        .map_err(|e| {
            error!("Failed to load face mesh model: {}", e);
            GazeError::ModelLoad(e.to_string())
        })
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

impl LandmarkModel for FaceMeshModel {
    fn detect(&self, frame: &VideoFrame) -> Result<Vec<FaceLandmarks>, GazeError> {
        let Some(session) = &self.session else {
            return Ok(Vec::new());
        };

        let input = Self::preprocess(frame)?;
        let outputs = session
            .run(ort::inputs![input].map_err(|e| GazeError::Inference(e.to_string()))?)
            .map_err(|e| GazeError::Inference(e.to_string()))?;

        let coords: Vec<f32> = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| GazeError::Inference(e.to_string()))?
            .iter()
            .copied()
            .collect();
        let logit = outputs[1]
            .try_extract_tensor::<f32>()
            .map_err(|e| GazeError::Inference(e.to_string()))?
            .iter()
            .copied()
            .next()
            .ok_or_else(|| GazeError::Inference("empty face score output".to_string()))?;

        let score = sigmoid(logit);
        if score < self.confidence_threshold {
            return Ok(Vec::new());
        }

        if coords.len() < MESH_POINTS * 3 {
            return Err(GazeError::Inference(format!(
                "expected {} landmark values, got {}",
                MESH_POINTS * 3,
                coords.len()
            )));
        }

        let scale = INPUT_SIZE as f32;
        let points = coords
            .chunks_exact(3)
            .take(MESH_POINTS)
            .map(|p| Landmark {
                x: p[0] / scale,
                y: p[1] / scale,
                z: p[2] / scale,
            })
            .collect();

        Ok(vec![FaceLandmarks::new(points, score)])
    }

    fn is_loaded(&self) -> bool {
        self.session.is_some()
    }
}
