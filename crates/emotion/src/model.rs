//! Vision-language models scoring a frame against text prompts

use camera_capture::VideoFrame;
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{error, info};

use crate::EmotionError;

/// External model giving one similarity logit per prompt.
pub trait VisionLanguageModel: Send + Sync {
    fn score(&self, frame: &VideoFrame, prompts: &[String]) -> Result<Vec<f32>, EmotionError>;
}

/// CLIP input resolution
const INPUT_SIZE: u32 = 224;
const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
const CLIP_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

/// Prompt embeddings computed offline with the matching text encoder
#[derive(Debug, Deserialize)]
struct PromptEmbeddings {
    #[serde(default = "default_logit_scale")]
    logit_scale: f32,
    embeddings: HashMap<String, Vec<f32>>,
}

fn default_logit_scale() -> f32 {
    100.0
}

/// CLIP-style classifier: ONNX image encoder plus precomputed text embeddings.
///
/// Logit per prompt is `logit_scale * cos(image_embedding, prompt_embedding)`.
pub struct ClipModel {
    session: Session,
    logit_scale: f32,
    embeddings: HashMap<String, Vec<f32>>,
}

impl ClipModel {
    /// Load the image encoder and the prompt embedding table (JSON)
    pub fn load(image_model_path: &str, embeddings_path: &str) -> Result<Self, EmotionError> {
        info!("Loading image encoder from {}", image_model_path);
        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.commit_from_file(image_model_path))
            .map_err(|e| {
                error!("Failed to load image encoder: {}", e);
                EmotionError::ModelLoadError(e.to_string())
            })?;

        let raw = std::fs::read_to_string(embeddings_path)
            .map_err(|e| EmotionError::ModelLoadError(format!("{embeddings_path}: {e}")))?;
        let table: PromptEmbeddings = serde_json::from_str(&raw)
            .map_err(|e| EmotionError::ModelLoadError(format!("{embeddings_path}: {e}")))?;

        let embeddings = table
            .embeddings
            .into_iter()
            .map(|(prompt, v)| (prompt, normalize(v)))
            .collect::<HashMap<_, _>>();
        info!("Loaded {} prompt embeddings", embeddings.len());

        Ok(Self {
            session,
            logit_scale: table.logit_scale,
            embeddings,
        })
    }

    /// Check that every prompt has an embedding
    pub fn covers(&self, prompts: &[String]) -> Result<(), EmotionError> {
        match prompts.iter().find(|p| !self.embeddings.contains_key(*p)) {
            Some(missing) => Err(EmotionError::MissingPromptEmbedding(missing.clone())),
            None => Ok(()),
        }
    }

    fn preprocess(frame: &VideoFrame) -> Result<Array4<f32>, EmotionError> {
        let img = frame
            .to_rgb_image()
            .map_err(|e| EmotionError::InferenceFailed(e.to_string()))?;
        let resized = image::imageops::resize(
            &img,
            INPUT_SIZE,
            INPUT_SIZE,
            image::imageops::FilterType::CatmullRom,
        );

        let size = INPUT_SIZE as usize;
        let mut input = Array4::<f32>::zeros((1, 3, size, size));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                input[[0, c, y as usize, x as usize]] =
                    (pixel[c] as f32 / 255.0 - CLIP_MEAN[c]) / CLIP_STD[c];
            }
        }
        Ok(input)
    }
}

fn normalize(v: Vec<f32>) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return v;
    }
    v.into_iter().map(|x| x / norm).collect()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl VisionLanguageModel for ClipModel {
    fn score(&self, frame: &VideoFrame, prompts: &[String]) -> Result<Vec<f32>, EmotionError> {
        let input = Self::preprocess(frame)?;
        let outputs = self
            .session
            .run(ort::inputs![input].map_err(|e| EmotionError::InferenceFailed(e.to_string()))?)
            .map_err(|e| EmotionError::InferenceFailed(e.to_string()))?;

        let image_embedding: Vec<f32> = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EmotionError::InferenceFailed(e.to_string()))?
            .iter()
            .copied()
            .collect();
        let image_embedding = normalize(image_embedding);

        prompts
            .iter()
            .map(|prompt| {
                let text = self
                    .embeddings
                    .get(prompt)
                    .ok_or_else(|| EmotionError::MissingPromptEmbedding(prompt.clone()))?;
                if text.len() != image_embedding.len() {
                    return Err(EmotionError::InferenceFailed(format!(
                        "embedding size mismatch: image {}, prompt {}",
                        image_embedding.len(),
                        text.len()
                    )));
                }
                Ok(self.logit_scale * dot(&image_embedding, text))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        let v = normalize(vec![3.0, 4.0]);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
        assert_eq!(normalize(vec![0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_preprocess_normalizes_channels() {
        let frame = VideoFrame::solid(50, 40, [255, 255, 255]);
        let input = ClipModel::preprocess(&frame).unwrap();
        assert_eq!(input.shape(), &[1, 3, 224, 224]);
        let expected = (1.0 - CLIP_MEAN[0]) / CLIP_STD[0];
        assert!((input[[0, 0, 100, 100]] - expected).abs() < 1e-3);
    }

    #[test]
    fn test_load_missing_model() {
        let err = ClipModel::load("/nonexistent/clip_image.onnx", "/nonexistent/prompts.json");
        assert!(matches!(err, Err(EmotionError::ModelLoadError(_))));
    }
}
