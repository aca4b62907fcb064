//! Emotion Classification
//!
//! Scores a frame against natural-language prompts with a vision-language
//! model and turns the scores into one label from a closed vocabulary.

mod classifier;
mod config;
mod label;
mod model;
mod policy;
mod prompts;

pub use classifier::EmotionClassifier;
pub use config::{EmotionConfig, PolicyKind};
pub use label::Emotion;
pub use model::{ClipModel, VisionLanguageModel};
pub use policy::{aggregate_per_label, softmax, ClassificationPolicy, Decision};
pub use prompts::PromptBank;

use thiserror::Error;

/// Errors during classification
#[derive(Debug, Error)]
pub enum EmotionError {
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid score count: expected {expected}, got {actual}")]
    InvalidScoreCount { expected: usize, actual: usize },
    #[error("Invalid prompt bank: {0}")]
    InvalidPromptBank(String),
    #[error("No prompt embedding for: {0}")]
    MissingPromptEmbedding(String),
}
