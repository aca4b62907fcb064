//! Emotion classifier: model + prompt bank + policy

use camera_capture::VideoFrame;
use std::time::Instant;
use tracing::{debug, error, warn};

use crate::{
    ClassificationPolicy, ClipModel, Decision, EmotionConfig, EmotionError, PromptBank,
    VisionLanguageModel,
};

/// Classifies frames into the emotion vocabulary.
///
/// Without a model every frame classifies as `neutral` with confidence 0.
pub struct EmotionClassifier {
    model: Option<Box<dyn VisionLanguageModel>>,
    bank: PromptBank,
    policy: ClassificationPolicy,
}

impl EmotionClassifier {
    /// Create from configuration.
    ///
    /// A model that fails to load is logged and left unloaded.
    pub fn new(config: &EmotionConfig) -> Self {
        let bank = config.prompt_bank();
        let model = match (&config.image_model_path, &config.prompt_embeddings_path) {
            (Some(image), Some(embeddings)) => match ClipModel::load(image, embeddings)
                .and_then(|m| m.covers(bank.prompts()).map(|_| m))
            {
                Ok(m) => Some(Box::new(m) as Box<dyn VisionLanguageModel>),
                Err(e) => {
                    error!("Emotion model unavailable: {}", e);
                    None
                }
            },
            _ => {
                warn!("No emotion model configured. Classifying as neutral.");
                None
            }
        };

        Self {
            model,
            bank,
            policy: config.classification_policy(),
        }
    }

    /// Create around an already loaded model
    pub fn with_model(
        model: Box<dyn VisionLanguageModel>,
        bank: PromptBank,
        policy: ClassificationPolicy,
    ) -> Self {
        Self {
            model: Some(model),
            bank,
            policy,
        }
    }

    /// Classifier without a model
    pub fn unloaded(config: &EmotionConfig) -> Self {
        Self {
            model: None,
            bank: config.prompt_bank(),
            policy: config.classification_policy(),
        }
    }

    /// Classify one frame
    pub fn classify(&self, frame: &VideoFrame) -> Result<Decision, EmotionError> {
        let Some(model) = &self.model else {
            return Ok(Decision::neutral_default());
        };

        let start = Instant::now();
        let scores = model.score(frame, self.bank.prompts())?;
        let decision = self.policy.decide(&scores, &self.bank)?;

        debug!(
            emotion = %decision.emotion,
            confidence = decision.confidence,
            vetoed = decision.vetoed,
            latency_ms = start.elapsed().as_millis() as u64,
            "classified frame"
        );
        Ok(decision)
    }

    /// Check if a model is loaded
    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn policy(&self) -> ClassificationPolicy {
        self.policy
    }

    pub fn prompt_bank(&self) -> &PromptBank {
        &self.bank
    }
}
