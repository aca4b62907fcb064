//! Classifier configuration

use serde::{Deserialize, Serialize};

use crate::{ClassificationPolicy, PromptBank};

/// Prompt policy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    SinglePrompt,
    MultiPrompt,
}

/// Classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionConfig {
    /// Prompt policy
    pub policy: PolicyKind,
    /// Enable the no-person veto (multi-prompt only)
    pub no_person_veto: bool,
    /// No-person posterior above which the veto fires
    pub no_person_threshold: f32,
    /// ONNX image encoder path
    pub image_model_path: Option<String>,
    /// JSON table of prompt embeddings
    pub prompt_embeddings_path: Option<String>,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::MultiPrompt,
            no_person_veto: true,
            no_person_threshold: 0.35,
            image_model_path: None,
            prompt_embeddings_path: None,
        }
    }
}

impl EmotionConfig {
    /// One description per label, no veto
    pub fn single_prompt() -> Self {
        Self {
            policy: PolicyKind::SinglePrompt,
            no_person_veto: false,
            ..Default::default()
        }
    }

    /// Policy described by this config
    pub fn classification_policy(&self) -> ClassificationPolicy {
        match self.policy {
            PolicyKind::SinglePrompt => ClassificationPolicy::SinglePrompt,
            PolicyKind::MultiPrompt => ClassificationPolicy::MultiPrompt {
                no_person_threshold: self.no_person_veto.then_some(self.no_person_threshold),
            },
        }
    }

    /// Built-in prompt bank matching the policy
    pub fn prompt_bank(&self) -> PromptBank {
        match (self.policy, self.no_person_veto) {
            (PolicyKind::SinglePrompt, _) => PromptBank::single_prompt(),
            (PolicyKind::MultiPrompt, true) => PromptBank::multi_prompt(),
            (PolicyKind::MultiPrompt, false) => PromptBank::multi_prompt().without_no_person(),
        }
    }
}
