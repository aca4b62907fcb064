//! Turning per-prompt similarity scores into one emotion decision

use serde::Serialize;
use tracing::debug;

use crate::{Emotion, EmotionError, PromptBank};

/// How per-prompt scores become per-label posteriors
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClassificationPolicy {
    /// One prompt per label; the label's first prompt is its score
    SinglePrompt,
    /// Mean over each label's prompts, then softmax over labels.
    ///
    /// With `no_person_threshold`, a no-person posterior strictly above the
    /// threshold forces `neutral` and marks the frame as faceless.
    MultiPrompt { no_person_threshold: Option<f32> },
}

impl ClassificationPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            ClassificationPolicy::SinglePrompt => "single_prompt",
            ClassificationPolicy::MultiPrompt { no_person_threshold: None } => "multi_prompt",
            ClassificationPolicy::MultiPrompt { no_person_threshold: Some(_) } => {
                "multi_prompt_with_veto"
            }
        }
    }
}

/// Outcome of one classification
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    /// Winning facial label (or `neutral` when vetoed)
    pub emotion: Emotion,
    /// Posterior of the winner (of `no_person` when vetoed)
    pub confidence: f32,
    /// Posterior of the no-person class (0 when absent)
    pub no_person_probability: f32,
    /// The no-person veto fired
    pub vetoed: bool,
    /// Posterior per label, in bank order
    pub probabilities: Vec<(Emotion, f32)>,
}

impl Decision {
    /// Decision used when no model is available
    pub fn neutral_default() -> Self {
        Self {
            emotion: Emotion::Neutral,
            confidence: 0.0,
            no_person_probability: 0.0,
            vetoed: false,
            probabilities: Vec::new(),
        }
    }
}

/// Numerically stable softmax
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Mean of each label's prompt scores
pub fn aggregate_per_label(scores: &[f32], bank: &PromptBank) -> Result<Vec<f32>, EmotionError> {
    check_score_count(scores, bank)?;
    Ok(bank
        .slices()
        .iter()
        .map(|range| scores[range.clone()].iter().sum::<f32>() / range.len() as f32)
        .collect())
}

fn check_score_count(scores: &[f32], bank: &PromptBank) -> Result<(), EmotionError> {
    if scores.len() != bank.prompts().len() {
        return Err(EmotionError::InvalidScoreCount {
            expected: bank.prompts().len(),
            actual: scores.len(),
        });
    }
    Ok(())
}

impl ClassificationPolicy {
    /// Decide from one score per prompt of `bank`
    pub fn decide(&self, scores: &[f32], bank: &PromptBank) -> Result<Decision, EmotionError> {
        check_score_count(scores, bank)?;

        let per_label: Vec<f32> = match self {
            ClassificationPolicy::SinglePrompt => {
                bank.slices().iter().map(|range| scores[range.start]).collect()
            }
            ClassificationPolicy::MultiPrompt { .. } => aggregate_per_label(scores, bank)?,
        };
        let posteriors = softmax(&per_label);
        if posteriors.iter().any(|p| !p.is_finite()) {
            return Err(EmotionError::InferenceFailed(
                "model returned non-finite scores".to_string(),
            ));
        }

        let no_person_probability = bank
            .position(Emotion::NoPerson)
            .map(|idx| posteriors[idx])
            .unwrap_or(0.0);

        let probabilities: Vec<(Emotion, f32)> =
            bank.labels().iter().copied().zip(posteriors.iter().copied()).collect();

        if let ClassificationPolicy::MultiPrompt {
            no_person_threshold: Some(threshold),
        } = self
        {
            if no_person_probability > *threshold {
                debug!(no_person_probability, threshold, "no-person veto");
                return Ok(Decision {
                    emotion: Emotion::Neutral,
                    confidence: no_person_probability,
                    no_person_probability,
                    vetoed: true,
                    probabilities,
                });
            }
        }

        let (emotion, confidence) = probabilities
            .iter()
            .filter(|(label, _)| label.is_facial())
            .fold((Emotion::Neutral, f32::NEG_INFINITY), |best, &(label, p)| {
                if p > best.1 {
                    (label, p)
                } else {
                    best
                }
            });

        Ok(Decision {
            emotion,
            confidence,
            no_person_probability,
            vetoed: false,
            probabilities,
        })
    }
}
