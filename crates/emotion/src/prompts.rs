//! Prompt bank: per-label text descriptions flattened for batch scoring

use std::collections::HashSet;
use std::ops::Range;

use crate::{Emotion, EmotionError};

/// Ordered prompts with a `[start, end)` slice per label.
///
/// Slices partition `prompts` exactly, in label order.
#[derive(Debug, Clone)]
pub struct PromptBank {
    labels: Vec<Emotion>,
    prompts: Vec<String>,
    slices: Vec<Range<usize>>,
}

impl PromptBank {
    /// Build from `(label, variants)` entries
    pub fn from_entries<I, S>(entries: I) -> Result<Self, EmotionError>
    where
        I: IntoIterator<Item = (Emotion, Vec<S>)>,
        S: Into<String>,
    {
        let entries: Vec<(Emotion, Vec<String>)> = entries
            .into_iter()
            .map(|(label, variants)| (label, variants.into_iter().map(Into::into).collect()))
            .collect();

        let mut seen = HashSet::new();
        for (label, variants) in &entries {
            if !seen.insert(*label) {
                return Err(EmotionError::InvalidPromptBank(format!("duplicate label {label}")));
            }
            if variants.is_empty() {
                return Err(EmotionError::InvalidPromptBank(format!("no prompts for {label}")));
            }
        }
        if !seen.iter().any(Emotion::is_facial) {
            return Err(EmotionError::InvalidPromptBank("no facial labels".to_string()));
        }

        Ok(Self::assemble(entries))
    }

    fn assemble(entries: Vec<(Emotion, Vec<String>)>) -> Self {
        let mut labels = Vec::with_capacity(entries.len());
        let mut prompts = Vec::new();
        let mut slices = Vec::with_capacity(entries.len());

        for (label, variants) in entries {
            let start = prompts.len();
            prompts.extend(variants);
            slices.push(start..prompts.len());
            labels.push(label);
        }

        Self {
            labels,
            prompts,
            slices,
        }
    }

    /// One description per label
    pub fn single_prompt() -> Self {
        Self::assemble(
            SINGLE_PROMPTS
                .iter()
                .map(|(label, text)| (*label, vec![text.to_string()]))
                .collect(),
        )
    }

    /// Several descriptions per label, plus a no-person class
    pub fn multi_prompt() -> Self {
        Self::assemble(
            MULTI_PROMPTS
                .iter()
                .map(|(label, variants)| (*label, variants.iter().map(|v| v.to_string()).collect()))
                .collect(),
        )
    }

    pub fn labels(&self) -> &[Emotion] {
        &self.labels
    }

    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// Prompt range of the label at `label_idx`
    pub fn slice(&self, label_idx: usize) -> Range<usize> {
        self.slices[label_idx].clone()
    }

    pub fn slices(&self) -> &[Range<usize>] {
        &self.slices
    }

    pub fn position(&self, label: Emotion) -> Option<usize> {
        self.labels.iter().position(|&l| l == label)
    }

    /// Drop the no-person class, if present
    pub fn without_no_person(&self) -> Self {
        Self::assemble(
            self.labels
                .iter()
                .zip(&self.slices)
                .filter(|(label, _)| label.is_facial())
                .map(|(label, range)| (*label, self.prompts[range.clone()].to_vec()))
                .collect(),
        )
    }
}

const SINGLE_PROMPTS: &[(Emotion, &str)] = &[
    (Emotion::Happy, "a child with a wide smile and bright eyes, looking happy"),
    (Emotion::Sad, "a child with teary eyes and a downturned mouth, looking sad"),
    (Emotion::Confused, "a child tilting their head slightly, with eyebrows raised unevenly, looking confused"),
    (Emotion::Focused, "a child with concentrated expression, focused eyes, paying attention"),
    (Emotion::Surprised, "a child with wide open eyes and mouth, showing surprise"),
    (Emotion::Frustrated, "a child with tightly pressed lips and furrowed eyebrows, showing frustration"),
    (Emotion::Neutral, "a child with relaxed facial muscles and a calm expression, looking neutral"),
    (Emotion::Tired, "a child with drooping eyelids, yawning or looking sleepy"),
];

const MULTI_PROMPTS: &[(Emotion, &[&str])] = &[
    (Emotion::Happy, &[
        "a child with a wide smile and bright eyes, looking happy",
        "a photo of a smiling child who is laughing",
        "a cheerful child with raised cheeks and a grin",
    ]),
    (Emotion::Sad, &[
        "a child with teary eyes and a downturned mouth, looking sad",
        "a photo of an unhappy child who looks down",
        "a child with a trembling lip, about to cry",
    ]),
    (Emotion::Confused, &[
        "a child tilting their head slightly, with eyebrows raised unevenly, looking confused",
        "a puzzled child scratching their head",
        "a child frowning with uncertainty at a screen",
    ]),
    (Emotion::Focused, &[
        "a child with concentrated expression, focused eyes, paying attention",
        "a photo of a child concentrating on a screen",
        "an attentive child with steady eyes looking forward",
    ]),
    (Emotion::Surprised, &[
        "a child with wide open eyes and mouth, showing surprise",
        "a photo of an astonished child with raised eyebrows",
    ]),
    (Emotion::Frustrated, &[
        "a child with tightly pressed lips and furrowed eyebrows, showing frustration",
        "an annoyed child clenching their jaw",
        "a child sighing in frustration at a screen",
    ]),
    (Emotion::Neutral, &[
        "a child with relaxed facial muscles and a calm expression, looking neutral",
        "a photo of a child with an expressionless face",
        "a calm child sitting still",
    ]),
    (Emotion::Tired, &[
        "a child with drooping eyelids, yawning or looking sleepy",
        "a photo of an exhausted child rubbing their eyes",
    ]),
    (Emotion::Bored, &[
        "a child with a bored expression, half-closed eyes, drooping eyelids, yawning or resting their chin on their hand",
        "a photo of a bored child staring blankly past the screen",
        "a listless child slumped in their chair",
    ]),
    (Emotion::Angry, &[
        "a child with tightly pressed lips and furrowed eyebrows, showing anger",
        "a photo of a scowling child glaring at the screen",
        "a child with clenched teeth and a red face",
    ]),
    (Emotion::NoPerson, &[
        "an empty room with no person in it",
        "a photo of a wall or ceiling with nobody in front of the camera",
        "an empty chair in front of a computer",
    ]),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_partition(bank: &PromptBank) {
        let mut next = 0;
        for range in bank.slices() {
            assert_eq!(range.start, next, "gap or overlap before {range:?}");
            assert!(range.end > range.start);
            next = range.end;
        }
        assert_eq!(next, bank.prompts().len());
        assert_eq!(bank.slices().len(), bank.labels().len());
    }

    #[test]
    fn test_builtin_banks_partition_prompts() {
        assert_partition(&PromptBank::single_prompt());
        assert_partition(&PromptBank::multi_prompt());
        assert_partition(&PromptBank::multi_prompt().without_no_person());
    }

    #[test]
    fn test_single_prompt_bank_has_one_prompt_per_label() {
        let bank = PromptBank::single_prompt();
        assert_eq!(bank.labels().len(), 8);
        assert_eq!(bank.prompts().len(), 8);
        assert!(bank.position(Emotion::NoPerson).is_none());
    }

    #[test]
    fn test_multi_prompt_bank_covers_every_facial_label() {
        let bank = PromptBank::multi_prompt();
        for emotion in Emotion::FACIAL {
            let idx = bank.position(emotion).unwrap();
            assert!(!bank.slice(idx).is_empty(), "no prompts for {emotion}");
        }
    }

    #[test]
    fn test_multi_prompt_bank_has_no_person() {
        let bank = PromptBank::multi_prompt();
        let idx = bank.position(Emotion::NoPerson).unwrap();
        assert_eq!(bank.slice(idx).len(), 3);
        assert!(bank.without_no_person().position(Emotion::NoPerson).is_none());
    }

    #[test]
    fn test_rejects_invalid_entries() {
        let empty: Vec<(Emotion, Vec<&str>)> = vec![(Emotion::Happy, vec![])];
        assert!(PromptBank::from_entries(empty).is_err());

        let dup = vec![(Emotion::Happy, vec!["a"]), (Emotion::Happy, vec!["b"])];
        assert!(PromptBank::from_entries(dup).is_err());

        let only_empty_room = vec![(Emotion::NoPerson, vec!["an empty room"])];
        assert!(PromptBank::from_entries(only_empty_room).is_err());
    }
}
