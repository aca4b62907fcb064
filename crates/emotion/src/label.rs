//! Emotion vocabulary

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Emotion label (closed vocabulary)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Happy,
    Sad,
    Neutral,
    Confused,
    Focused,
    Surprised,
    Frustrated,
    Tired,
    Bored,
    Angry,
    /// Frame without a person; never reported as a snapshot emotion
    NoPerson,
}

impl Emotion {
    /// Facial labels in reporting order
    pub const FACIAL: [Emotion; 10] = [
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Neutral,
        Emotion::Confused,
        Emotion::Focused,
        Emotion::Surprised,
        Emotion::Frustrated,
        Emotion::Tired,
        Emotion::Bored,
        Emotion::Angry,
    ];

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Neutral => "neutral",
            Emotion::Confused => "confused",
            Emotion::Focused => "focused",
            Emotion::Surprised => "surprised",
            Emotion::Frustrated => "frustrated",
            Emotion::Tired => "tired",
            Emotion::Bored => "bored",
            Emotion::Angry => "angry",
            Emotion::NoPerson => "no_person",
        }
    }

    /// Whether this label describes a facial expression
    pub fn is_facial(&self) -> bool {
        *self != Emotion::NoPerson
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Emotion::FACIAL
            .iter()
            .chain(std::iter::once(&Emotion::NoPerson))
            .find(|e| e.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown emotion: {s}"))
    }
}
