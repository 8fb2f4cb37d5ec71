use serde::{Deserialize, Serialize};
use std::fmt;

const STRONG_THRESHOLD: f64 = 0.3;
const NEUTRAL_BAND: f64 = 0.05;

/// Qualitative reading of an average compound score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    NeutralPositive,
    Neutral,
    NeutralNegative,
    Negative,
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positive => write!(f, "POSITIVE"),
            Self::NeutralPositive => write!(f, "NEUTRAL-POSITIVE"),
            Self::Neutral => write!(f, "NEUTRAL"),
            Self::NeutralNegative => write!(f, "NEUTRAL-NEGATIVE"),
            Self::Negative => write!(f, "NEGATIVE"),
        }
    }
}

impl SentimentLabel {
    /// Total over every `f64`; NaN reads as `Neutral`.
    pub fn from_score(score: f64) -> Self {
        if score > STRONG_THRESHOLD {
            Self::Positive
        } else if score > NEUTRAL_BAND {
            Self::NeutralPositive
        } else if score < -STRONG_THRESHOLD {
            Self::Negative
        } else if score < -NEUTRAL_BAND {
            Self::NeutralNegative
        } else {
            Self::Neutral
        }
    }
}
