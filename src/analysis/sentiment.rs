//! Headline sentiment scoring.
//!
//! Each headline is scored with a lexicon/rule-based polarity model (VADER in
//! production) and the compound scores are averaged without weighting.

use serde::{Deserialize, Serialize};
use tracing::info;
use vader_sentiment::SentimentIntensityAnalyzer;

/// Raw output of a polarity model for one piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarityScores {
    pub negative: f64,
    pub neutral: f64,
    pub positive: f64,
    pub compound: f64,
}

/// Deterministic text scorer. Must accept any string.
pub trait PolarityModel: Send + Sync {
    fn polarity_scores(&self, text: &str) -> PolarityScores;
}

pub struct VaderModel {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl VaderModel {
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }
}

impl Default for VaderModel {
    fn default() -> Self {
        Self::new()
    }
}

impl PolarityModel for VaderModel {
    fn polarity_scores(&self, text: &str) -> PolarityScores {
        if text.trim().is_empty() {
            return PolarityScores {
                negative: 0.0,
                neutral: 0.0,
                positive: 0.0,
                compound: 0.0,
            };
        }

        let scores = self.analyzer.polarity_scores(text);
        let get = |key: &str| scores.get(key).copied().unwrap_or(0.0);
        PolarityScores {
            negative: get("neg"),
            neutral: get("neu"),
            positive: get("pos"),
            compound: get("compound"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadlineSentiment {
    pub headline: String,
    pub negative: f64,
    pub neutral: f64,
    pub positive: f64,
    pub compound: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSummary {
    pub average_compound: f64,
    pub details: Vec<HeadlineSentiment>,
}

impl SentimentSummary {
    /// Result for an empty headline list.
    pub fn empty() -> Self {
        Self {
            average_compound: 0.0,
            details: Vec::new(),
        }
    }
}

pub struct SentimentAnalyzer<M = VaderModel> {
    model: M,
}

impl SentimentAnalyzer<VaderModel> {
    pub fn new() -> Self {
        Self::with_model(VaderModel::new())
    }
}

impl Default for SentimentAnalyzer<VaderModel> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: PolarityModel> SentimentAnalyzer<M> {
    pub fn with_model(model: M) -> Self {
        Self { model }
    }

    pub fn analyze_headlines(&self, headlines: &[String]) -> SentimentSummary {
        if headlines.is_empty() {
            info!("Headline list is empty, nothing to analyze");
            return SentimentSummary::empty();
        }

        info!("Analyzing {} headlines...", headlines.len());

        let details: Vec<HeadlineSentiment> = headlines
            .iter()
            .map(|headline| {
                let scores = self.model.polarity_scores(headline);
                HeadlineSentiment {
                    headline: headline.clone(),
                    negative: scores.negative,
                    neutral: scores.neutral,
                    positive: scores.positive,
                    compound: scores.compound,
                }
            })
            .collect();

        let total: f64 = details.iter().map(|d| d.compound).sum();
        let average_compound = total / details.len() as f64;

        info!("Analysis complete. Average compound sentiment: {:.4}", average_compound);

        SentimentSummary {
            average_compound,
            details,
        }
    }
}
