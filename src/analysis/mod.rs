pub mod label;
pub mod sentiment;

pub use label::SentimentLabel;
pub use sentiment::{
    HeadlineSentiment, PolarityModel, PolarityScores, SentimentAnalyzer, SentimentSummary,
    VaderModel,
};
