use serde::Serialize;
use tracing::{info, warn};

use crate::analysis::{SentimentAnalyzer, SentimentSummary};
use crate::connectors::{CryptoPriceSource, Fetched, NewsSource, ReferenceAssetSource};
use crate::report::ReportInputs;

/// A source that answered with its fallback value during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegradedSource {
    pub source: &'static str,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SentinelRun {
    pub report: ReportInputs,
    pub sentiment: SentimentSummary,
    pub degraded: Vec<DegradedSource>,
}

impl SentinelRun {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

/// Runs the three fetches strictly one after another and folds the results
/// into report inputs.
pub struct Pipeline {
    reference: Box<dyn ReferenceAssetSource>,
    news: Box<dyn NewsSource>,
    crypto: Box<dyn CryptoPriceSource>,
    analyzer: SentimentAnalyzer,
}

impl Pipeline {
    pub fn new(
        reference: Box<dyn ReferenceAssetSource>,
        news: Box<dyn NewsSource>,
        crypto: Box<dyn CryptoPriceSource>,
    ) -> Self {
        Self {
            reference,
            news,
            crypto,
            analyzer: SentimentAnalyzer::new(),
        }
    }

    pub async fn run(&self) -> SentinelRun {
        let mut degraded = Vec::new();

        let name = self.reference.long_name().await;
        note_fallback(&mut degraded, "IBKR", &name);
        let name = name.into_value();
        info!("Reference asset: {}", name);

        // The query goes out even when the name is the fallback.
        let headlines = self.news.headlines(&name).await;
        note_fallback(&mut degraded, "NewsAPI", &headlines);
        let sentiment = self.analyzer.analyze_headlines(headlines.value());

        let price = self.crypto.latest_price().await;
        note_fallback(&mut degraded, "Kraken", &price);

        info!("Data collected, building report");

        SentinelRun {
            report: ReportInputs {
                reference_asset_name: name,
                average_compound: sentiment.average_compound,
                crypto_price: price.into_value(),
            },
            sentiment,
            degraded,
        }
    }
}

fn note_fallback<T>(degraded: &mut Vec<DegradedSource>, source: &'static str, fetched: &Fetched<T>) {
    if let Some(reason) = fetched.fallback_reason() {
        warn!("{} unavailable, using fallback value: {}", source, reason);
        degraded.push(DegradedSource {
            source,
            reason: reason.to_string(),
        });
    }
}
