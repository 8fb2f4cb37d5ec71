use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{error, info};

use super::{CryptoPriceSource, Fetched};
use crate::error::SourceError;

pub const KRAKEN_API_URL: &str = "https://api.kraken.com";
/// Kraken's name for BTC/USD.
pub const BTC_USD_PAIR: &str = "XXBTZUSD";

#[derive(Debug, Deserialize)]
struct TickerResponse {
    #[serde(default)]
    error: Vec<String>,
    result: Option<HashMap<String, TickerInfo>>,
}

#[derive(Debug, Deserialize)]
struct TickerInfo {
    /// Last trade closed: [price, lot volume].
    c: Vec<String>,
}

pub struct KrakenPriceSource {
    client: Client,
    base_url: String,
    pair: String,
}

impl KrakenPriceSource {
    pub fn new() -> Self {
        Self::with_base_url(KRAKEN_API_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            pair: BTC_USD_PAIR.to_string(),
        }
    }

    pub async fn fetch_price(&self) -> Result<f64, SourceError> {
        let url = format!("{}/0/public/Ticker", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .query(&[("pair", self.pair.as_str())])
            .send()
            .await?
            .error_for_status()?;

        let body: TickerResponse = response.json().await?;

        if !body.error.is_empty() {
            return Err(SourceError::provider_error(body.error.join(", ")));
        }

        let ticker = body
            .result
            .as_ref()
            .and_then(|result| result.get(&self.pair))
            .ok_or_else(|| SourceError::malformed(format!("no ticker for {}", self.pair)))?;

        let last = ticker
            .c
            .first()
            .ok_or_else(|| SourceError::malformed("empty last-trade field"))?;

        last.parse::<f64>()
            .map_err(|_| SourceError::malformed(format!("unparsable price '{}'", last)))
    }
}

impl Default for KrakenPriceSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CryptoPriceSource for KrakenPriceSource {
    async fn latest_price(&self) -> Fetched<f64> {
        match self.fetch_price().await {
            Ok(price) => {
                info!("Kraken BTC/USD price: {}", price);
                Fetched::Live(price)
            }
            Err(e) => {
                error!("Could not get BTC price from Kraken: {}", e);
                Fetched::fallback(0.0, e.to_string())
            }
        }
    }
}
