//! External data sources.
//!
//! Every source answers with a [`Fetched`] value: either live data or the
//! documented fallback for that source together with the reason it was used.
//! Sources never return errors to the caller.

pub mod ibkr;
pub mod kraken;
pub mod newsapi;
pub mod tws;

use async_trait::async_trait;
use serde::Serialize;

pub use ibkr::{IbkrReferenceSource, UNKNOWN_ASSET_NAME};
pub use kraken::KrakenPriceSource;
pub use newsapi::NewsApiSource;
pub use tws::ContractSpec;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Fetched<T> {
    Live(T),
    Fallback { value: T, reason: String },
}

impl<T> Fetched<T> {
    pub fn fallback(value: T, reason: impl Into<String>) -> Self {
        Self::Fallback {
            value,
            reason: reason.into(),
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Self::Live(value) | Self::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Self::Live(value) | Self::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            Self::Live(_) => None,
            Self::Fallback { reason, .. } => Some(reason),
        }
    }
}

/// Spot price of the tracked crypto asset. Falls back to `0.0`.
#[async_trait]
pub trait CryptoPriceSource: Send + Sync {
    async fn latest_price(&self) -> Fetched<f64>;
}

/// Long name of the reference asset. Falls back to `"Unknown"`.
#[async_trait]
pub trait ReferenceAssetSource: Send + Sync {
    async fn long_name(&self) -> Fetched<String>;
}

/// Headlines matching a query, newest first. Falls back to an empty list.
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn headlines(&self, query: &str) -> Fetched<Vec<String>>;
}
