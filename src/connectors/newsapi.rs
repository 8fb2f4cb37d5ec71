use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info};

use super::{Fetched, NewsSource};
use crate::error::SourceError;

pub const NEWS_API_URL: &str = "https://newsapi.org";

#[derive(Debug, Deserialize)]
struct EverythingResponse {
    status: Option<String>,
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
}

pub struct NewsApiSource {
    client: Client,
    base_url: String,
    api_key: String,
}

impl NewsApiSource {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, NEWS_API_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            // NewsAPI rejects requests without a User-Agent.
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .user_agent(concat!("sentinel/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub async fn fetch_headlines(&self, query: &str) -> Result<Vec<String>, SourceError> {
        let url = format!("{}/v2/everything", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query),
                ("language", "en"),
                ("sortBy", "publishedAt"),
                ("apiKey", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: EverythingResponse = response.json().await?;

        if body.status.as_deref() == Some("error") {
            return Err(SourceError::provider_error(
                body.message.unwrap_or_else(|| "unspecified NewsAPI error".to_string()),
            ));
        }

        Ok(body.articles.into_iter().filter_map(|a| a.title).collect())
    }
}

#[async_trait]
impl NewsSource for NewsApiSource {
    async fn headlines(&self, query: &str) -> Fetched<Vec<String>> {
        match self.fetch_headlines(query).await {
            Ok(headlines) => {
                info!("NewsAPI returned {} headlines for '{}'", headlines.len(), query);
                Fetched::Live(headlines)
            }
            Err(e) => {
                error!("NewsAPI request for '{}' failed: {}", query, e);
                Fetched::fallback(Vec::new(), e.to_string())
            }
        }
    }
}
