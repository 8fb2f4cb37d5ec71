use async_trait::async_trait;
use std::time::Duration;
use tracing::{error, info};

use super::tws::{ContractSpec, TwsSession};
use super::{Fetched, ReferenceAssetSource};
use crate::config::IbkrConfig;
use crate::error::SourceError;

/// Name reported when the reference asset cannot be resolved.
pub const UNKNOWN_ASSET_NAME: &str = "Unknown";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolves the reference asset (SPY by default) through TWS / IB Gateway.
pub struct IbkrReferenceSource {
    host: String,
    port: u16,
    client_id: i32,
    contract: ContractSpec,
    timeout: Duration,
}

impl IbkrReferenceSource {
    pub fn new(config: &IbkrConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            client_id: config.client_id,
            contract: ContractSpec::stock("SPY", "SMART", "USD"),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_contract(mut self, contract: ContractSpec) -> Self {
        self.contract = contract;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Connects, asks for the contract details and disconnects again. The
    /// session is released whether or not the lookup succeeded.
    pub async fn fetch_long_name(&self) -> Result<String, SourceError> {
        info!(
            "Connecting to IBKR at {}:{} with client id {}...",
            self.host, self.port, self.client_id
        );
        let mut session =
            TwsSession::connect(&self.host, self.port, self.client_id, self.timeout).await?;

        let result = session.request_long_name(&self.contract).await;
        session.disconnect().await;

        let long_name = result?;
        if long_name.trim().is_empty() {
            return Err(SourceError::not_found(format!(
                "contract {} has no long name",
                self.contract.symbol
            )));
        }
        Ok(long_name)
    }
}

#[async_trait]
impl ReferenceAssetSource for IbkrReferenceSource {
    async fn long_name(&self) -> Fetched<String> {
        match self.fetch_long_name().await {
            Ok(name) => {
                info!("IBKR contract name: {}", name);
                Fetched::Live(name)
            }
            Err(SourceError::ConnectionRefused { host, port }) => {
                error!(
                    "Connection refused. Is TWS/Gateway running with the API enabled on {}:{}?",
                    host, port
                );
                Fetched::fallback(
                    UNKNOWN_ASSET_NAME.to_string(),
                    format!("connection refused by {}:{}", host, port),
                )
            }
            Err(e) => {
                error!("Interactive Brokers lookup failed: {}", e);
                Fetched::fallback(UNKNOWN_ASSET_NAME.to_string(), e.to_string())
            }
        }
    }
}
