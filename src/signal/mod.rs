//! Signal types
//!
//! A signal is one simulated trade emitted by the external producer. The
//! engine treats signals as read-only input and must tolerate the same
//! signal being redelivered: `(strategy_id, source_trade_id)` is processed
//! at most once.

use crate::error::{EngineError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trading side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy outcome tokens
    Buy,
    /// Sell outcome tokens
    Sell,
}

/// A simulated trade to mirror with real capital
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Idempotency key assigned by the producer
    pub source_trade_id: String,
    /// Market (condition) identifier
    pub market_id: String,
    /// Outcome token the simulated strategy traded
    pub token_id: String,
    /// Trade direction
    pub side: Side,
    /// Price the simulated strategy traded at
    pub suggested_price: Decimal,
    /// Dollar size the simulated strategy traded
    pub suggested_size_usd: Decimal,
    /// When the simulated trade happened
    pub timestamp: DateTime<Utc>,
}

impl Signal {
    /// Reject malformed signals before any capital or exchange interaction
    pub fn validate(&self) -> Result<()> {
        if self.source_trade_id.is_empty() {
            return Err(EngineError::Validation("empty source_trade_id".into()));
        }
        if self.market_id.is_empty() || self.token_id.is_empty() {
            return Err(EngineError::Validation("missing market identifiers".into()));
        }
        if self.suggested_price <= Decimal::ZERO || self.suggested_price >= Decimal::ONE {
            return Err(EngineError::Validation(format!(
                "price {} outside (0, 1)",
                self.suggested_price
            )));
        }
        if self.suggested_size_usd <= Decimal::ZERO {
            return Err(EngineError::Validation(format!(
                "non-positive size {}",
                self.suggested_size_usd
            )));
        }
        Ok(())
    }
}

/// External signal producer seam
///
/// Implementations must tolerate being polled repeatedly and may redeliver
/// signals already seen; dedup happens downstream in the risk gate.
#[async_trait]
pub trait SignalSource: Send + Sync {
    /// Fetch recent signals for one mirrored source
    async fn poll(&self, mirrored_source: &str) -> anyhow::Result<Vec<Signal>>;
}

/// Polls the signal producer over HTTP
pub struct HttpSignalSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSignalSource {
    /// Create a source polling the given base URL
    pub fn new(base_url: impl Into<String>, timeout: std::time::Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            base_url: base_url.into(),
            client,
        }
    }
}

#[async_trait]
impl SignalSource for HttpSignalSource {
    async fn poll(&self, mirrored_source: &str) -> anyhow::Result<Vec<Signal>> {
        let url = format!("{}/signals", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("source", mirrored_source)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Signal producer error: {} - {}", status, body);
        }

        let signals: Vec<Signal> = response.json().await?;
        tracing::debug!(
            source = mirrored_source,
            count = signals.len(),
            "Polled signal producer"
        );
        Ok(signals)
    }
}
