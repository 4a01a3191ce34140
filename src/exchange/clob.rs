//! Polymarket CLOB order-entry client
//!
//! REST client for placing, cancelling, and inspecting orders. Request
//! signing happens in the custody layer upstream; this client only carries
//! an already-provisioned API key.

use super::{
    ExchangeClient, ExchangeError, PlaceOrderArgs, RemoteOrderState, RemoteOrderStatus,
};
use crate::signal::Side;
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// CLOB REST base URL
pub const CLOB_API_URL: &str = "https://clob.polymarket.com";

/// Configuration for the CLOB client
#[derive(Debug, Clone)]
pub struct ClobConfig {
    /// Base URL for the CLOB API
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Optional API key header
    pub api_key: Option<String>,
}

impl Default for ClobConfig {
    fn default() -> Self {
        Self {
            base_url: CLOB_API_URL.to_string(),
            timeout: Duration::from_secs(10),
            api_key: None,
        }
    }
}

/// Client for the CLOB order-entry API
pub struct ClobClient {
    config: ClobConfig,
    client: Client,
}

impl ClobClient {
    /// Create a new client with default configuration
    pub fn new() -> Self {
        Self::with_config(ClobConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClobConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.header("POLY-API-KEY", key),
            None => builder,
        }
    }
}

impl Default for ClobClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExchangeClient for ClobClient {
    async fn place(&self, args: &PlaceOrderArgs) -> Result<String, ExchangeError> {
        let url = format!("{}/order", self.config.base_url);
        let body = ClobOrderRequest::from_args(args);

        tracing::debug!(
            token_id = %args.token_id,
            price = %args.price,
            size = %args.size,
            client_request_id = %args.client_request_id,
            "Submitting order to CLOB"
        );

        let response = self
            .request(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(transient)?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExchangeError::Rejected(format!("{} - {}", status, body)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExchangeError::Transient(format!("{} - {}", status, body)));
        }

        let placed: ClobOrderResponse = response.json().await.map_err(transient)?;
        if !placed.success {
            return Err(ExchangeError::Rejected(
                placed.error_msg.unwrap_or_else(|| "unspecified".to_string()),
            ));
        }
        placed
            .order_id
            .ok_or_else(|| ExchangeError::Rejected("no order id in response".to_string()))
    }

    async fn cancel(&self, exchange_order_id: &str) -> Result<(), ExchangeError> {
        let url = format!("{}/order", self.config.base_url);

        let response = self
            .request(self.client.delete(&url))
            .json(&serde_json::json!({ "orderID": exchange_order_id }))
            .send()
            .await
            .map_err(transient)?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExchangeError::Rejected(format!("{} - {}", status, body)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExchangeError::Transient(format!("{} - {}", status, body)));
        }
        Ok(())
    }

    async fn get_order(&self, exchange_order_id: &str) -> Result<RemoteOrderState, ExchangeError> {
        let url = format!("{}/data/order/{}", self.config.base_url, exchange_order_id);

        let response = self
            .request(self.client.get(&url))
            .send()
            .await
            .map_err(transient)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExchangeError::Transient(format!("{} - {}", status, body)));
        }

        let raw: ClobOpenOrder = response.json().await.map_err(transient)?;
        raw.into_remote_state()
    }
}

fn transient(e: impl std::fmt::Display) -> ExchangeError {
    ExchangeError::Transient(e.to_string())
}

/// Order submission body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClobOrderRequest {
    token_id: String,
    side: &'static str,
    price: Decimal,
    size: Decimal,
    time_in_force: super::TimeInForce,
    #[serde(skip_serializing_if = "Option::is_none")]
    expiration: Option<i64>,
    client_id: String,
}

impl ClobOrderRequest {
    fn from_args(args: &PlaceOrderArgs) -> Self {
        Self {
            token_id: args.token_id.clone(),
            side: match args.side {
                Side::Buy => "BUY",
                Side::Sell => "SELL",
            },
            price: args.price,
            size: args.size,
            time_in_force: args.time_in_force,
            expiration: args.expiration.map(|t| t.timestamp()),
            client_id: args.client_request_id.clone(),
        }
    }
}

/// Order submission response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClobOrderResponse {
    #[serde(default)]
    success: bool,
    error_msg: Option<String>,
    #[serde(rename = "orderID")]
    order_id: Option<String>,
}

/// Raw order state from the data API; decimals arrive as strings
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClobOpenOrder {
    status: String,
    size_matched: String,
    original_size: String,
    price: String,
}

impl ClobOpenOrder {
    fn into_remote_state(self) -> Result<RemoteOrderState, ExchangeError> {
        let status = match self.status.to_uppercase().as_str() {
            "LIVE" => RemoteOrderStatus::Live,
            "DELAYED" => RemoteOrderStatus::Delayed,
            "MATCHED" => RemoteOrderStatus::Matched,
            "CANCELED" | "CANCELLED" => RemoteOrderStatus::Cancelled,
            "EXPIRED" => RemoteOrderStatus::Expired,
            other => {
                return Err(ExchangeError::Transient(format!(
                    "unknown order status: {}",
                    other
                )))
            }
        };

        Ok(RemoteOrderState {
            status,
            size_matched: parse_decimal(&self.size_matched)?,
            original_size: parse_decimal(&self.original_size)?,
            price: parse_decimal(&self.price)?,
        })
    }
}

fn parse_decimal(s: &str) -> Result<Decimal, ExchangeError> {
    Decimal::from_str(s)
        .map_err(|e| ExchangeError::Transient(format!("bad decimal {:?}: {}", s, e)))
}
