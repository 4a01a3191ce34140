//! Exchange order-entry interface
//!
//! The engine only ever sees this trait; the production implementation
//! talks to the Polymarket CLOB REST API. Errors are split into definitive
//! rejections (capital is released, an audit row is written) and transient
//! failures (state is left unchanged and the next cycle retries).

mod clob;
mod fills;

pub use clob::{ClobClient, ClobConfig, CLOB_API_URL};
pub use fills::{vwap, ClobFillResolver, FillPriceResolver};

use crate::signal::Side;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How long an order rests on the book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    /// Good until cancelled
    Gtc,
    /// Good until the expiration timestamp
    Gtd,
    /// Fill or kill
    Fok,
}

/// Order-entry errors
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    /// The exchange definitively refused the call
    #[error("order rejected: {0}")]
    Rejected(String),
    /// Timeout or network failure; the call may or may not have landed
    #[error("transient exchange failure: {0}")]
    Transient(String),
}

/// Parameters for one order-entry call
#[derive(Debug, Clone)]
pub struct PlaceOrderArgs {
    pub token_id: String,
    pub side: Side,
    /// Limit price
    pub price: Decimal,
    /// Size in shares
    pub size: Decimal,
    pub time_in_force: TimeInForce,
    /// Required for GTD orders
    pub expiration: Option<DateTime<Utc>>,
    /// Stable across retries of the same intent
    pub client_request_id: String,
}

/// Remote lifecycle state of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOrderStatus {
    /// Resting on the book
    Live,
    /// Being processed by the matching engine
    Delayed,
    /// Fully matched
    Matched,
    /// Cancelled by the user or the exchange
    Cancelled,
    /// Expired off the book
    Expired,
}

/// Exchange truth for one order, fetched on every sync
#[derive(Debug, Clone)]
pub struct RemoteOrderState {
    pub status: RemoteOrderStatus,
    /// Shares matched so far
    pub size_matched: Decimal,
    /// Shares originally placed
    pub original_size: Decimal,
    /// Limit price on the book
    pub price: Decimal,
}

impl RemoteOrderState {
    /// The remote order is dead and will never match more size
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            RemoteOrderStatus::Cancelled | RemoteOrderStatus::Expired
        )
    }

    /// All placed size has matched
    pub fn is_fully_matched(&self) -> bool {
        self.original_size > Decimal::ZERO && self.size_matched >= self.original_size
    }
}

/// Exchange order-entry seam
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Submit an order; returns the exchange-assigned order id
    async fn place(&self, args: &PlaceOrderArgs) -> Result<String, ExchangeError>;

    /// Cancel a resting order
    async fn cancel(&self, exchange_order_id: &str) -> Result<(), ExchangeError>;

    /// Fetch current remote state for an order
    async fn get_order(&self, exchange_order_id: &str) -> Result<RemoteOrderState, ExchangeError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_terminal_states() {
        let mut state = RemoteOrderState {
            status: RemoteOrderStatus::Live,
            size_matched: dec!(0),
            original_size: dec!(100),
            price: dec!(0.55),
        };
        assert!(!state.is_terminal());

        state.status = RemoteOrderStatus::Cancelled;
        assert!(state.is_terminal());

        state.status = RemoteOrderStatus::Expired;
        assert!(state.is_terminal());

        state.status = RemoteOrderStatus::Matched;
        assert!(!state.is_terminal());
    }

    #[test]
    fn test_fully_matched() {
        let state = RemoteOrderState {
            status: RemoteOrderStatus::Matched,
            size_matched: dec!(100),
            original_size: dec!(100),
            price: dec!(0.55),
        };
        assert!(state.is_fully_matched());

        let partial = RemoteOrderState {
            size_matched: dec!(40),
            ..state.clone()
        };
        assert!(!partial.is_fully_matched());

        // Degenerate zero-size order never counts as matched
        let empty = RemoteOrderState {
            size_matched: dec!(0),
            original_size: dec!(0),
            ..state
        };
        assert!(!empty.is_fully_matched());
    }

    #[test]
    fn test_time_in_force_serde() {
        assert_eq!(
            serde_json::to_string(&TimeInForce::Gtc).unwrap(),
            "\"GTC\""
        );
        assert_eq!(
            serde_json::from_str::<TimeInForce>("\"FOK\"").unwrap(),
            TimeInForce::Fok
        );
    }
}
