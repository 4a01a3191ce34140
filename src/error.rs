//! Engine error taxonomy
//!
//! Typed errors for everything that can go wrong inside the core. Rejection
//! reasons from the risk gate are control-flow values, not errors, and live
//! in `crate::gate`.

use rust_decimal::Decimal;
use uuid::Uuid;

/// Result alias used throughout the engine
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the execution and ledger core
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Malformed signal or intent, rejected before any side effects
    #[error("validation failed: {0}")]
    Validation(String),

    /// Ledger lock refused because the strategy lacks free cash
    #[error("insufficient capital: requested {requested}, available {available}")]
    InsufficientCapital {
        requested: Decimal,
        available: Decimal,
    },

    /// Strategy row missing from the store
    #[error("strategy {0} not found")]
    StrategyNotFound(Uuid),

    /// Order row missing from the store
    #[error("order {0} not found")]
    OrderNotFound(Uuid),

    /// Attempted mutation of an order already in a terminal status
    #[error("order {0} is terminal and cannot change")]
    OrderTerminal(Uuid),

    /// Exchange gave a definitive rejection for an order-entry call
    #[error("exchange rejected order: {0}")]
    ExchangeRejected(String),

    /// Timeout or network failure talking to the exchange; retried next cycle
    #[error("transient exchange error: {0}")]
    ExchangeTransient(String),
}

impl EngineError {
    /// True when the next scheduled cycle should retry the same unit of work
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::ExchangeTransient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_insufficient_capital_display() {
        let err = EngineError::InsufficientCapital {
            requested: dec!(100),
            available: dec!(40),
        };
        assert_eq!(
            err.to_string(),
            "insufficient capital: requested 100, available 40"
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(EngineError::ExchangeTransient("timeout".into()).is_transient());
        assert!(!EngineError::ExchangeRejected("bad price".into()).is_transient());
        assert!(!EngineError::Validation("empty token".into()).is_transient());
    }

    #[test]
    fn test_not_found_display() {
        let id = Uuid::new_v4();
        let err = EngineError::StrategyNotFound(id);
        assert!(err.to_string().contains(&id.to_string()));
    }
}
