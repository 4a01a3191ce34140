//! Order model
//!
//! One row per real order submitted to the exchange. The row doubles as the
//! append-only source of truth for the capital ledger: reconciliation
//! recomputes every ledger field from these rows, so orders are never
//! deleted and terminal rows never change.

use crate::gate::OrderIntent;
use crate::signal::Side;
use crate::strategy::StrategyId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order identifier
pub type OrderId = Uuid;

/// Local fill state of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Submitted, no fill observed yet
    Pending,
    /// Some size matched; terminal once the remote order dies
    Partial,
    /// Fully matched
    Filled,
    /// Remote order died with zero fill
    Cancelled,
    /// Exchange refused the order at entry
    Rejected,
}

impl OrderStatus {
    /// Statuses with no outgoing transitions
    pub fn is_always_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

/// Settlement outcome, written by the external resolution process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderOutcome {
    /// Market not settled yet
    Open,
    /// Position resolved in the money
    Won,
    /// Position resolved worthless
    Lost,
    /// Order never built a position
    Cancelled,
    /// Position exited before settlement
    Sold,
}

impl OrderOutcome {
    /// Outcomes that contribute to realized P&L
    pub fn is_resolved(&self) -> bool {
        matches!(self, OrderOutcome::Won | OrderOutcome::Lost)
    }
}

/// A real order and its fill history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Order identifier
    pub id: OrderId,
    /// Owning strategy
    pub strategy_id: StrategyId,
    /// Originating signal (idempotency key)
    pub source_trade_id: String,
    /// Market (condition) identifier
    pub market_id: String,
    /// Outcome token traded
    pub token_id: String,
    /// Trade direction
    pub side: Side,

    /// Price of the simulated trade being mirrored
    pub signal_price: Decimal,
    /// Dollars requested and locked for this order
    pub signal_size_usd: Decimal,
    /// Limit price actually submitted (signal price plus slippage allowance)
    pub limit_price: Decimal,

    /// Volume-weighted fill price, once known
    pub executed_price: Option<Decimal>,
    /// Dollar value actually filled
    pub executed_size: Decimal,
    /// Shares bought so far
    pub shares_bought: Decimal,
    /// Shares still held (decremented by the resolution process on sale)
    pub shares_remaining: Decimal,
    /// Matched fraction of the remote order
    pub fill_rate: Decimal,

    /// Local fill state
    pub status: OrderStatus,
    /// Settlement outcome
    pub outcome: OrderOutcome,
    /// Realized profit or loss, set at resolution
    pub pnl: Option<Decimal>,
    /// Why the exchange refused the order, if it did
    pub rejection_reason: Option<String>,

    /// Exchange-assigned identifier
    pub exchange_order_id: Option<String>,
    /// Deterministic id making retries of the same intent idempotent
    pub client_request_id: String,

    /// Submission timestamp
    pub placed_at: DateTime<Utc>,
    /// First observed fill
    pub first_fill_at: Option<DateTime<Utc>>,
    /// Fully matched
    pub fully_filled_at: Option<DateTime<Utc>>,
    /// Entered a terminal status
    pub closed_at: Option<DateTime<Utc>>,
    /// Settled by the resolution process
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Create the pending row for a successfully submitted intent
    pub fn pending(intent: &OrderIntent, limit_price: Decimal, exchange_order_id: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            strategy_id: intent.strategy_id,
            source_trade_id: intent.source_trade_id.clone(),
            market_id: intent.market_id.clone(),
            token_id: intent.token_id.clone(),
            side: intent.side,
            signal_price: intent.price,
            signal_size_usd: intent.size_usd,
            limit_price,
            executed_price: None,
            executed_size: dec!(0),
            shares_bought: dec!(0),
            shares_remaining: dec!(0),
            fill_rate: dec!(0),
            status: OrderStatus::Pending,
            outcome: OrderOutcome::Open,
            pnl: None,
            rejection_reason: None,
            exchange_order_id: Some(exchange_order_id),
            client_request_id: intent.client_request_id.clone(),
            placed_at: Utc::now(),
            first_fill_at: None,
            fully_filled_at: None,
            closed_at: None,
            resolved_at: None,
        }
    }

    /// Create the audit row for a definitively rejected intent
    pub fn rejected(intent: &OrderIntent, limit_price: Decimal, reason: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            strategy_id: intent.strategy_id,
            source_trade_id: intent.source_trade_id.clone(),
            market_id: intent.market_id.clone(),
            token_id: intent.token_id.clone(),
            side: intent.side,
            signal_price: intent.price,
            signal_size_usd: intent.size_usd,
            limit_price,
            executed_price: None,
            executed_size: dec!(0),
            shares_bought: dec!(0),
            shares_remaining: dec!(0),
            fill_rate: dec!(0),
            status: OrderStatus::Rejected,
            outcome: OrderOutcome::Cancelled,
            pnl: None,
            rejection_reason: Some(reason),
            exchange_order_id: None,
            client_request_id: intent.client_request_id.clone(),
            placed_at: now,
            first_fill_at: None,
            fully_filled_at: None,
            closed_at: Some(now),
            resolved_at: None,
        }
    }

    /// Whether the fill synchronizer still polls this order
    pub fn is_open(&self) -> bool {
        match self.status {
            OrderStatus::Pending => true,
            OrderStatus::Partial => self.closed_at.is_none(),
            _ => false,
        }
    }

    /// Dollar value actually filled so far
    pub fn filled_value(&self) -> Decimal {
        self.executed_size
    }

    /// Locked dollars never filled, to release when the order closes
    pub fn unfilled_value(&self) -> Decimal {
        (self.signal_size_usd - self.executed_size).max(dec!(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::TimeInForce;

    fn test_intent() -> OrderIntent {
        OrderIntent {
            strategy_id: Uuid::new_v4(),
            source_trade_id: "trade-1".to_string(),
            market_id: "0xcondition".to_string(),
            token_id: "token-yes".to_string(),
            side: Side::Buy,
            price: dec!(0.55),
            size_usd: dec!(100),
            time_in_force: TimeInForce::Gtc,
            client_request_id: "req-1".to_string(),
        }
    }

    #[test]
    fn test_pending_order() {
        let order = Order::pending(&test_intent(), dec!(0.56), "ex-1".to_string());
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.outcome, OrderOutcome::Open);
        assert_eq!(order.signal_size_usd, dec!(100));
        assert_eq!(order.limit_price, dec!(0.56));
        assert_eq!(order.exchange_order_id.as_deref(), Some("ex-1"));
        assert!(order.is_open());
        assert_eq!(order.filled_value(), dec!(0));
        assert_eq!(order.unfilled_value(), dec!(100));
    }

    #[test]
    fn test_rejected_order_is_closed() {
        let order = Order::rejected(&test_intent(), dec!(0.56), "bad price".to_string());
        assert_eq!(order.status, OrderStatus::Rejected);
        assert_eq!(order.rejection_reason.as_deref(), Some("bad price"));
        assert!(order.closed_at.is_some());
        assert!(!order.is_open());
    }

    #[test]
    fn test_partial_open_until_closed() {
        let mut order = Order::pending(&test_intent(), dec!(0.56), "ex-1".to_string());
        order.status = OrderStatus::Partial;
        assert!(order.is_open());

        order.closed_at = Some(Utc::now());
        assert!(!order.is_open());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(OrderStatus::Filled.is_always_terminal());
        assert!(OrderStatus::Cancelled.is_always_terminal());
        assert!(OrderStatus::Rejected.is_always_terminal());
        assert!(!OrderStatus::Pending.is_always_terminal());
        assert!(!OrderStatus::Partial.is_always_terminal());
    }

    #[test]
    fn test_resolved_outcomes() {
        assert!(OrderOutcome::Won.is_resolved());
        assert!(OrderOutcome::Lost.is_resolved());
        assert!(!OrderOutcome::Open.is_resolved());
        assert!(!OrderOutcome::Cancelled.is_resolved());
        assert!(!OrderOutcome::Sold.is_resolved());
    }

    #[test]
    fn test_unfilled_value_clamped() {
        let mut order = Order::pending(&test_intent(), dec!(0.56), "ex-1".to_string());
        // Overfill beyond the requested size must not unlock negative amounts
        order.executed_size = dec!(110);
        assert_eq!(order.unfilled_value(), dec!(0));
    }
}
