//! Risk gate
//!
//! Validates and sizes incoming signals against ledger state and configured
//! limits, short-circuiting on the first failed check. An approved signal
//! has its sized amount locked in the ledger and becomes an `OrderIntent`;
//! a rejected signal records its reason and touches nothing.
//!
//! The check-then-act sequence is not linearizable across concurrent
//! signals for the same strategy; callers must serialize per strategy (the
//! engine processes one strategy's signals sequentially). Signals for
//! different strategies are fully independent.

mod sizing;

pub use sizing::{sizer_for, FixedSizer, FractionSizer, SignalSizer};

use crate::error::{EngineError, Result};
use crate::exchange::TimeInForce;
use crate::ledger::CapitalLedger;
use crate::signal::{Side, Signal};
use crate::store::{OrderStore, StrategyStore};
use crate::strategy::StrategyId;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;

/// An approved, sized, capital-backed order instruction
#[derive(Debug, Clone)]
pub struct OrderIntent {
    pub strategy_id: StrategyId,
    /// Idempotency key of the originating signal
    pub source_trade_id: String,
    pub market_id: String,
    pub token_id: String,
    pub side: Side,
    /// Signal price; the placement layer applies slippage on top
    pub price: Decimal,
    /// Dollars locked for this order
    pub size_usd: Decimal,
    pub time_in_force: TimeInForce,
    /// Deterministic per (strategy, signal); stable across retries
    pub client_request_id: String,
}

/// Why the gate refused a signal
#[derive(Debug, Clone, PartialEq)]
pub enum RejectionReason {
    StrategyInactive,
    StrategyPaused,
    DuplicateSignal,
    BelowMinOrderSize { sized: Decimal, min: Decimal },
    AboveMaxOrderSize { sized: Decimal, max: Decimal },
    DailyBudgetExhausted { sized: Decimal, remaining: Decimal },
    InsufficientCapital { sized: Decimal, available: Decimal },
}

impl RejectionReason {
    /// Stable label for logs, metrics, and user-visible rejection records
    pub fn as_label(&self) -> &'static str {
        match self {
            RejectionReason::StrategyInactive => "strategy_inactive",
            RejectionReason::StrategyPaused => "strategy_paused",
            RejectionReason::DuplicateSignal => "duplicate_signal",
            RejectionReason::BelowMinOrderSize { .. } => "below_min_order_size",
            RejectionReason::AboveMaxOrderSize { .. } => "above_max_order_size",
            RejectionReason::DailyBudgetExhausted { .. } => "daily_budget_exhausted",
            RejectionReason::InsufficientCapital { .. } => "insufficient_capital",
        }
    }
}

/// Outcome of evaluating one signal
#[derive(Debug, Clone)]
pub enum GateDecision {
    /// Capital is locked; hand the intent to order placement
    Approved(OrderIntent),
    /// Nothing was touched
    Rejected(RejectionReason),
}

/// The risk gate for all strategies
#[derive(Clone)]
pub struct RiskGate {
    strategies: Arc<dyn StrategyStore>,
    orders: Arc<dyn OrderStore>,
    ledger: CapitalLedger,
}

impl RiskGate {
    /// Create a gate over the given stores
    pub fn new(
        strategies: Arc<dyn StrategyStore>,
        orders: Arc<dyn OrderStore>,
        ledger: CapitalLedger,
    ) -> Self {
        Self {
            strategies,
            orders,
            ledger,
        }
    }

    /// Evaluate one signal for one strategy
    ///
    /// On approval the sized amount is already locked when this returns.
    pub async fn evaluate(&self, strategy_id: StrategyId, signal: &Signal) -> Result<GateDecision> {
        signal.validate()?;

        let strategy = self.strategies.get(strategy_id).await?;

        if !strategy.is_active {
            return Ok(self.reject(strategy_id, signal, RejectionReason::StrategyInactive));
        }
        if strategy.is_paused {
            return Ok(self.reject(strategy_id, signal, RejectionReason::StrategyPaused));
        }

        // Dedup on (strategy, source_trade_id): any existing order row,
        // including a rejected audit row, marks the signal as processed
        if self
            .orders
            .find_by_signal(strategy_id, &signal.source_trade_id)
            .await?
            .is_some()
        {
            return Ok(self.reject(strategy_id, signal, RejectionReason::DuplicateSignal));
        }

        let sized = sizer_for(&strategy.sizing).size(signal, &strategy);

        if sized < strategy.min_order_size {
            return Ok(self.reject(
                strategy_id,
                signal,
                RejectionReason::BelowMinOrderSize {
                    sized,
                    min: strategy.min_order_size,
                },
            ));
        }
        if sized > strategy.max_order_size {
            return Ok(self.reject(
                strategy_id,
                signal,
                RejectionReason::AboveMaxOrderSize {
                    sized,
                    max: strategy.max_order_size,
                },
            ));
        }

        if let Some(remaining) = strategy.daily_budget_remaining(Utc::now().date_naive()) {
            if remaining < sized {
                return Ok(self.reject(
                    strategy_id,
                    signal,
                    RejectionReason::DailyBudgetExhausted { sized, remaining },
                ));
            }
        }

        if strategy.available_cash < sized {
            return Ok(self.reject(
                strategy_id,
                signal,
                RejectionReason::InsufficientCapital {
                    sized,
                    available: strategy.available_cash,
                },
            ));
        }

        // The lock re-reads available cash under the store lock, so a
        // concurrent spend between the check above and here still cannot
        // overdraw; it surfaces as a rejection instead
        match self.ledger.lock(strategy_id, sized).await {
            Ok(_) => {}
            Err(EngineError::InsufficientCapital {
                requested,
                available,
            }) => {
                return Ok(self.reject(
                    strategy_id,
                    signal,
                    RejectionReason::InsufficientCapital {
                        sized: requested,
                        available,
                    },
                ));
            }
            Err(e) => return Err(e),
        }

        let intent = OrderIntent {
            strategy_id,
            source_trade_id: signal.source_trade_id.clone(),
            market_id: signal.market_id.clone(),
            token_id: signal.token_id.clone(),
            side: signal.side,
            price: signal.suggested_price,
            size_usd: sized,
            time_in_force: TimeInForce::Gtc,
            client_request_id: client_request_id(strategy_id, &signal.source_trade_id),
        };

        tracing::info!(
            strategy_id = %strategy_id,
            source_trade_id = %signal.source_trade_id,
            size_usd = %sized,
            "Signal approved, capital locked"
        );

        Ok(GateDecision::Approved(intent))
    }

    fn reject(
        &self,
        strategy_id: StrategyId,
        signal: &Signal,
        reason: RejectionReason,
    ) -> GateDecision {
        tracing::info!(
            strategy_id = %strategy_id,
            source_trade_id = %signal.source_trade_id,
            reason = reason.as_label(),
            "Signal rejected"
        );
        crate::telemetry::record_gate_rejection(reason.as_label());
        GateDecision::Rejected(reason)
    }
}

/// Deterministic client request id per (strategy, signal)
fn client_request_id(strategy_id: StrategyId, source_trade_id: &str) -> String {
    format!("mirror-{}-{}", strategy_id.simple(), source_trade_id)
}
