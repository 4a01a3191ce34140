//! Capital ledger
//!
//! Atomic lock/unlock/spend/cooldown operations over a strategy's cash
//! buckets. Every operation is a read-modify-write through the store's
//! `mutate` primitive: current field values are re-read under the store
//! lock immediately before mutating, never cached across calls, because
//! multiple job runs may execute concurrently.

use crate::error::{EngineError, Result};
use crate::store::StrategyStore;
use crate::strategy::{Strategy, StrategyId};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

/// Ledger operations for all strategies
#[derive(Clone)]
pub struct CapitalLedger {
    strategies: Arc<dyn StrategyStore>,
}

impl CapitalLedger {
    /// Create a ledger over the given store
    pub fn new(strategies: Arc<dyn StrategyStore>) -> Self {
        Self { strategies }
    }

    /// Reserve cash against a new order
    ///
    /// Fails with `InsufficientCapital` when the strategy lacks free cash;
    /// nothing is mutated in that case.
    pub async fn lock(&self, id: StrategyId, amount: Decimal) -> Result<Strategy> {
        self.strategies
            .mutate(
                id,
                Box::new(move |s| {
                    if amount > s.available_cash {
                        return Err(EngineError::InsufficientCapital {
                            requested: amount,
                            available: s.available_cash,
                        });
                    }
                    s.available_cash -= amount;
                    s.locked_capital += amount;
                    Ok(())
                }),
            )
            .await
    }

    /// Release reserved cash back to availability
    ///
    /// Clamped so `locked_capital` never goes negative, which makes the
    /// operation idempotent against over-unlock from replayed work.
    pub async fn unlock(&self, id: StrategyId, amount: Decimal) -> Result<Strategy> {
        self.strategies
            .mutate(
                id,
                Box::new(move |s| {
                    s.locked_capital = (s.locked_capital - amount).max(dec!(0));
                    s.available_cash += amount;
                    Ok(())
                }),
            )
            .await
    }

    /// Accumulate spend into the current UTC-day bucket
    ///
    /// A new day resets the bucket to zero before accumulating.
    pub async fn record_daily_spend(&self, id: StrategyId, amount: Decimal) -> Result<Strategy> {
        let today = Utc::now().date_naive();
        self.strategies
            .mutate(
                id,
                Box::new(move |s| {
                    if s.daily_spent_date != today {
                        s.daily_spent = dec!(0);
                        s.daily_spent_date = today;
                    }
                    s.daily_spent += amount;
                    Ok(())
                }),
            )
            .await
    }

    /// Move free cash out of circulation on pause
    pub async fn enter_cooldown(&self, id: StrategyId) -> Result<Strategy> {
        self.strategies
            .mutate(
                id,
                Box::new(|s| {
                    s.cooldown_capital += s.available_cash;
                    s.available_cash = dec!(0);
                    Ok(())
                }),
            )
            .await
    }

    /// Restore cooldown cash to availability on resume
    pub async fn exit_cooldown(&self, id: StrategyId) -> Result<Strategy> {
        self.strategies
            .mutate(
                id,
                Box::new(|s| {
                    s.available_cash += s.cooldown_capital;
                    s.cooldown_capital = dec!(0);
                    Ok(())
                }),
            )
            .await
    }
}
