//! Risk manager
//!
//! Per-strategy circuit breaker: ACTIVE and PAUSED states with automatic
//! transitions driven by drawdown, consecutive losses, and daily realized
//! loss. Pausing sweeps free cash into the cooldown bucket; resuming
//! (manual, or automatic once the cooldown elapses) sweeps it back. The
//! operator commands and the automatic breaker converge through the same
//! ledger operations, so they are safe to run concurrently.

use crate::error::Result;
use crate::ledger::CapitalLedger;
use crate::order::OrderOutcome;
use crate::store::{OrderFilter, OrderStore, PageRequest, StrategyStore};
use crate::strategy::{PauseReason, Strategy, StrategyId};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Instant;

/// Counters for one risk cycle
#[derive(Debug, Default, Clone, Copy)]
pub struct RiskStats {
    pub evaluated: usize,
    pub paused: usize,
    pub resumed: usize,
    pub failed: usize,
    pub deadline_hit: bool,
}

/// Circuit breaker over all strategies
#[derive(Clone)]
pub struct RiskManager {
    strategies: Arc<dyn StrategyStore>,
    orders: Arc<dyn OrderStore>,
    ledger: CapitalLedger,
    page_size: usize,
}

impl RiskManager {
    /// Create a risk manager over the given stores
    pub fn new(
        strategies: Arc<dyn StrategyStore>,
        orders: Arc<dyn OrderStore>,
        ledger: CapitalLedger,
        page_size: usize,
    ) -> Self {
        Self {
            strategies,
            orders,
            ledger,
            page_size,
        }
    }

    /// Evaluate every active strategy once, stopping at the deadline
    pub async fn evaluate_all(&self, deadline: Instant) -> RiskStats {
        let mut stats = RiskStats::default();

        let mut request = PageRequest::first(self.page_size);
        loop {
            let page = match self.strategies.list_active(request).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to list strategies");
                    return stats;
                }
            };

            for strategy in &page.items {
                if Instant::now() >= deadline {
                    stats.deadline_hit = true;
                    return stats;
                }

                stats.evaluated += 1;
                match self.evaluate_strategy(strategy.id).await {
                    Ok(Evaluation::Paused(_)) => stats.paused += 1,
                    Ok(Evaluation::Resumed) => stats.resumed += 1,
                    Ok(Evaluation::Unchanged) => {}
                    Err(e) => {
                        stats.failed += 1;
                        tracing::warn!(
                            strategy_id = %strategy.id,
                            error = %e,
                            "Risk evaluation failed, skipping strategy"
                        );
                    }
                }
            }

            match page.next {
                Some(next) => request = next,
                None => break,
            }
        }

        stats
    }

    /// Evaluate one strategy's breaker conditions
    pub async fn evaluate_strategy(&self, strategy_id: StrategyId) -> Result<Evaluation> {
        let strategy = self.strategies.get(strategy_id).await?;
        if !strategy.is_active {
            return Ok(Evaluation::Unchanged);
        }

        if strategy.is_paused {
            // Sweep any cash that leaked back to availability while paused
            // (e.g. reconciliation after a late fill)
            if strategy.available_cash > dec!(0.01) {
                self.ledger.enter_cooldown(strategy_id).await?;
            }
            if self.cooldown_elapsed(&strategy) {
                self.resume(strategy_id).await?;
                return Ok(Evaluation::Resumed);
            }
            return Ok(Evaluation::Unchanged);
        }

        if strategy.current_drawdown_pct >= strategy.circuit_breaker_loss_pct {
            let reason = PauseReason::DrawdownLimit(strategy.current_drawdown_pct);
            self.pause(strategy_id, reason.clone()).await?;
            return Ok(Evaluation::Paused(reason));
        }

        if let Some(max_losses) = strategy.max_consecutive_losses {
            let streak = self.consecutive_losses(strategy_id).await?;
            if streak >= max_losses {
                let reason = PauseReason::ConsecutiveLosses(streak);
                self.pause(strategy_id, reason.clone()).await?;
                return Ok(Evaluation::Paused(reason));
            }
        }

        if let Some(max_daily_loss) = strategy.max_daily_loss {
            let loss = self.daily_realized_loss(strategy_id).await?;
            if loss > max_daily_loss {
                let reason = PauseReason::DailyLossLimit(loss);
                self.pause(strategy_id, reason.clone()).await?;
                return Ok(Evaluation::Paused(reason));
            }
        }

        Ok(Evaluation::Unchanged)
    }

    /// Pause a strategy and move its free cash into cooldown
    ///
    /// Idempotent: pausing an already-paused strategy only re-records the
    /// reason. Flags are written before the money moves; a crash in
    /// between leaves a paused strategy whose cash the next risk cycle
    /// sweeps into cooldown.
    pub async fn pause(&self, strategy_id: StrategyId, reason: PauseReason) -> Result<Strategy> {
        let reason_for_log = reason.clone();
        self.strategies
            .mutate(
                strategy_id,
                Box::new(move |s| {
                    if !s.is_paused {
                        s.is_paused = true;
                        s.paused_at = Some(Utc::now());
                    }
                    s.pause_reason = Some(reason);
                    Ok(())
                }),
            )
            .await?;

        let strategy = self.ledger.enter_cooldown(strategy_id).await?;

        tracing::warn!(
            strategy_id = %strategy_id,
            reason = %reason_for_log,
            cooldown_capital = %strategy.cooldown_capital,
            "Strategy paused"
        );

        Ok(strategy)
    }

    /// Resume a strategy and restore its cooldown cash
    ///
    /// Always allowed for operators; the money moves before the flags
    /// clear, so a crash in between leaves a paused strategy that a
    /// second resume call finishes without double-moving funds.
    pub async fn resume(&self, strategy_id: StrategyId) -> Result<Strategy> {
        self.ledger.exit_cooldown(strategy_id).await?;

        let strategy = self
            .strategies
            .mutate(
                strategy_id,
                Box::new(|s| {
                    s.is_paused = false;
                    s.pause_reason = None;
                    s.paused_at = None;
                    Ok(())
                }),
            )
            .await?;

        tracing::info!(
            strategy_id = %strategy_id,
            available_cash = %strategy.available_cash,
            "Strategy resumed"
        );

        Ok(strategy)
    }

    fn cooldown_elapsed(&self, strategy: &Strategy) -> bool {
        if strategy.cooldown_hours <= 0 {
            return false;
        }
        match strategy.paused_at {
            Some(paused_at) => {
                Utc::now() - paused_at >= Duration::hours(strategy.cooldown_hours)
            }
            // No pause timestamp to measure from: wait for manual resume
            None => false,
        }
    }

    /// Length of the current trailing run of resolved losses
    async fn consecutive_losses(&self, strategy_id: StrategyId) -> Result<u32> {
        let mut resolved: Vec<(chrono::DateTime<Utc>, OrderOutcome)> = Vec::new();

        let filter = OrderFilter {
            strategy_id: Some(strategy_id),
            outcomes: Some(vec![OrderOutcome::Won, OrderOutcome::Lost]),
            ..Default::default()
        };
        let mut request = PageRequest::first(self.page_size);
        loop {
            let page = self.orders.list(filter.clone(), request).await?;
            for order in &page.items {
                if let Some(resolved_at) = order.resolved_at {
                    resolved.push((resolved_at, order.outcome));
                }
            }
            match page.next {
                Some(next) => request = next,
                None => break,
            }
        }

        resolved.sort_by_key(|(at, _)| *at);

        let mut streak = 0;
        for (_, outcome) in resolved.iter().rev() {
            if *outcome == OrderOutcome::Lost {
                streak += 1;
            } else {
                break;
            }
        }
        Ok(streak)
    }

    /// Realized loss over orders resolved today (UTC), as a positive number
    async fn daily_realized_loss(&self, strategy_id: StrategyId) -> Result<Decimal> {
        let today = Utc::now().date_naive();
        let mut pnl_today = dec!(0);

        let filter = OrderFilter {
            strategy_id: Some(strategy_id),
            outcomes: Some(vec![OrderOutcome::Won, OrderOutcome::Lost]),
            ..Default::default()
        };
        let mut request = PageRequest::first(self.page_size);
        loop {
            let page = self.orders.list(filter.clone(), request).await?;
            for order in &page.items {
                let resolved_today = order
                    .resolved_at
                    .map(|at| at.date_naive() == today)
                    .unwrap_or(false);
                if resolved_today {
                    pnl_today += order.pnl.unwrap_or(dec!(0));
                }
            }
            match page.next {
                Some(next) => request = next,
                None => break,
            }
        }

        Ok((-pnl_today).max(dec!(0)))
    }
}

/// What one evaluation did to a strategy
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Unchanged,
    Paused(PauseReason),
    Resumed,
}
