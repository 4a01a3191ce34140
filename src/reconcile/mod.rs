//! Capital reconciliation
//!
//! Recomputes every ledger field from the order log and overwrites stored
//! values that drifted. The order log is the single source of truth; the
//! ledger is just a cache of derivable values. Running this every cycle is
//! what makes the ledger safe under concurrent, overlapping job runs: any
//! inconsistency from interleaving self-heals on the next pass.

use crate::error::Result;
use crate::order::{Order, OrderOutcome, OrderStatus};
use crate::store::{OrderFilter, OrderStore, PageRequest, StrategyStore};
use crate::strategy::StrategyId;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Ledger values recomputed from the order log
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    pub strategy_id: StrategyId,
    pub realized_pnl: Decimal,
    pub correct_equity: Decimal,
    pub correct_locked: Decimal,
    pub correct_available: Decimal,
    pub correct_drawdown: Decimal,
    /// True when any stored field had to be overwritten
    pub corrected: bool,
}

/// Counters for one reconciliation cycle
#[derive(Debug, Default, Clone, Copy)]
pub struct ReconcileStats {
    pub strategies: usize,
    pub corrected: usize,
    pub failed: usize,
    pub deadline_hit: bool,
}

/// Recomputes ledger state from the order log
#[derive(Clone)]
pub struct Reconciler {
    strategies: Arc<dyn StrategyStore>,
    orders: Arc<dyn OrderStore>,
    page_size: usize,
    /// Drift below this is left alone (decimal dust, rounding)
    epsilon: Decimal,
}

impl Reconciler {
    /// Create a reconciler over the given stores
    pub fn new(
        strategies: Arc<dyn StrategyStore>,
        orders: Arc<dyn OrderStore>,
        page_size: usize,
    ) -> Self {
        Self {
            strategies,
            orders,
            page_size,
            epsilon: dec!(0.01),
        }
    }

    /// Reconcile every active strategy once, stopping at the deadline
    pub async fn reconcile_all(&self, deadline: Instant) -> ReconcileStats {
        let mut stats = ReconcileStats::default();

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
                    tracing::warn!(
                        reconciled = stats.strategies,
                        "Reconcile cycle hit its deadline, leaving work for the next run"
                    );
                    stats.deadline_hit = true;
                    return stats;
                }

                stats.strategies += 1;
                match self.reconcile_strategy(strategy.id).await {
                    Ok(report) => {
                        if report.corrected {
                            stats.corrected += 1;
                        }
                        if let Ok(updated) = self.strategies.get(strategy.id).await {
                            crate::telemetry::set_ledger_gauges(&updated);
                        }
                    }
                    Err(e) => {
                        stats.failed += 1;
                        tracing::warn!(
                            strategy_id = %strategy.id,
                            error = %e,
                            "Reconciliation failed, skipping strategy"
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

    /// Recompute one strategy's ledger from its order log
    pub async fn reconcile_strategy(&self, strategy_id: StrategyId) -> Result<ReconcileReport> {
        let strategy = self.strategies.get(strategy_id).await?;

        let mut realized_pnl = dec!(0);
        let mut correct_locked = dec!(0);

        let mut request = PageRequest::first(self.page_size);
        loop {
            let page = self
                .orders
                .list(OrderFilter::for_strategy(strategy_id), request)
                .await?;

            for order in &page.items {
                realized_pnl += realized_contribution(order);
                correct_locked += locked_contribution(order);
            }

            match page.next {
                Some(next) => request = next,
                None => break,
            }
        }

        let correct_equity = strategy.initial_capital + realized_pnl;
        let correct_available = correct_equity - correct_locked - strategy.cooldown_capital;
        let correct_drawdown = if strategy.initial_capital > dec!(0) {
            ((strategy.initial_capital - correct_equity) / strategy.initial_capital).max(dec!(0))
        } else {
            dec!(0)
        };

        let epsilon = self.epsilon;
        let corrected_cell = Arc::new(Mutex::new(false));
        let closure_corrected = corrected_cell.clone();

        self.strategies
            .mutate(
                strategy_id,
                Box::new(move |s| {
                    let mut corrected = false;

                    if (s.available_cash - correct_available).abs() > epsilon {
                        tracing::warn!(
                            strategy_id = %s.id,
                            stored = %s.available_cash,
                            correct = %correct_available,
                            "Correcting drifted available_cash"
                        );
                        crate::telemetry::record_reconcile_drift("available_cash");
                        s.available_cash = correct_available;
                        corrected = true;
                    }
                    if (s.locked_capital - correct_locked).abs() > epsilon {
                        tracing::warn!(
                            strategy_id = %s.id,
                            stored = %s.locked_capital,
                            correct = %correct_locked,
                            "Correcting drifted locked_capital"
                        );
                        crate::telemetry::record_reconcile_drift("locked_capital");
                        s.locked_capital = correct_locked;
                        corrected = true;
                    }
                    if (s.current_drawdown_pct - correct_drawdown).abs() > dec!(0.0001) {
                        s.current_drawdown_pct = correct_drawdown;
                        corrected = true;
                    }
                    if correct_equity > s.peak_equity {
                        s.peak_equity = correct_equity;
                    }

                    *closure_corrected.lock().unwrap() = corrected;
                    Ok(())
                }),
            )
            .await?;

        let corrected = *corrected_cell.lock().unwrap();

        Ok(ReconcileReport {
            strategy_id,
            realized_pnl,
            correct_equity,
            correct_locked,
            correct_available,
            correct_drawdown,
            corrected,
        })
    }
}

/// P&L contribution of one order: only settled outcomes count
fn realized_contribution(order: &Order) -> Decimal {
    if order.outcome.is_resolved() {
        order.pnl.unwrap_or(dec!(0))
    } else {
        dec!(0)
    }
}

/// Locked-capital contribution of one order
///
/// Orders still working the book reserve their full requested size (the
/// synchronizer only releases the unfilled remainder when the order goes
/// terminal); closed but unsettled positions hold their executed value.
fn locked_contribution(order: &Order) -> Decimal {
    match order.status {
        OrderStatus::Pending => order.signal_size_usd,
        OrderStatus::Partial if order.is_open() => order.signal_size_usd,
        OrderStatus::Filled | OrderStatus::Partial if order.outcome == OrderOutcome::Open => {
            order.executed_size
        }
        _ => dec!(0),
    }
}
