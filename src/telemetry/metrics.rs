//! Prometheus metrics

use crate::strategy::Strategy;
use metrics::{counter, gauge, histogram};
use rust_decimal::prelude::ToPrimitive;
use std::time::Duration;

/// Periodic jobs instrumented with duration histograms
#[derive(Debug, Clone, Copy)]
pub enum Job {
    /// Fill synchronizer cycle
    FillSync,
    /// Capital reconciliation cycle
    Reconcile,
    /// Risk manager cycle
    Risk,
    /// Signal polling cycle
    Signals,
}

impl Job {
    fn as_str(&self) -> &'static str {
        match self {
            Job::FillSync => "fill_sync",
            Job::Reconcile => "reconcile",
            Job::Risk => "risk",
            Job::Signals => "signals",
        }
    }
}

/// Record how long one job invocation took
pub fn record_job_duration(job: Job, duration: Duration) {
    histogram!("polymirror_job_duration_seconds", "job" => job.as_str())
        .record(duration.as_secs_f64());
}

/// Export the ledger fields of one strategy as gauges
pub fn set_ledger_gauges(strategy: &Strategy) {
    let id = strategy.id.to_string();
    gauge!("polymirror_available_cash_usd", "strategy" => id.clone())
        .set(strategy.available_cash.to_f64().unwrap_or(0.0));
    gauge!("polymirror_locked_capital_usd", "strategy" => id.clone())
        .set(strategy.locked_capital.to_f64().unwrap_or(0.0));
    gauge!("polymirror_cooldown_capital_usd", "strategy" => id.clone())
        .set(strategy.cooldown_capital.to_f64().unwrap_or(0.0));
    gauge!("polymirror_drawdown_pct", "strategy" => id)
        .set(strategy.current_drawdown_pct.to_f64().unwrap_or(0.0));
}

/// Count a risk-gate rejection by reason
pub fn record_gate_rejection(reason: &'static str) {
    counter!("polymirror_gate_rejections_total", "reason" => reason).increment(1);
}

/// Count a successfully placed order
pub fn record_order_placed() {
    counter!("polymirror_orders_placed_total").increment(1);
}

/// Count an observed fill transition
pub fn record_fill(status: &'static str) {
    counter!("polymirror_fills_total", "status" => status).increment(1);
}

/// Count a ledger field corrected by reconciliation
pub fn record_reconcile_drift(field: &'static str) {
    counter!("polymirror_reconcile_drift_total", "field" => field).increment(1);
}
