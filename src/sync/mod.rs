//! Fill synchronizer
//!
//! Reconciles local order rows against exchange truth. `sync_order` is the
//! single idempotent entry point; the interval poller and the push-event
//! fast path are both thin callers of it, so the two triggers can never
//! diverge. Per order, the most recently fetched remote state wins.

mod push;

pub use push::OrderEventListener;

use crate::error::{EngineError, Result};
use crate::exchange::{ExchangeClient, ExchangeError, FillPriceResolver, RemoteOrderState};
use crate::ledger::CapitalLedger;
use crate::order::{OrderId, OrderStatus};
use crate::store::{OrderFilter, OrderStore, PageRequest};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Result of syncing one order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Order already terminal; nothing to do
    AlreadyClosed,
    /// Remote state matched what we knew
    Unchanged,
    /// Order row was updated to this status
    Updated(OrderStatus),
}

/// Counters for one polling cycle
#[derive(Debug, Default, Clone, Copy)]
pub struct SyncStats {
    pub scanned: usize,
    pub updated: usize,
    pub failed: usize,
    /// True when the cycle hit its deadline and left work behind
    pub deadline_hit: bool,
}

/// Ledger side effects decided inside the order mutation
#[derive(Default)]
struct TransitionEffects {
    record_spend: Option<Decimal>,
    unlock: Option<Decimal>,
    applied_status: Option<OrderStatus>,
    skipped: bool,
}

/// Polls open orders and applies fill transitions
#[derive(Clone)]
pub struct FillSynchronizer {
    orders: Arc<dyn OrderStore>,
    exchange: Arc<dyn ExchangeClient>,
    fills: Arc<dyn FillPriceResolver>,
    ledger: CapitalLedger,
    page_size: usize,
}

impl FillSynchronizer {
    /// Create a synchronizer over the given collaborators
    pub fn new(
        orders: Arc<dyn OrderStore>,
        exchange: Arc<dyn ExchangeClient>,
        fills: Arc<dyn FillPriceResolver>,
        ledger: CapitalLedger,
        page_size: usize,
    ) -> Self {
        Self {
            orders,
            exchange,
            fills,
            ledger,
            page_size,
        }
    }

    /// Poll every open order once, stopping at the deadline
    ///
    /// Each order is an independent unit of work: a failure is logged and
    /// skipped, never aborting the rest of the batch.
    pub async fn sync_open_orders(&self, deadline: Instant) -> SyncStats {
        let mut stats = SyncStats::default();

        // Snapshot the open set page by page before mutating any row, so
        // pagination is not disturbed by orders leaving the open set
        let mut open_ids: Vec<OrderId> = Vec::new();
        let mut request = PageRequest::first(self.page_size);
        loop {
            let page = match self.orders.list(OrderFilter::open(), request).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to list open orders");
                    return stats;
                }
            };
            open_ids.extend(page.items.iter().map(|o| o.id));
            match page.next {
                Some(next) => request = next,
                None => break,
            }
        }

        for order_id in open_ids {
            if Instant::now() >= deadline {
                tracing::warn!(
                    scanned = stats.scanned,
                    "Sync cycle hit its deadline, leaving work for the next run"
                );
                stats.deadline_hit = true;
                break;
            }

            stats.scanned += 1;
            match self.sync_order(order_id).await {
                Ok(SyncOutcome::Updated(status)) => {
                    stats.updated += 1;
                    tracing::debug!(order_id = %order_id, status = ?status, "Order updated");
                }
                Ok(_) => {}
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(order_id = %order_id, error = %e, "Order sync failed, skipping");
                }
            }
        }

        stats
    }

    /// Sync one order against exchange truth
    ///
    /// Idempotent: replaying the same remote state is a no-op, and the
    /// daily-spend record is guarded by the previously stored status.
    pub async fn sync_order(&self, order_id: OrderId) -> Result<SyncOutcome> {
        let order = self.orders.get(order_id).await?;
        if !order.is_open() {
            return Ok(SyncOutcome::AlreadyClosed);
        }

        let Some(exchange_order_id) = order.exchange_order_id.clone() else {
            tracing::warn!(order_id = %order_id, "Open order has no exchange id, skipping");
            return Ok(SyncOutcome::Unchanged);
        };

        let remote = self
            .exchange
            .get_order(&exchange_order_id)
            .await
            .map_err(|e| match e {
                ExchangeError::Rejected(msg) => EngineError::ExchangeRejected(msg),
                ExchangeError::Transient(msg) => EngineError::ExchangeTransient(msg),
            })?;

        // A terminal remote never takes the fast path: an open Partial
        // whose remote died without further fills still needs closing
        let new_status = next_status(order.status, &remote);
        if new_status == order.status
            && remote.size_matched == order.shares_bought
            && !remote.is_terminal()
        {
            return Ok(SyncOutcome::Unchanged);
        }

        // Resolve the execution price once per observation; trade-level
        // when available, limit price otherwise
        let executed_price = if remote.size_matched > dec!(0) {
            Some(
                self.fills
                    .resolve(&exchange_order_id, order.limit_price)
                    .await,
            )
        } else {
            None
        };

        let effects = Arc::new(Mutex::new(TransitionEffects::default()));
        let closure_effects = effects.clone();
        let remote_terminal = remote.is_terminal();
        let remote_clone = remote.clone();

        self.orders
            .mutate(
                order_id,
                Box::new(move |order| {
                    // Re-check under the store lock: a concurrent run may
                    // have closed this order since we read it
                    if !order.is_open() {
                        closure_effects.lock().unwrap().skipped = true;
                        return Ok(());
                    }

                    let prev_status = order.status;
                    let now = Utc::now();
                    let new_status = next_status(prev_status, &remote_clone);

                    order.shares_bought = remote_clone.size_matched;
                    order.shares_remaining = remote_clone.size_matched;
                    order.fill_rate = if remote_clone.original_size > dec!(0) {
                        remote_clone.size_matched / remote_clone.original_size
                    } else {
                        dec!(0)
                    };
                    if let Some(price) = executed_price {
                        order.executed_price = Some(price);
                        order.executed_size = (remote_clone.size_matched * price).round_dp(6);
                    }
                    order.status = new_status;

                    if remote_clone.size_matched > dec!(0) && order.first_fill_at.is_none() {
                        order.first_fill_at = Some(now);
                    }

                    let entered_filled_state = prev_status == OrderStatus::Pending
                        && matches!(new_status, OrderStatus::Partial | OrderStatus::Filled);

                    let is_terminal = new_status.is_always_terminal()
                        || (new_status == OrderStatus::Partial && remote_terminal);

                    match new_status {
                        OrderStatus::Filled => {
                            order.fully_filled_at = Some(now);
                            order.closed_at = Some(now);
                        }
                        OrderStatus::Cancelled => {
                            order.outcome = crate::order::OrderOutcome::Cancelled;
                            order.closed_at = Some(now);
                        }
                        OrderStatus::Partial if remote_terminal => {
                            order.closed_at = Some(now);
                        }
                        _ => {}
                    }

                    let mut effects = closure_effects.lock().unwrap();
                    effects.applied_status = Some(new_status);
                    // At-most-once: only the transition out of Pending
                    // records spend, so replays cannot double-count
                    if entered_filled_state && order.executed_size > dec!(0) {
                        effects.record_spend = Some(order.executed_size);
                    }
                    if is_terminal {
                        effects.unlock = Some(order.unfilled_value());
                    }
                    Ok(())
                }),
            )
            .await?;

        let effects = {
            let mut guard = effects.lock().unwrap();
            std::mem::take(&mut *guard)
        };
        if effects.skipped {
            return Ok(SyncOutcome::AlreadyClosed);
        }

        // Ledger writes happen after the order row is durable; a crash in
        // between is healed by the next reconciliation pass
        if let Some(spend) = effects.record_spend {
            self.ledger.record_daily_spend(order.strategy_id, spend).await?;
        }
        if let Some(unlock) = effects.unlock {
            if unlock > dec!(0) {
                self.ledger.unlock(order.strategy_id, unlock).await?;
            }
        }

        let applied = effects.applied_status.unwrap_or(order.status);
        crate::telemetry::record_fill(status_label(applied));
        tracing::info!(
            order_id = %order_id,
            strategy_id = %order.strategy_id,
            status = ?applied,
            size_matched = %remote.size_matched,
            "Order synced"
        );

        Ok(SyncOutcome::Updated(applied))
    }
}

/// Transition table from local status plus remote truth
pub(crate) fn next_status(current: OrderStatus, remote: &RemoteOrderState) -> OrderStatus {
    if remote.is_fully_matched() {
        return OrderStatus::Filled;
    }
    if remote.is_terminal() {
        return if remote.size_matched > dec!(0) {
            OrderStatus::Partial
        } else {
            OrderStatus::Cancelled
        };
    }
    if remote.size_matched > dec!(0) {
        return OrderStatus::Partial;
    }
    current
}

fn status_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "pending",
        OrderStatus::Partial => "partial",
        OrderStatus::Filled => "filled",
        OrderStatus::Cancelled => "cancelled",
        OrderStatus::Rejected => "rejected",
    }
}
