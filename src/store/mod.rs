//! Persistence seams
//!
//! The engine never talks to storage directly; it goes through these traits.
//! The one nonstandard primitive is `mutate`: an atomic read-modify-write
//! that re-reads the row under the store's own lock before applying the
//! closure, so concurrent job runs can never act on stale ledger fields.
//! Every listing is paginated; no caller may assume a result set fits in
//! one page.

mod memory;

pub use memory::MemoryStore;

use crate::error::Result;
use crate::order::{Order, OrderId, OrderOutcome, OrderStatus};
use crate::strategy::{Strategy, StrategyId};
use async_trait::async_trait;

/// Atomic update closure applied to a strategy row
pub type MutateStrategyFn = Box<dyn FnOnce(&mut Strategy) -> Result<()> + Send>;

/// Atomic update closure applied to an order row
pub type MutateOrderFn = Box<dyn FnOnce(&mut Order) -> Result<()> + Send>;

/// One page of a listing
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Request for the next page, if any rows remain
    pub next: Option<PageRequest>,
}

/// Cursor into a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
}

impl PageRequest {
    /// First page with the given size
    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }

    /// The page after this one
    pub fn next(&self) -> Self {
        Self {
            offset: self.offset + self.limit,
            limit: self.limit,
        }
    }
}

/// Filter for order listings
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    /// Restrict to one strategy
    pub strategy_id: Option<StrategyId>,
    /// Restrict to these statuses
    pub statuses: Option<Vec<OrderStatus>>,
    /// Restrict to these outcomes
    pub outcomes: Option<Vec<OrderOutcome>>,
    /// Only orders the synchronizer still polls
    pub open_only: bool,
}

impl OrderFilter {
    /// Orders the fill synchronizer must poll
    pub fn open() -> Self {
        Self {
            open_only: true,
            ..Default::default()
        }
    }

    /// All orders of one strategy
    pub fn for_strategy(strategy_id: StrategyId) -> Self {
        Self {
            strategy_id: Some(strategy_id),
            ..Default::default()
        }
    }

    /// Whether an order passes this filter
    pub fn matches(&self, order: &Order) -> bool {
        if let Some(strategy_id) = self.strategy_id {
            if order.strategy_id != strategy_id {
                return false;
            }
        }
        if let Some(ref statuses) = self.statuses {
            if !statuses.contains(&order.status) {
                return false;
            }
        }
        if let Some(ref outcomes) = self.outcomes {
            if !outcomes.contains(&order.outcome) {
                return false;
            }
        }
        if self.open_only && !order.is_open() {
            return false;
        }
        true
    }
}

/// Durable strategy rows
#[async_trait]
pub trait StrategyStore: Send + Sync {
    /// Insert a new strategy row
    async fn insert(&self, strategy: Strategy) -> Result<()>;

    /// Fetch one strategy
    async fn get(&self, id: StrategyId) -> Result<Strategy>;

    /// Atomically read-modify-write one strategy, returning the updated row
    async fn mutate(&self, id: StrategyId, f: MutateStrategyFn) -> Result<Strategy>;

    /// Page through active strategies
    async fn list_active(&self, page: PageRequest) -> Result<Page<Strategy>>;

    /// Find the strategy mirroring a source for an owner, if subscribed
    async fn find_subscription(&self, owner: &str, mirrored_source: &str)
        -> Result<Option<Strategy>>;
}

/// Durable order rows
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a new order row
    async fn insert(&self, order: Order) -> Result<()>;

    /// Fetch one order
    async fn get(&self, id: OrderId) -> Result<Order>;

    /// Atomically read-modify-write one order, returning the updated row
    async fn mutate(&self, id: OrderId, f: MutateOrderFn) -> Result<Order>;

    /// Page through orders matching a filter, in insertion order
    async fn list(&self, filter: OrderFilter, page: PageRequest) -> Result<Page<Order>>;

    /// Look up the order created for a signal, if any
    async fn find_by_signal(
        &self,
        strategy_id: StrategyId,
        source_trade_id: &str,
    ) -> Result<Option<Order>>;

    /// Look up the order with the given exchange identifier
    async fn find_by_exchange_id(&self, exchange_order_id: &str) -> Result<Option<Order>>;
}
