//! In-memory store
//!
//! Reference implementation of the persistence seams, backed by tokio
//! RwLocks. Used by the test suite and by single-process paper runs; a
//! database-backed implementation plugs in behind the same traits.

use super::{
    MutateOrderFn, MutateStrategyFn, OrderFilter, OrderStore, Page, PageRequest, StrategyStore,
};
use crate::error::{EngineError, Result};
use crate::order::{Order, OrderId};
use crate::strategy::{Strategy, StrategyId};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared in-memory strategy and order rows
#[derive(Clone, Default)]
pub struct MemoryStore {
    strategies: Arc<RwLock<Vec<Strategy>>>,
    orders: Arc<RwLock<Vec<Order>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

fn paginate<T: Clone>(matching: Vec<T>, page: PageRequest) -> Page<T> {
    let total = matching.len();
    let items: Vec<T> = matching
        .into_iter()
        .skip(page.offset)
        .take(page.limit)
        .collect();
    let next = if page.offset + items.len() < total {
        Some(page.next())
    } else {
        None
    };
    Page { items, next }
}

#[async_trait]
impl StrategyStore for MemoryStore {
    async fn insert(&self, strategy: Strategy) -> Result<()> {
        let mut strategies = self.strategies.write().await;
        strategies.push(strategy);
        Ok(())
    }

    async fn get(&self, id: StrategyId) -> Result<Strategy> {
        let strategies = self.strategies.read().await;
        strategies
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(EngineError::StrategyNotFound(id))
    }

    async fn mutate(&self, id: StrategyId, f: MutateStrategyFn) -> Result<Strategy> {
        let mut strategies = self.strategies.write().await;
        let strategy = strategies
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(EngineError::StrategyNotFound(id))?;
        f(strategy)?;
        Ok(strategy.clone())
    }

    async fn list_active(&self, page: PageRequest) -> Result<Page<Strategy>> {
        let strategies = self.strategies.read().await;
        let matching: Vec<Strategy> = strategies.iter().filter(|s| s.is_active).cloned().collect();
        Ok(paginate(matching, page))
    }

    async fn find_subscription(
        &self,
        owner: &str,
        mirrored_source: &str,
    ) -> Result<Option<Strategy>> {
        let strategies = self.strategies.read().await;
        Ok(strategies
            .iter()
            .find(|s| s.owner == owner && s.mirrored_source == mirrored_source)
            .cloned())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert(&self, order: Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        orders.push(order);
        Ok(())
    }

    async fn get(&self, id: OrderId) -> Result<Order> {
        let orders = self.orders.read().await;
        orders
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .ok_or(EngineError::OrderNotFound(id))
    }

    async fn mutate(&self, id: OrderId, f: MutateOrderFn) -> Result<Order> {
        let mut orders = self.orders.write().await;
        let order = orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(EngineError::OrderNotFound(id))?;
        f(order)?;
        Ok(order.clone())
    }

    async fn list(&self, filter: OrderFilter, page: PageRequest) -> Result<Page<Order>> {
        let orders = self.orders.read().await;
        let matching: Vec<Order> = orders.iter().filter(|o| filter.matches(o)).cloned().collect();
        Ok(paginate(matching, page))
    }

    async fn find_by_signal(
        &self,
        strategy_id: StrategyId,
        source_trade_id: &str,
    ) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders
            .iter()
            .find(|o| o.strategy_id == strategy_id && o.source_trade_id == source_trade_id)
            .cloned())
    }

    async fn find_by_exchange_id(&self, exchange_order_id: &str) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders
            .iter()
            .find(|o| o.exchange_order_id.as_deref() == Some(exchange_order_id))
            .cloned())
    }
}
