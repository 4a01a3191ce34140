//! End-to-end lifecycle tests
//!
//! Drives the engine over the in-memory store and a scripted exchange:
//! signal intake, placement, fill synchronization, resolution,
//! reconciliation, and the circuit breaker.

use async_trait::async_trait;
use chrono::Utc;
use poly_mirror::config::JobsConfig;
use poly_mirror::engine::{Engine, SignalOutcome};
use poly_mirror::exchange::{
    ExchangeClient, ExchangeError, FillPriceResolver, PlaceOrderArgs, RemoteOrderState,
    RemoteOrderStatus,
};
use poly_mirror::gate::RejectionReason;
use poly_mirror::order::{Order, OrderOutcome, OrderStatus};
use poly_mirror::signal::{Side, Signal};
use poly_mirror::store::{MemoryStore, OrderFilter, OrderStore, PageRequest, StrategyStore};
use poly_mirror::strategy::{SizingPolicy, Strategy, StrategyId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Exchange whose remote order states the test controls directly
struct MockExchange {
    states: Mutex<HashMap<String, RemoteOrderState>>,
    counter: Mutex<usize>,
}

impl MockExchange {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            states: Mutex::new(HashMap::new()),
            counter: Mutex::new(0),
        })
    }

    /// Mark an order fully matched at its placed size
    fn fill(&self, exchange_order_id: &str) {
        let mut states = self.states.lock().unwrap();
        let state = states.get_mut(exchange_order_id).expect("unknown order");
        state.size_matched = state.original_size;
        state.status = RemoteOrderStatus::Matched;
    }

    /// Cancel an order with the given matched size
    fn cancel_with_fill(&self, exchange_order_id: &str, size_matched: Decimal) {
        let mut states = self.states.lock().unwrap();
        let state = states.get_mut(exchange_order_id).expect("unknown order");
        state.size_matched = size_matched;
        state.status = RemoteOrderStatus::Cancelled;
    }
}

#[async_trait]
impl ExchangeClient for MockExchange {
    async fn place(&self, args: &PlaceOrderArgs) -> Result<String, ExchangeError> {
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        let id = format!("ex-{}", counter);

        self.states.lock().unwrap().insert(
            id.clone(),
            RemoteOrderState {
                status: RemoteOrderStatus::Live,
                size_matched: dec!(0),
                original_size: args.size,
                price: args.price,
            },
        );
        Ok(id)
    }

    async fn cancel(&self, id: &str) -> Result<(), ExchangeError> {
        let mut states = self.states.lock().unwrap();
        let state = states
            .get_mut(id)
            .ok_or_else(|| ExchangeError::Rejected("unknown order".to_string()))?;
        state.status = RemoteOrderStatus::Cancelled;
        Ok(())
    }

    async fn get_order(&self, id: &str) -> Result<RemoteOrderState, ExchangeError> {
        self.states
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| ExchangeError::Transient("unknown order".to_string()))
    }
}

/// Resolver without trade-level data: always falls back to the limit price
struct LimitResolver;

#[async_trait]
impl FillPriceResolver for LimitResolver {
    async fn resolve(&self, _id: &str, limit_price: Decimal) -> Decimal {
        limit_price
    }
}

struct Harness {
    engine: Engine,
    exchange: Arc<MockExchange>,
    store: Arc<MemoryStore>,
    strategy_id: StrategyId,
}

/// Strategy with $1000, fixed $100 sizing, and no slippage allowance so
/// fills land exactly at the signal price
async fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let mut strategy = Strategy::new(
        "user-1",
        "0xwallet",
        "sim-whale-42",
        dec!(1000),
        SizingPolicy::Fixed { amount: dec!(100) },
    );
    strategy.slippage_tolerance = dec!(0);
    strategy.circuit_breaker_loss_pct = dec!(0.20);
    let strategy_id = strategy.id;
    StrategyStore::insert(store.as_ref(), strategy).await.unwrap();

    let exchange = MockExchange::new();
    let engine = Engine::new(
        store.clone(),
        store.clone(),
        exchange.clone(),
        Arc::new(LimitResolver),
        JobsConfig::default(),
    );

    Harness {
        engine,
        exchange,
        store,
        strategy_id,
    }
}

fn signal(trade_id: &str) -> Signal {
    Signal {
        source_trade_id: trade_id.to_string(),
        market_id: "0xcondition".to_string(),
        token_id: "token-yes".to_string(),
        side: Side::Buy,
        suggested_price: dec!(0.50),
        suggested_size_usd: dec!(100),
        timestamp: Utc::now(),
    }
}

async fn place(h: &Harness, trade_id: &str) -> Order {
    match h
        .engine
        .process_signal(h.strategy_id, &signal(trade_id))
        .await
        .unwrap()
    {
        SignalOutcome::Placed(order) => order,
        other => panic!("expected placement, got {:?}", other),
    }
}

async fn strategy_of(h: &Harness) -> Strategy {
    StrategyStore::get(h.store.as_ref(), h.strategy_id)
        .await
        .unwrap()
}

async fn order_of(h: &Harness, order: &Order) -> Order {
    OrderStore::get(h.store.as_ref(), order.id).await.unwrap()
}

/// Mark an order resolved, the way the external settlement process does
async fn resolve(h: &Harness, order: &Order, outcome: OrderOutcome, pnl: Decimal) {
    OrderStore::mutate(
        h.store.as_ref(),
        order.id,
        Box::new(move |o| {
            o.outcome = outcome;
            o.pnl = Some(pnl);
            o.resolved_at = Some(Utc::now());
            Ok(())
        }),
    )
    .await
    .unwrap();
}

async fn assert_invariant(h: &Harness) {
    let strategy = strategy_of(h).await;

    let mut realized = dec!(0);
    let mut request = PageRequest::first(10);
    loop {
        let page = h
            .store
            .list(OrderFilter::for_strategy(h.strategy_id), request)
            .await
            .unwrap();
        for order in &page.items {
            if order.outcome.is_resolved() {
                realized += order.pnl.unwrap_or(dec!(0));
            }
        }
        match page.next {
            Some(next) => request = next,
            None => break,
        }
    }

    let lhs = strategy.available_cash + strategy.locked_capital + strategy.cooldown_capital;
    let rhs = strategy.initial_capital + realized;
    assert!(
        (lhs - rhs).abs() <= dec!(0.01),
        "ledger invariant violated: {} != {}",
        lhs,
        rhs
    );
}

#[tokio::test]
async fn scenario_a_signal_to_full_fill() {
    let h = harness().await;

    // $100 signal passes the gate
    let order = place(&h, "t1").await;
    let strategy = strategy_of(&h).await;
    assert_eq!(strategy.available_cash, dec!(900));
    assert_eq!(strategy.locked_capital, dec!(100));
    assert_eq!(order.status, OrderStatus::Pending);

    // Exchange fully fills at the signal price
    h.exchange.fill(order.exchange_order_id.as_deref().unwrap());
    let stats = h.engine.run_sync_cycle().await;
    assert_eq!(stats.updated, 1);

    let order = order_of(&h, &order).await;
    assert_eq!(order.status, OrderStatus::Filled);
    assert_eq!(order.executed_price, Some(dec!(0.50)));
    assert_eq!(order.executed_size, dec!(100));

    let strategy = strategy_of(&h).await;
    assert_eq!(strategy.daily_spent, dec!(100));

    h.engine.run_reconcile_cycle().await;
    assert_invariant(&h).await;
}

#[tokio::test]
async fn scenario_b_cancelled_with_zero_fill() {
    let h = harness().await;

    let order = place(&h, "t1").await;
    h.exchange
        .cancel_with_fill(order.exchange_order_id.as_deref().unwrap(), dec!(0));
    h.engine.run_sync_cycle().await;

    let order = order_of(&h, &order).await;
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(order.outcome, OrderOutcome::Cancelled);

    let strategy = strategy_of(&h).await;
    assert_eq!(strategy.available_cash, dec!(1000));
    assert_eq!(strategy.locked_capital, dec!(0));
    assert_eq!(strategy.daily_spent, dec!(0));

    h.engine.run_reconcile_cycle().await;
    assert_invariant(&h).await;
}

#[tokio::test]
async fn scenario_c_loss_resolution_recomputes_ledger() {
    let h = harness().await;

    let order = place(&h, "t1").await;
    h.exchange.fill(order.exchange_order_id.as_deref().unwrap());
    h.engine.run_sync_cycle().await;

    // Market settles against the position
    resolve(&h, &order, OrderOutcome::Lost, dec!(-100)).await;
    h.engine.run_reconcile_cycle().await;

    let strategy = strategy_of(&h).await;
    assert_eq!(strategy.available_cash, dec!(900));
    assert_eq!(strategy.locked_capital, dec!(0));
    assert_eq!(strategy.current_drawdown_pct, dec!(0.1));
    assert_invariant(&h).await;
}

#[tokio::test]
async fn scenario_d_circuit_breaker_pauses_and_gates() {
    let h = harness().await;

    // Two total losses push drawdown to 20%, reaching the breaker
    for trade_id in ["t1", "t2"] {
        let order = place(&h, trade_id).await;
        h.exchange.fill(order.exchange_order_id.as_deref().unwrap());
        h.engine.run_sync_cycle().await;
        resolve(&h, &order, OrderOutcome::Lost, dec!(-100)).await;
    }
    h.engine.run_reconcile_cycle().await;

    let strategy = strategy_of(&h).await;
    assert_eq!(strategy.current_drawdown_pct, dec!(0.2));

    let risk_stats = h.engine.run_risk_cycle().await;
    assert_eq!(risk_stats.paused, 1);

    let strategy = strategy_of(&h).await;
    assert!(strategy.is_paused);
    assert_eq!(strategy.available_cash, dec!(0));
    assert_eq!(strategy.cooldown_capital, dec!(800));

    // The next signal is rejected with a user-visible reason
    let outcome = h
        .engine
        .process_signal(h.strategy_id, &signal("t3"))
        .await
        .unwrap();
    match outcome {
        SignalOutcome::GateRejected(reason) => {
            assert_eq!(reason.as_label(), "strategy_paused");
        }
        other => panic!("expected gate rejection, got {:?}", other),
    }

    assert_invariant(&h).await;

    // Operator resume restores availability
    h.engine.resume(h.strategy_id).await.unwrap();
    let strategy = strategy_of(&h).await;
    assert!(!strategy.is_paused);
    assert_eq!(strategy.available_cash, dec!(800));
    assert_invariant(&h).await;
}

#[tokio::test]
async fn scenario_e_reconciliation_is_idempotent() {
    let h = harness().await;

    let order = place(&h, "t1").await;
    h.exchange.fill(order.exchange_order_id.as_deref().unwrap());
    h.engine.run_sync_cycle().await;
    resolve(&h, &order, OrderOutcome::Won, dec!(80)).await;

    h.engine.run_reconcile_cycle().await;
    let first = serde_json::to_string(&strategy_of(&h).await).unwrap();

    let stats = h.engine.run_reconcile_cycle().await;
    let second = serde_json::to_string(&strategy_of(&h).await).unwrap();

    assert_eq!(stats.corrected, 0);
    assert_eq!(first, second);
}

#[tokio::test]
async fn partial_fill_then_cancel_releases_remainder() {
    let h = harness().await;

    let order = place(&h, "t1").await;
    // 80 of 200 shares matched, then the rest is cancelled
    h.exchange
        .cancel_with_fill(order.exchange_order_id.as_deref().unwrap(), dec!(80));
    h.engine.run_sync_cycle().await;

    let order = order_of(&h, &order).await;
    assert_eq!(order.status, OrderStatus::Partial);
    assert_eq!(order.executed_size, dec!(40));
    assert!(!order.is_open());

    let strategy = strategy_of(&h).await;
    // $40 filled of the $100 lock; $60 released
    assert_eq!(strategy.available_cash, dec!(960));
    assert_eq!(strategy.locked_capital, dec!(40));
    assert_eq!(strategy.daily_spent, dec!(40));

    h.engine.run_reconcile_cycle().await;
    assert_invariant(&h).await;
}

#[tokio::test]
async fn daily_spend_recorded_exactly_once() {
    let h = harness().await;

    let order = place(&h, "t1").await;
    h.exchange.fill(order.exchange_order_id.as_deref().unwrap());

    // The same poll outcome applied repeatedly
    h.engine.run_sync_cycle().await;
    h.engine.run_sync_cycle().await;
    h.engine.run_sync_cycle().await;

    let strategy = strategy_of(&h).await;
    assert_eq!(strategy.daily_spent, dec!(100));
}

#[tokio::test]
async fn redelivered_signal_never_double_spends() {
    let h = harness().await;

    place(&h, "t1").await;
    for _ in 0..3 {
        let outcome = h
            .engine
            .process_signal(h.strategy_id, &signal("t1"))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            SignalOutcome::GateRejected(RejectionReason::DuplicateSignal)
        ));
    }

    let strategy = strategy_of(&h).await;
    assert_eq!(strategy.locked_capital, dec!(100));
    assert_eq!(strategy.available_cash, dec!(900));
}

#[tokio::test]
async fn operator_cancel_releases_reserve() {
    let h = harness().await;

    let order = place(&h, "t1").await;
    let outcome = h.engine.cancel_order(order.id).await.unwrap();
    assert_eq!(
        outcome,
        poly_mirror::sync::SyncOutcome::Updated(OrderStatus::Cancelled)
    );

    let order = order_of(&h, &order).await;
    assert_eq!(order.status, OrderStatus::Cancelled);

    let strategy = strategy_of(&h).await;
    assert_eq!(strategy.available_cash, dec!(1000));
    assert_eq!(strategy.locked_capital, dec!(0));

    h.engine.run_reconcile_cycle().await;
    assert_invariant(&h).await;
}

#[tokio::test]
async fn overlapping_cycles_self_heal_through_reconciliation() {
    let h = harness().await;

    let order = place(&h, "t1").await;
    h.exchange.fill(order.exchange_order_id.as_deref().unwrap());
    h.engine.run_sync_cycle().await;

    // Simulate ledger damage from an interleaved job run
    StrategyStore::mutate(
        h.store.as_ref(),
        h.strategy_id,
        Box::new(|s| {
            s.available_cash = dec!(500);
            s.locked_capital = dec!(250);
            Ok(())
        }),
    )
    .await
    .unwrap();

    let stats = h.engine.run_reconcile_cycle().await;
    assert_eq!(stats.corrected, 1);

    let strategy = strategy_of(&h).await;
    assert_eq!(strategy.available_cash, dec!(900));
    assert_eq!(strategy.locked_capital, dec!(100));
    assert_invariant(&h).await;
}
