//! Engine wiring and job loops
//!
//! Owns one instance of every core component and drives the periodic jobs:
//! signal polling, fill synchronization, capital reconciliation, and risk
//! evaluation. Jobs are independently scheduled; each invocation carries a
//! wall-clock budget and leaves unfinished work for the next run. One
//! strategy's failure never aborts a batch for the others.

use crate::config::{Config, JobsConfig};
use crate::error::{EngineError, Result};
use crate::exchange::{ExchangeClient, ExchangeError, FillPriceResolver};
use crate::gate::{GateDecision, RejectionReason, RiskGate};
use crate::ledger::CapitalLedger;
use crate::order::{Order, OrderId};
use crate::placement::{OrderPlacer, PlacementOutcome};
use crate::reconcile::{ReconcileStats, Reconciler};
use crate::risk::{RiskManager, RiskStats};
use crate::signal::{Signal, SignalSource};
use crate::store::{OrderStore, PageRequest, StrategyStore};
use crate::strategy::{PauseReason, Strategy, StrategyId};
use crate::sync::{FillSynchronizer, SyncOutcome, SyncStats};
use crate::telemetry::{record_job_duration, Job};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// What happened to one processed signal
#[derive(Debug, Clone)]
pub enum SignalOutcome {
    /// Order is live on the exchange
    Placed(Order),
    /// The risk gate refused the signal
    GateRejected(RejectionReason),
    /// The exchange refused the order; audit row written
    ExchangeRejected(Order),
}

/// Counters for one signal-polling cycle
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalStats {
    pub strategies: usize,
    pub signals: usize,
    pub placed: usize,
    pub rejected: usize,
    pub failed: usize,
    pub deadline_hit: bool,
}

/// The live mirroring engine
#[derive(Clone)]
pub struct Engine {
    strategies: Arc<dyn StrategyStore>,
    orders: Arc<dyn OrderStore>,
    exchange: Arc<dyn ExchangeClient>,
    gate: RiskGate,
    placer: OrderPlacer,
    sync: FillSynchronizer,
    reconciler: Reconciler,
    risk: RiskManager,
    jobs: JobsConfig,
}

impl Engine {
    /// Wire up an engine over the given stores and exchange clients
    pub fn new(
        strategies: Arc<dyn StrategyStore>,
        orders: Arc<dyn OrderStore>,
        exchange: Arc<dyn ExchangeClient>,
        fills: Arc<dyn FillPriceResolver>,
        jobs: JobsConfig,
    ) -> Self {
        let ledger = CapitalLedger::new(strategies.clone());
        let gate = RiskGate::new(strategies.clone(), orders.clone(), ledger.clone());
        let placer = OrderPlacer::new(exchange.clone(), orders.clone(), ledger.clone());
        let sync = FillSynchronizer::new(
            orders.clone(),
            exchange.clone(),
            fills,
            ledger.clone(),
            jobs.page_size,
        );
        let reconciler = Reconciler::new(strategies.clone(), orders.clone(), jobs.page_size);
        let risk = RiskManager::new(strategies.clone(), orders.clone(), ledger, jobs.page_size);

        Self {
            strategies,
            orders,
            exchange,
            gate,
            placer,
            sync,
            reconciler,
            risk,
            jobs,
        }
    }

    /// The fill synchronizer, for wiring the push-event listener
    pub fn synchronizer(&self) -> FillSynchronizer {
        self.sync.clone()
    }

    /// The order store backing this engine
    pub fn orders(&self) -> Arc<dyn OrderStore> {
        self.orders.clone()
    }

    /// The strategy store backing this engine
    pub fn strategies(&self) -> Arc<dyn StrategyStore> {
        self.strategies.clone()
    }

    /// Process one signal for one strategy: gate, then placement
    ///
    /// Safe against redelivery: a duplicate signal is rejected by the gate
    /// with no side effects.
    pub async fn process_signal(
        &self,
        strategy_id: StrategyId,
        signal: &Signal,
    ) -> Result<SignalOutcome> {
        match self.gate.evaluate(strategy_id, signal).await? {
            GateDecision::Rejected(reason) => Ok(SignalOutcome::GateRejected(reason)),
            GateDecision::Approved(intent) => {
                let strategy = self.strategies.get(strategy_id).await?;
                match self.placer.place(&strategy, intent).await? {
                    PlacementOutcome::Placed(order) => Ok(SignalOutcome::Placed(order)),
                    PlacementOutcome::Rejected(order) => Ok(SignalOutcome::ExchangeRejected(order)),
                }
            }
        }
    }

    /// Poll the signal producer for every tradeable strategy
    ///
    /// Signals for one strategy are processed sequentially, which is the
    /// serialization point the gate's check-then-act sequence requires.
    pub async fn run_signal_cycle(&self, source: &dyn SignalSource) -> SignalStats {
        let started = Instant::now();
        let deadline = started + self.cycle_budget();
        let mut stats = SignalStats::default();

        let mut request = PageRequest::first(self.jobs.page_size);
        'outer: loop {
            let page = match self.strategies.list_active(request).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to list strategies");
                    break;
                }
            };

            for strategy in &page.items {
                if Instant::now() >= deadline {
                    stats.deadline_hit = true;
                    break 'outer;
                }
                if !strategy.is_tradeable() {
                    continue;
                }
                stats.strategies += 1;

                let signals = match source.poll(&strategy.mirrored_source).await {
                    Ok(signals) => signals,
                    Err(e) => {
                        stats.failed += 1;
                        tracing::warn!(
                            strategy_id = %strategy.id,
                            error = %e,
                            "Signal poll failed, skipping strategy"
                        );
                        continue;
                    }
                };

                for signal in &signals {
                    stats.signals += 1;
                    match self.process_signal(strategy.id, signal).await {
                        Ok(SignalOutcome::Placed(_)) => stats.placed += 1,
                        Ok(_) => stats.rejected += 1,
                        Err(e) => {
                            stats.failed += 1;
                            tracing::warn!(
                                strategy_id = %strategy.id,
                                source_trade_id = %signal.source_trade_id,
                                error = %e,
                                "Signal processing failed, skipping"
                            );
                        }
                    }
                }
            }

            match page.next {
                Some(next) => request = next,
                None => break,
            }
        }

        record_job_duration(Job::Signals, started.elapsed());
        stats
    }

    /// One fill-synchronizer invocation over all open orders
    pub async fn run_sync_cycle(&self) -> SyncStats {
        let started = Instant::now();
        let stats = self.sync.sync_open_orders(started + self.cycle_budget()).await;
        record_job_duration(Job::FillSync, started.elapsed());
        stats
    }

    /// One reconciliation invocation over all active strategies
    pub async fn run_reconcile_cycle(&self) -> ReconcileStats {
        let started = Instant::now();
        let stats = self
            .reconciler
            .reconcile_all(started + self.cycle_budget())
            .await;
        record_job_duration(Job::Reconcile, started.elapsed());
        stats
    }

    /// One risk-manager invocation over all active strategies
    pub async fn run_risk_cycle(&self) -> RiskStats {
        let started = Instant::now();
        let stats = self.risk.evaluate_all(started + self.cycle_budget()).await;
        record_job_duration(Job::Risk, started.elapsed());
        stats
    }

    /// Operator command: cancel a resting order
    ///
    /// Cancels at the exchange, then re-syncs the order so any partial
    /// fill is accounted and the unfilled reserve is released.
    pub async fn cancel_order(&self, order_id: OrderId) -> Result<SyncOutcome> {
        let order = self.orders.get(order_id).await?;
        let Some(exchange_order_id) = order.exchange_order_id.clone() else {
            return Err(EngineError::Validation(
                "order has no exchange id".to_string(),
            ));
        };

        self.exchange
            .cancel(&exchange_order_id)
            .await
            .map_err(|e| match e {
                ExchangeError::Rejected(msg) => EngineError::ExchangeRejected(msg),
                ExchangeError::Transient(msg) => EngineError::ExchangeTransient(msg),
            })?;

        self.sync.sync_order(order_id).await
    }

    /// Operator command: pause a strategy
    pub async fn pause(&self, strategy_id: StrategyId, reason: String) -> Result<Strategy> {
        self.risk.pause(strategy_id, PauseReason::Manual(reason)).await
    }

    /// Operator command: resume a strategy
    pub async fn resume(&self, strategy_id: StrategyId) -> Result<Strategy> {
        self.risk.resume(strategy_id).await
    }

    /// Drive all periodic jobs forever
    pub async fn run(&self, signal_source: Option<Arc<dyn SignalSource>>) {
        let sync_loop = async {
            let mut interval =
                tokio::time::interval(Duration::from_secs(self.jobs.sync_interval_secs));
            loop {
                interval.tick().await;
                let stats = self.run_sync_cycle().await;
                tracing::debug!(?stats, "Sync cycle complete");
            }
        };

        let reconcile_loop = async {
            let mut interval =
                tokio::time::interval(Duration::from_secs(self.jobs.reconcile_interval_secs));
            loop {
                interval.tick().await;
                let stats = self.run_reconcile_cycle().await;
                tracing::debug!(?stats, "Reconcile cycle complete");
            }
        };

        let risk_loop = async {
            let mut interval =
                tokio::time::interval(Duration::from_secs(self.jobs.risk_interval_secs));
            loop {
                interval.tick().await;
                let stats = self.run_risk_cycle().await;
                tracing::debug!(?stats, "Risk cycle complete");
            }
        };

        let signal_loop = async {
            match signal_source {
                Some(source) => {
                    let mut interval =
                        tokio::time::interval(Duration::from_secs(self.jobs.signal_interval_secs));
                    loop {
                        interval.tick().await;
                        let stats = self.run_signal_cycle(source.as_ref()).await;
                        tracing::debug!(?stats, "Signal cycle complete");
                    }
                }
                None => futures_util::future::pending::<()>().await,
            }
        };

        tokio::join!(sync_loop, reconcile_loop, risk_loop, signal_loop);
    }

    fn cycle_budget(&self) -> Duration {
        Duration::from_secs(self.jobs.cycle_budget_secs)
    }
}

/// Insert configured strategies that are not subscribed yet
pub async fn seed_strategies(store: &Arc<dyn StrategyStore>, config: &Config) -> Result<usize> {
    let mut created = 0;
    for seed in &config.strategies {
        if store
            .find_subscription(&seed.owner, &seed.mirrored_source)
            .await?
            .is_some()
        {
            continue;
        }
        let strategy = Strategy::from_seed(seed, &config.defaults);
        tracing::info!(
            strategy_id = %strategy.id,
            owner = %strategy.owner,
            mirrored_source = %strategy.mirrored_source,
            initial_capital = %strategy.initial_capital,
            "Seeded strategy"
        );
        store.insert(strategy).await?;
        created += 1;
    }
    Ok(created)
}
