//! Operator commands: pause, resume, status
//!
//! These act through the same engine methods the automatic risk manager
//! uses, so an operator command racing the circuit breaker converges
//! through the same ledger operations. They operate on whatever store the
//! process is configured with; against the in-memory reference store they
//! affect only strategies seeded from the config file.

use crate::config::Config;
use crate::engine::{seed_strategies, Engine};
use crate::exchange::{ClobClient, ClobConfig, ClobFillResolver};
use crate::market::{GammaClient, GammaConfig, MarketDataClient};
use crate::store::{MemoryStore, OrderFilter, OrderStore, PageRequest, StrategyStore};
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[derive(Args, Debug)]
pub struct PauseArgs {
    /// Strategy to pause
    #[arg(long)]
    pub strategy_id: Uuid,

    /// Reason recorded on the strategy
    #[arg(long, default_value = "operator pause")]
    pub reason: String,
}

impl PauseArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let engine = build_engine(config).await?;
        let strategy = engine.pause(self.strategy_id, self.reason.clone()).await?;
        println!(
            "Paused {} ({}): {} moved to cooldown",
            strategy.id, strategy.owner, strategy.cooldown_capital
        );
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct ResumeArgs {
    /// Strategy to resume
    #[arg(long)]
    pub strategy_id: Uuid,
}

impl ResumeArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let engine = build_engine(config).await?;
        let strategy = engine.resume(self.strategy_id).await?;
        println!(
            "Resumed {} ({}): {} available",
            strategy.id, strategy.owner, strategy.available_cash
        );
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct CancelArgs {
    /// Order to cancel
    #[arg(long)]
    pub order_id: Uuid,
}

impl CancelArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let engine = build_engine(config).await?;
        let outcome = engine.cancel_order(self.order_id).await?;
        println!("Cancelled {}: {:?}", self.order_id, outcome);
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Limit output to one strategy
    #[arg(long)]
    pub strategy_id: Option<Uuid>,
}

impl StatusArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let engine = build_engine(config).await?;
        let strategies = engine.strategies();
        let orders = engine.orders();
        let market_data = GammaClient::with_config(GammaConfig {
            base_url: config.market.gamma_base_url.clone(),
            timeout: Duration::from_secs(config.market.request_timeout_secs),
        });

        let mut request = PageRequest::first(config.jobs.page_size);
        loop {
            let page = strategies.list_active(request).await?;
            for strategy in &page.items {
                if let Some(only) = self.strategy_id {
                    if strategy.id != only {
                        continue;
                    }
                }

                println!("Strategy {} ({})", strategy.id, strategy.owner);
                println!("  mirrors:   {}", strategy.mirrored_source);
                println!(
                    "  ledger:    available={} locked={} cooldown={}",
                    strategy.available_cash, strategy.locked_capital, strategy.cooldown_capital
                );
                println!(
                    "  equity:    {} (initial {}, drawdown {})",
                    strategy.equity(),
                    strategy.initial_capital,
                    strategy.current_drawdown_pct
                );
                if strategy.is_paused {
                    let reason = strategy
                        .pause_reason
                        .as_ref()
                        .map(|r| r.to_string())
                        .unwrap_or_else(|| "unknown".to_string());
                    println!("  paused:    {}", reason);
                }

                let open = orders
                    .list(
                        OrderFilter {
                            strategy_id: Some(strategy.id),
                            open_only: true,
                            ..Default::default()
                        },
                        PageRequest::first(config.jobs.page_size),
                    )
                    .await?;
                println!("  open orders: {}", open.items.len());
                for order in &open.items {
                    // Display only; current prices never feed the ledger
                    let prices = market_data
                        .get_outcome_prices(&order.market_id)
                        .await
                        .ok()
                        .flatten();
                    let quote = prices
                        .map(|p| format!("{:?} @ {:?}", p.outcomes, p.prices))
                        .unwrap_or_else(|| "unavailable".to_string());
                    println!(
                        "    {} {} ${} filled {} | market: {}",
                        order.id, order.token_id, order.signal_size_usd, order.fill_rate, quote
                    );
                }
            }
            match page.next {
                Some(next) => request = next,
                None => break,
            }
        }

        Ok(())
    }
}

async fn build_engine(config: &Config) -> anyhow::Result<Engine> {
    let store = Arc::new(MemoryStore::new());
    let strategies: Arc<dyn StrategyStore> = store.clone();
    let orders: Arc<dyn OrderStore> = store.clone();
    seed_strategies(&strategies, config).await?;

    let exchange = Arc::new(ClobClient::with_config(ClobConfig {
        base_url: config.exchange.clob_base_url.clone(),
        timeout: Duration::from_secs(config.exchange.request_timeout_secs),
        api_key: config.exchange.api_key.clone(),
    }));
    let fills = Arc::new(ClobFillResolver::new(
        config.exchange.clob_base_url.clone(),
        Duration::from_secs(config.exchange.request_timeout_secs),
    ));

    Ok(Engine::new(
        strategies,
        orders,
        exchange,
        fills,
        config.jobs.clone(),
    ))
}
