//! Run command implementation

use crate::config::Config;
use crate::engine::{seed_strategies, Engine};
use crate::exchange::{ClobClient, ClobConfig, ClobFillResolver};
use crate::signal::HttpSignalSource;
use crate::store::{MemoryStore, OrderStore, StrategyStore};
use crate::sync::OrderEventListener;
use clap::Args;
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        // The reference store is process-local; a database-backed
        // implementation of the same traits drops in for deployments
        let store = Arc::new(MemoryStore::new());
        let strategies: Arc<dyn StrategyStore> = store.clone();
        let orders: Arc<dyn OrderStore> = store.clone();

        let seeded = seed_strategies(&strategies, config).await?;
        tracing::info!(seeded, "Strategies ready");

        let exchange = Arc::new(ClobClient::with_config(ClobConfig {
            base_url: config.exchange.clob_base_url.clone(),
            timeout: Duration::from_secs(config.exchange.request_timeout_secs),
            api_key: config.exchange.api_key.clone(),
        }));
        let fills = Arc::new(ClobFillResolver::new(
            config.exchange.clob_base_url.clone(),
            Duration::from_secs(config.exchange.request_timeout_secs),
        ));

        let engine = Engine::new(
            strategies,
            orders.clone(),
            exchange,
            fills,
            config.jobs.clone(),
        );

        if config.push.enabled {
            let listener = OrderEventListener::new(
                config.push.clone(),
                config.exchange.api_key.clone(),
                engine.synchronizer(),
                orders,
            );
            tokio::spawn(async move {
                listener.run().await;
            });
            tracing::info!("Push-event fast path enabled");
        }

        let signal_source = config.signals.source_url.as_ref().map(|url| {
            Arc::new(HttpSignalSource::new(
                url.clone(),
                Duration::from_secs(config.signals.request_timeout_secs),
            )) as Arc<dyn crate::signal::SignalSource>
        });
        if signal_source.is_none() {
            tracing::warn!("No signal source configured; running sync and reconcile only");
        }

        tracing::info!("Engine starting");
        tokio::select! {
            _ = engine.run(signal_source) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown requested; in-flight work resumes next start");
            }
        }

        Ok(())
    }
}
