//! Market data module
//!
//! Read-only outcome prices from the Gamma API, used to show unrealized
//! value for open positions. Never consulted for ledger correctness; the
//! order log is the only accounting input.

mod gamma;

pub use gamma::{GammaClient, GammaConfig, GAMMA_API_URL};

use async_trait::async_trait;
use rust_decimal::Decimal;

/// Current prices for a market's outcomes
#[derive(Debug, Clone)]
pub struct OutcomePrices {
    pub outcomes: Vec<String>,
    pub prices: Vec<Decimal>,
}

impl OutcomePrices {
    /// Price of a named outcome, if the market lists it
    pub fn price_for(&self, outcome: &str) -> Option<Decimal> {
        self.outcomes
            .iter()
            .position(|o| o == outcome)
            .and_then(|i| self.prices.get(i).copied())
    }
}

/// Trait for market data implementations
#[async_trait]
pub trait MarketDataClient: Send + Sync {
    /// Fetch outcome prices for one market, if it exists
    async fn get_outcome_prices(&self, market_id: &str) -> anyhow::Result<Option<OutcomePrices>>;
}
