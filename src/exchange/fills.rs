//! Fill-price resolution
//!
//! Prefers true trade-level data (volume-weighted across partial fills) and
//! falls back to the order's limit price when trade data is unavailable.
//! The resolver is deliberately infallible: a price is always produced, the
//! fallback just carries less information.

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

/// Resolves the effective execution price of an order
#[async_trait]
pub trait FillPriceResolver: Send + Sync {
    /// Best-known fill price, falling back to the limit price
    async fn resolve(&self, exchange_order_id: &str, limit_price: Decimal) -> Decimal;
}

/// Volume-weighted average price over (price, size) fills
///
/// Returns `None` for an empty or zero-size fill set.
pub fn vwap(fills: &[(Decimal, Decimal)]) -> Option<Decimal> {
    let total_size: Decimal = fills.iter().map(|(_, size)| *size).sum();
    if total_size <= Decimal::ZERO {
        return None;
    }
    let notional: Decimal = fills.iter().map(|(price, size)| price * size).sum();
    Some(notional / total_size)
}

/// Resolves fill prices from the CLOB trades endpoint
pub struct ClobFillResolver {
    base_url: String,
    client: Client,
}

impl ClobFillResolver {
    /// Create a resolver against the given CLOB base URL
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    async fn fetch_fills(&self, exchange_order_id: &str) -> anyhow::Result<Vec<(Decimal, Decimal)>> {
        let url = format!("{}/data/trades", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("order_id", exchange_order_id)])
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("trades endpoint returned {}", response.status());
        }

        let trades: Vec<ClobTrade> = response.json().await?;
        trades
            .into_iter()
            .map(|t| {
                Ok((
                    Decimal::from_str(&t.price)?,
                    Decimal::from_str(&t.size)?,
                ))
            })
            .collect()
    }
}

#[async_trait]
impl FillPriceResolver for ClobFillResolver {
    async fn resolve(&self, exchange_order_id: &str, limit_price: Decimal) -> Decimal {
        match self.fetch_fills(exchange_order_id).await {
            Ok(fills) => match vwap(&fills) {
                Some(price) => price,
                None => {
                    tracing::debug!(
                        order = exchange_order_id,
                        "No trade-level fills, using limit price"
                    );
                    limit_price
                }
            },
            Err(e) => {
                tracing::debug!(
                    order = exchange_order_id,
                    error = %e,
                    "Trade lookup failed, using limit price"
                );
                limit_price
            }
        }
    }
}

/// Raw trade from the data API
#[derive(Debug, Deserialize)]
struct ClobTrade {
    price: String,
    size: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_vwap_single_fill() {
        let fills = vec![(dec!(0.55), dec!(100))];
        assert_eq!(vwap(&fills), Some(dec!(0.55)));
    }

    #[test]
    fn test_vwap_weights_by_size() {
        // 100 shares at 0.50, 300 shares at 0.60 -> 0.575
        let fills = vec![(dec!(0.50), dec!(100)), (dec!(0.60), dec!(300))];
        assert_eq!(vwap(&fills), Some(dec!(0.575)));
    }

    #[test]
    fn test_vwap_empty() {
        assert_eq!(vwap(&[]), None);
    }

    #[test]
    fn test_vwap_zero_size() {
        let fills = vec![(dec!(0.50), dec!(0))];
        assert_eq!(vwap(&fills), None);
    }

    #[tokio::test]
    async fn test_resolver_falls_back_on_unreachable_endpoint() {
        // Nothing listens here; the resolver must fall back to the limit
        let resolver =
            ClobFillResolver::new("http://127.0.0.1:1", Duration::from_millis(200));
        let price = resolver.resolve("0xorder", dec!(0.42)).await;
        assert_eq!(price, dec!(0.42));
    }
}
