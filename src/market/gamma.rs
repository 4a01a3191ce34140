//! Gamma API client for outcome prices
//!
//! Fetches market metadata from Polymarket's Gamma API. Array-valued
//! fields arrive as JSON strings (`"[\"Yes\", \"No\"]"`) and are parsed
//! into typed values here.

use super::{MarketDataClient, OutcomePrices};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

/// Gamma API base URL
pub const GAMMA_API_URL: &str = "https://gamma-api.polymarket.com";

/// Configuration for the Gamma client
#[derive(Debug, Clone)]
pub struct GammaConfig {
    /// Base URL for the Gamma API
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for GammaConfig {
    fn default() -> Self {
        Self {
            base_url: GAMMA_API_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Client for Polymarket's Gamma API
pub struct GammaClient {
    config: GammaConfig,
    client: Client,
}

impl GammaClient {
    /// Create a new Gamma API client with default configuration
    pub fn new() -> Self {
        Self::with_config(GammaConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: GammaConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }
}

impl Default for GammaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataClient for GammaClient {
    async fn get_outcome_prices(&self, market_id: &str) -> anyhow::Result<Option<OutcomePrices>> {
        let url = format!("{}/markets", self.config.base_url);

        tracing::debug!(market_id, "Fetching outcome prices from Gamma API");

        let response = self
            .client
            .get(&url)
            .query(&[("condition_ids", market_id)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Gamma API error: {} - {}", status, body);
        }

        let markets: Vec<GammaMarket> = response.json().await?;

        markets
            .into_iter()
            .next()
            .map(|m| m.into_outcome_prices())
            .transpose()
    }
}

/// Raw market response from the Gamma API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GammaMarket {
    /// Condition ID for the market
    #[allow(dead_code)]
    condition_id: String,
    /// Outcome names as a JSON string
    outcomes: Option<String>,
    /// Outcome prices as a JSON string
    outcome_prices: Option<String>,
}

impl GammaMarket {
    fn into_outcome_prices(self) -> anyhow::Result<OutcomePrices> {
        let outcomes = self
            .outcomes
            .as_deref()
            .map(parse_string_array)
            .transpose()?
            .unwrap_or_default();
        let prices = self
            .outcome_prices
            .as_deref()
            .map(parse_price_array)
            .transpose()?
            .unwrap_or_default();

        if outcomes.len() != prices.len() {
            anyhow::bail!(
                "outcome/price length mismatch: {} vs {}",
                outcomes.len(),
                prices.len()
            );
        }

        Ok(OutcomePrices { outcomes, prices })
    }
}

/// Parse a JSON-string array field like "[\"Yes\", \"No\"]"
fn parse_string_array(raw: &str) -> anyhow::Result<Vec<String>> {
    serde_json::from_str(raw)
        .map_err(|e| anyhow::anyhow!("Failed to parse array field: {} - {}", raw, e))
}

/// Parse a JSON-string price array like "[\"0.52\", \"0.48\"]"
fn parse_price_array(raw: &str) -> anyhow::Result<Vec<Decimal>> {
    let strings: Vec<String> = parse_string_array(raw)?;
    strings
        .iter()
        .map(|s| {
            Decimal::from_str(s).map_err(|e| anyhow::anyhow!("Bad price {:?}: {}", s, e))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_gamma_config_default() {
        let config = GammaConfig::default();
        assert_eq!(config.base_url, GAMMA_API_URL);
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_parse_string_array() {
        let outcomes = parse_string_array(r#"["Yes", "No"]"#).unwrap();
        assert_eq!(outcomes, vec!["Yes".to_string(), "No".to_string()]);
    }

    #[test]
    fn test_parse_string_array_invalid() {
        assert!(parse_string_array("not json").is_err());
    }

    #[test]
    fn test_parse_price_array() {
        let prices = parse_price_array(r#"["0.52", "0.48"]"#).unwrap();
        assert_eq!(prices, vec![dec!(0.52), dec!(0.48)]);
    }

    #[test]
    fn test_parse_price_array_bad_number() {
        assert!(parse_price_array(r#"["0.52", "oops"]"#).is_err());
    }

    #[test]
    fn test_into_outcome_prices() {
        let market = GammaMarket {
            condition_id: "0x123".to_string(),
            outcomes: Some(r#"["Yes", "No"]"#.to_string()),
            outcome_prices: Some(r#"["0.61", "0.39"]"#.to_string()),
        };

        let prices = market.into_outcome_prices().unwrap();
        assert_eq!(prices.outcomes.len(), 2);
        assert_eq!(prices.price_for("Yes"), Some(dec!(0.61)));
    }

    #[test]
    fn test_into_outcome_prices_length_mismatch() {
        let market = GammaMarket {
            condition_id: "0x123".to_string(),
            outcomes: Some(r#"["Yes", "No"]"#.to_string()),
            outcome_prices: Some(r#"["0.61"]"#.to_string()),
        };
        assert!(market.into_outcome_prices().is_err());
    }

    #[test]
    fn test_into_outcome_prices_missing_fields() {
        let market = GammaMarket {
            condition_id: "0x123".to_string(),
            outcomes: None,
            outcome_prices: None,
        };
        let prices = market.into_outcome_prices().unwrap();
        assert!(prices.outcomes.is_empty());
        assert!(prices.prices.is_empty());
    }
}
