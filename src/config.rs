//! Configuration types for poly-mirror
//!
//! Every section is an explicit, typed structure; unknown fields are
//! rejected at load time rather than silently accepted.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub push: PushConfig,
    #[serde(default)]
    pub signals: SignalsConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub defaults: StrategyDefaults,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Strategies seeded into the store at startup
    #[serde(default)]
    pub strategies: Vec<StrategySeed>,
}

/// CLOB order-entry endpoint configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExchangeConfig {
    #[serde(default = "default_clob_url")]
    pub clob_base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Optional API key forwarded on order-entry calls
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Gamma market-data endpoint configuration (display only)
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarketConfig {
    #[serde(default = "default_gamma_url")]
    pub gamma_base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// User-channel push notifications for order events
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PushConfig {
    /// Enable the event-driven fast path alongside polling
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_user_ws_url")]
    pub ws_url: String,
}

/// Signal producer polling configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignalsConfig {
    /// Base URL of the external signal producer; `None` disables the
    /// polling job (signals can still be fed in programmatically)
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Periodic job scheduling
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobsConfig {
    /// Fill synchronizer interval
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,
    /// Capital reconciliation interval
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_secs: u64,
    /// Risk manager interval
    #[serde(default = "default_risk_interval")]
    pub risk_interval_secs: u64,
    /// Signal polling interval
    #[serde(default = "default_signal_interval")]
    pub signal_interval_secs: u64,
    /// Wall-clock budget for a single job invocation; unfinished work
    /// rolls over to the next run
    #[serde(default = "default_cycle_budget")]
    pub cycle_budget_secs: u64,
    /// Page size for store queries inside job loops
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

/// Limits applied to seeded strategies when the seed omits them
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategyDefaults {
    #[serde(default = "default_min_order_size")]
    pub min_order_size: Decimal,
    #[serde(default = "default_max_order_size")]
    pub max_order_size: Decimal,
    #[serde(default = "default_slippage_tolerance")]
    pub slippage_tolerance: Decimal,
    #[serde(default = "default_circuit_breaker_loss_pct")]
    pub circuit_breaker_loss_pct: Decimal,
    #[serde(default = "default_cooldown_hours")]
    pub cooldown_hours: i64,
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// A strategy row created at startup if no row with the same owner and
/// mirrored source exists yet
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategySeed {
    pub owner: String,
    pub wallet_address: String,
    /// Identifier of the simulated strategy being copied
    pub mirrored_source: String,
    pub initial_capital: Decimal,
    /// Fixed dollar amount per signal; takes precedence over `fraction`
    #[serde(default)]
    pub fixed_amount: Option<Decimal>,
    /// Fraction of current capital per signal
    #[serde(default)]
    pub fraction: Option<Decimal>,
    #[serde(default)]
    pub daily_budget: Option<Decimal>,
    #[serde(default)]
    pub max_daily_loss: Option<Decimal>,
    #[serde(default)]
    pub max_consecutive_losses: Option<u32>,
    #[serde(default)]
    pub max_order_size: Option<Decimal>,
    #[serde(default)]
    pub slippage_tolerance: Option<Decimal>,
    #[serde(default)]
    pub circuit_breaker_loss_pct: Option<Decimal>,
    #[serde(default)]
    pub cooldown_hours: Option<i64>,
}

fn default_clob_url() -> String {
    "https://clob.polymarket.com".to_string()
}
fn default_gamma_url() -> String {
    "https://gamma-api.polymarket.com".to_string()
}
fn default_user_ws_url() -> String {
    "wss://ws-subscriptions-clob.polymarket.com/ws/user".to_string()
}
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_sync_interval() -> u64 {
    15
}
fn default_reconcile_interval() -> u64 {
    60
}
fn default_risk_interval() -> u64 {
    60
}
fn default_signal_interval() -> u64 {
    10
}
fn default_cycle_budget() -> u64 {
    55
}
fn default_page_size() -> usize {
    100
}
fn default_min_order_size() -> Decimal {
    dec!(1)
}
fn default_max_order_size() -> Decimal {
    dec!(500)
}
fn default_slippage_tolerance() -> Decimal {
    dec!(0.02)
}
fn default_circuit_breaker_loss_pct() -> Decimal {
    dec!(0.20)
}
fn default_cooldown_hours() -> i64 {
    24
}
fn default_metrics_port() -> u16 {
    9090
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            clob_base_url: default_clob_url(),
            request_timeout_secs: default_request_timeout_secs(),
            api_key: None,
        }
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            gamma_base_url: default_gamma_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ws_url: default_user_ws_url(),
        }
    }
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            source_url: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            sync_interval_secs: default_sync_interval(),
            reconcile_interval_secs: default_reconcile_interval(),
            risk_interval_secs: default_risk_interval(),
            signal_interval_secs: default_signal_interval(),
            cycle_budget_secs: default_cycle_budget(),
            page_size: default_page_size(),
        }
    }
}

impl Default for StrategyDefaults {
    fn default() -> Self {
        Self {
            min_order_size: default_min_order_size(),
            max_order_size: default_max_order_size(),
            slippage_tolerance: default_slippage_tolerance(),
            circuit_breaker_loss_pct: default_circuit_breaker_loss_pct(),
            cooldown_hours: default_cooldown_hours(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_port: default_metrics_port(),
            log_level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exchange: ExchangeConfig::default(),
            market: MarketConfig::default(),
            push: PushConfig::default(),
            signals: SignalsConfig::default(),
            jobs: JobsConfig::default(),
            defaults: StrategyDefaults::default(),
            telemetry: TelemetryConfig::default(),
            strategies: vec![],
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
