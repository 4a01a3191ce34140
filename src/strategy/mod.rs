//! Strategy model
//!
//! A strategy is one live-trading subscription: it mirrors a simulated
//! signal source with real capital and carries the per-strategy capital
//! ledger fields. Rows are created on subscription, mutated by every core
//! component, and never deleted (soft-deactivated via `is_active`).

use crate::config::{StrategyDefaults, StrategySeed};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Strategy identifier
pub type StrategyId = Uuid;

/// Per-signal sizing policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SizingPolicy {
    /// Same dollar amount for every signal
    Fixed { amount: Decimal },
    /// Fraction of current equity, bounded by a maximum fraction and an
    /// absolute dollar cap
    Fraction {
        fraction: Decimal,
        max_fraction: Decimal,
        cap: Decimal,
    },
}

/// Why a strategy was paused
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PauseReason {
    /// Drawdown reached the circuit-breaker threshold
    DrawdownLimit(Decimal),
    /// Too many consecutive resolved losses
    ConsecutiveLosses(u32),
    /// Realized loss for the current UTC day exceeded the limit
    DailyLossLimit(Decimal),
    /// Operator-issued pause
    Manual(String),
}

impl std::fmt::Display for PauseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PauseReason::DrawdownLimit(pct) => write!(f, "drawdown reached {}", pct),
            PauseReason::ConsecutiveLosses(n) => write!(f, "{} consecutive losses", n),
            PauseReason::DailyLossLimit(loss) => write!(f, "daily loss reached {}", loss),
            PauseReason::Manual(reason) => write!(f, "manual: {}", reason),
        }
    }
}

/// A live mirroring subscription with its capital ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strategy {
    /// Strategy identifier
    pub id: StrategyId,
    /// Owning user
    pub owner: String,
    /// Wallet used for live orders
    pub wallet_address: String,
    /// Identifier of the simulated strategy being copied
    pub mirrored_source: String,

    /// Capital committed at subscription time
    pub initial_capital: Decimal,
    /// Cash free for new signals
    pub available_cash: Decimal,
    /// Cash reserved against pending/open orders
    pub locked_capital: Decimal,
    /// Cash held out of circulation while paused
    pub cooldown_capital: Decimal,

    /// Hours a pause lasts before automatic resume
    pub cooldown_hours: i64,
    /// Optional spend ceiling per UTC day
    pub daily_budget: Option<Decimal>,
    /// Spend accumulated in the current UTC-day bucket
    pub daily_spent: Decimal,
    /// UTC day the bucket belongs to; a new day resets the bucket
    pub daily_spent_date: NaiveDate,

    /// Smallest order the gate will approve
    pub min_order_size: Decimal,
    /// Largest order the gate will approve
    pub max_order_size: Decimal,
    /// How to size an approved signal
    pub sizing: SizingPolicy,
    /// How far the limit price may cross the signal price
    pub slippage_tolerance: Decimal,

    /// Drawdown fraction that trips the circuit breaker
    pub circuit_breaker_loss_pct: Decimal,
    /// Optional realized-loss ceiling per UTC day
    pub max_daily_loss: Option<Decimal>,
    /// Optional consecutive-loss ceiling
    pub max_consecutive_losses: Option<u32>,

    /// Highest equity observed
    pub peak_equity: Decimal,
    /// Drawdown from initial capital, recomputed by reconciliation
    pub current_drawdown_pct: Decimal,

    /// Soft-delete flag; inactive strategies are skipped everywhere
    pub is_active: bool,
    /// Circuit-breaker / operator pause flag
    pub is_paused: bool,
    /// Why the strategy is paused
    pub pause_reason: Option<PauseReason>,
    /// When the pause started
    pub paused_at: Option<DateTime<Utc>>,

    /// Subscription timestamp
    pub created_at: DateTime<Utc>,
}

impl Strategy {
    /// Create a new strategy with all capital available
    pub fn new(
        owner: impl Into<String>,
        wallet_address: impl Into<String>,
        mirrored_source: impl Into<String>,
        initial_capital: Decimal,
        sizing: SizingPolicy,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner: owner.into(),
            wallet_address: wallet_address.into(),
            mirrored_source: mirrored_source.into(),
            initial_capital,
            available_cash: initial_capital,
            locked_capital: dec!(0),
            cooldown_capital: dec!(0),
            cooldown_hours: 24,
            daily_budget: None,
            daily_spent: dec!(0),
            daily_spent_date: now.date_naive(),
            min_order_size: dec!(1),
            max_order_size: dec!(500),
            sizing,
            slippage_tolerance: dec!(0.02),
            circuit_breaker_loss_pct: dec!(0.20),
            max_daily_loss: None,
            max_consecutive_losses: None,
            peak_equity: initial_capital,
            current_drawdown_pct: dec!(0),
            is_active: true,
            is_paused: false,
            pause_reason: None,
            paused_at: None,
            created_at: now,
        }
    }

    /// Build a strategy from a config seed, filling gaps from defaults
    pub fn from_seed(seed: &StrategySeed, defaults: &StrategyDefaults) -> Self {
        let max_order_size = seed.max_order_size.unwrap_or(defaults.max_order_size);
        let sizing = match (seed.fixed_amount, seed.fraction) {
            (Some(amount), _) => SizingPolicy::Fixed { amount },
            (None, Some(fraction)) => SizingPolicy::Fraction {
                fraction,
                max_fraction: dec!(0.25),
                cap: max_order_size,
            },
            // No sizing configured: mirror at a tenth of capital per signal
            (None, None) => SizingPolicy::Fraction {
                fraction: dec!(0.10),
                max_fraction: dec!(0.25),
                cap: max_order_size,
            },
        };

        let mut strategy = Self::new(
            seed.owner.clone(),
            seed.wallet_address.clone(),
            seed.mirrored_source.clone(),
            seed.initial_capital,
            sizing,
        );
        strategy.min_order_size = defaults.min_order_size;
        strategy.max_order_size = max_order_size;
        strategy.slippage_tolerance = seed
            .slippage_tolerance
            .unwrap_or(defaults.slippage_tolerance);
        strategy.circuit_breaker_loss_pct = seed
            .circuit_breaker_loss_pct
            .unwrap_or(defaults.circuit_breaker_loss_pct);
        strategy.cooldown_hours = seed.cooldown_hours.unwrap_or(defaults.cooldown_hours);
        strategy.daily_budget = seed.daily_budget;
        strategy.max_daily_loss = seed.max_daily_loss;
        strategy.max_consecutive_losses = seed.max_consecutive_losses;
        strategy
    }

    /// Total capital on the books: free + locked + cooldown
    pub fn equity(&self) -> Decimal {
        self.available_cash + self.locked_capital + self.cooldown_capital
    }

    /// Whether the risk gate may approve signals for this strategy
    pub fn is_tradeable(&self) -> bool {
        self.is_active && !self.is_paused
    }

    /// Daily budget left for the given UTC day, if a budget is configured
    pub fn daily_budget_remaining(&self, today: NaiveDate) -> Option<Decimal> {
        let budget = self.daily_budget?;
        let spent = if self.daily_spent_date == today {
            self.daily_spent
        } else {
            dec!(0)
        };
        Some((budget - spent).max(dec!(0)))
    }
}
