//! Signal sizing implementations
//!
//! Turns an approved signal into a dollar commitment. Fixed sizing mirrors
//! every signal with the same stake; fraction sizing scales with current
//! equity, bounded by a maximum fraction and an absolute cap and clamped
//! to the cash actually available.

use crate::signal::Signal;
use crate::strategy::{SizingPolicy, Strategy};
use rust_decimal::Decimal;

/// Trait for signal sizing implementations
pub trait SignalSizer: Send + Sync {
    /// Dollar amount to commit for this signal
    fn size(&self, signal: &Signal, strategy: &Strategy) -> Decimal;

    /// Get the sizing mode name
    fn mode_name(&self) -> &'static str;
}

/// Fixed dollar amount per signal
#[derive(Debug, Clone)]
pub struct FixedSizer {
    /// Stake per signal
    pub amount: Decimal,
}

impl SignalSizer for FixedSizer {
    fn size(&self, _signal: &Signal, _strategy: &Strategy) -> Decimal {
        // Deliberately not clamped to available cash: a fixed stake that
        // no longer fits is rejected by the gate, not silently shrunk
        self.amount
    }

    fn mode_name(&self) -> &'static str {
        "fixed"
    }
}

/// Fraction of current equity per signal
#[derive(Debug, Clone)]
pub struct FractionSizer {
    /// Fraction of equity per signal (e.g. 0.10 = 10%)
    pub fraction: Decimal,
    /// Hard ceiling on the fraction
    pub max_fraction: Decimal,
    /// Absolute dollar cap
    pub cap: Decimal,
}

impl SignalSizer for FractionSizer {
    fn size(&self, _signal: &Signal, strategy: &Strategy) -> Decimal {
        let equity = strategy.equity();
        let base = equity * self.fraction;
        let max = equity * self.max_fraction;

        base.min(max).min(self.cap).min(strategy.available_cash)
    }

    fn mode_name(&self) -> &'static str {
        "fraction"
    }
}

/// Create a sizer for a strategy's configured policy
pub fn sizer_for(policy: &SizingPolicy) -> Box<dyn SignalSizer> {
    match policy {
        SizingPolicy::Fixed { amount } => Box::new(FixedSizer { amount: *amount }),
        SizingPolicy::Fraction {
            fraction,
            max_fraction,
            cap,
        } => Box::new(FractionSizer {
            fraction: *fraction,
            max_fraction: *max_fraction,
            cap: *cap,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn test_signal() -> Signal {
        Signal {
            source_trade_id: "trade-1".to_string(),
            market_id: "0xcond".to_string(),
            token_id: "token".to_string(),
            side: crate::signal::Side::Buy,
            suggested_price: dec!(0.55),
            suggested_size_usd: dec!(500),
            timestamp: Utc::now(),
        }
    }

    fn strategy_with(available: Decimal, locked: Decimal) -> Strategy {
        let mut strategy = Strategy::new(
            "user-1",
            "0xwallet",
            "sim-1",
            available + locked,
            SizingPolicy::Fixed { amount: dec!(50) },
        );
        strategy.available_cash = available;
        strategy.locked_capital = locked;
        strategy
    }

    #[test]
    fn test_fixed_sizer_ignores_capital() {
        let sizer = FixedSizer { amount: dec!(25) };
        let strategy = strategy_with(dec!(10), dec!(0));
        assert_eq!(sizer.size(&test_signal(), &strategy), dec!(25));
        assert_eq!(sizer.mode_name(), "fixed");
    }

    #[test]
    fn test_fraction_sizer_scales_with_equity() {
        let sizer = FractionSizer {
            fraction: dec!(0.10),
            max_fraction: dec!(0.25),
            cap: dec!(500),
        };
        // Equity 1000 (600 available + 400 locked) -> 10% = 100
        let strategy = strategy_with(dec!(600), dec!(400));
        assert_eq!(sizer.size(&test_signal(), &strategy), dec!(100));
        assert_eq!(sizer.mode_name(), "fraction");
    }

    #[test]
    fn test_fraction_sizer_respects_max_fraction() {
        let sizer = FractionSizer {
            fraction: dec!(0.50),
            max_fraction: dec!(0.25),
            cap: dec!(500),
        };
        let strategy = strategy_with(dec!(1000), dec!(0));
        // 50% wanted, capped at 25% of equity
        assert_eq!(sizer.size(&test_signal(), &strategy), dec!(250));
    }

    #[test]
    fn test_fraction_sizer_respects_cap() {
        let sizer = FractionSizer {
            fraction: dec!(0.10),
            max_fraction: dec!(0.25),
            cap: dec!(60),
        };
        let strategy = strategy_with(dec!(1000), dec!(0));
        assert_eq!(sizer.size(&test_signal(), &strategy), dec!(60));
    }

    #[test]
    fn test_fraction_sizer_clamped_to_available() {
        let sizer = FractionSizer {
            fraction: dec!(0.10),
            max_fraction: dec!(0.25),
            cap: dec!(500),
        };
        // Equity 1000 but only 30 free
        let strategy = strategy_with(dec!(30), dec!(970));
        assert_eq!(sizer.size(&test_signal(), &strategy), dec!(30));
    }

    #[test]
    fn test_sizer_for_dispatch() {
        let fixed = sizer_for(&SizingPolicy::Fixed { amount: dec!(20) });
        assert_eq!(fixed.mode_name(), "fixed");

        let fraction = sizer_for(&SizingPolicy::Fraction {
            fraction: dec!(0.1),
            max_fraction: dec!(0.2),
            cap: dec!(100),
        });
        assert_eq!(fraction.mode_name(), "fraction");
    }
}
