// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IFO ENGINE - OVERFLOW TAX SCHEDULE
//
// Tax rate applied to refunded overflow in oversubscribed pools.
// The rate is a step function of the live oversubscription ratio
// (total raised / raising target, integer division) and shrinks as the
// pool gets more oversubscribed. Rates are 1e12 fixed point (1e10 = 1%).
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::error::IfoError;
use crate::{precision, U256};
use serde::{Deserialize, Serialize};

/// Rate charged below the first tier (1%).
pub const BASE_TAX_RATE: u64 = 10_000_000_000;

/// Default tiers: (minimum ratio, rate).
pub const DEFAULT_TIERS: [(u64, u64); 6] = [
    (1500, 500_000_000),   // 0.05%
    (1000, 1_000_000_000), // 0.1%
    (500, 2_000_000_000),  // 0.2%
    (250, 2_500_000_000),  // 0.25%
    (100, 3_000_000_000),  // 0.3%
    (50, 5_000_000_000),   // 0.5%
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxTier {
    /// Applies when `total_raised / raising_amount >= min_ratio`.
    pub min_ratio: u64,
    pub rate: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSchedule {
    /// Sorted by `min_ratio`, highest first.
    pub tiers: Vec<TaxTier>,
    pub base_rate: u64,
}

impl Default for TaxSchedule {
    fn default() -> Self {
        Self {
            tiers: DEFAULT_TIERS
                .iter()
                .map(|&(min_ratio, rate)| TaxTier { min_ratio, rate })
                .collect(),
            base_rate: BASE_TAX_RATE,
        }
    }
}

impl TaxSchedule {
    /// Single scalar rate regardless of oversubscription.
    pub fn flat(rate: u64) -> Self {
        Self {
            tiers: Vec::new(),
            base_rate: rate,
        }
    }

    pub fn validate(&self) -> Result<(), IfoError> {
        let max = crate::PRECISION;
        if self.base_rate > max {
            return Err(IfoError::Config(format!(
                "base tax rate {} exceeds precision {}",
                self.base_rate, max
            )));
        }
        let mut previous: Option<u64> = None;
        for tier in &self.tiers {
            if tier.rate > max {
                return Err(IfoError::Config(format!(
                    "tax rate {} at ratio {} exceeds precision {}",
                    tier.rate, tier.min_ratio, max
                )));
            }
            if let Some(prev) = previous {
                if tier.min_ratio >= prev {
                    return Err(IfoError::Config(
                        "tax tiers must be sorted by strictly descending min_ratio".to_string(),
                    ));
                }
            }
            previous = Some(tier.min_ratio);
        }
        Ok(())
    }

    /// Rate for a given oversubscription ratio.
    pub fn rate_for_ratio(&self, ratio: U256) -> U256 {
        self.tiers
            .iter()
            .find(|tier| ratio >= U256::from(tier.min_ratio))
            .map(|tier| U256::from(tier.rate))
            .unwrap_or_else(|| U256::from(self.base_rate))
    }

    /// Rate for the current pool totals. Zero raising target yields zero.
    pub fn rate_for(&self, total_raised: U256, raising_amount: U256) -> U256 {
        if raising_amount.is_zero() {
            return U256::ZERO;
        }
        self.rate_for_ratio(total_raised / raising_amount)
    }
}

/// `amount * rate / PRECISION`
pub fn apply_rate(amount: U256, rate: U256) -> Result<U256, IfoError> {
    crate::math::mul_div(amount, rate, precision())
}
