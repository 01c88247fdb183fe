use crate::auth::SingleOwner;
use crate::chain::BlockOracle;
use crate::error::IfoError;
use crate::pool::{check_price_consistency, PoolTerms, SaleWindow};
use crate::sale::{SaleInstance, SaleParams};
use crate::tax::TaxSchedule;
use crate::tokens::TokenLedger;
use crate::{Address, PoolId, DEFAULT_POOL_COUNT, MAX_POOL_COUNT, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Serde adapter for U256 ↔ TOML: serialize as a decimal string, deserialize
/// from a string (optionally suffixed with `ether`) or an integer.
/// TOML integers stop at i64, so large amounts round-trip through strings.
pub mod u256_toml {
    use crate::units::parse_amount;
    use crate::U256;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(val: &U256, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&val.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<U256, D::Error> {
        use serde::de::{self, Visitor};
        struct U256Visitor;

        impl<'de> Visitor<'de> for U256Visitor {
            type Value = U256;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a 256-bit amount as a string or integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<U256, E> {
                parse_amount(v).map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<U256, E> {
                Ok(U256::from(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<U256, E> {
                if v >= 0 {
                    Ok(U256::from(v as u64))
                } else {
                    Err(E::custom("negative value for amount"))
                }
            }
        }

        d.deserialize_any(U256Visitor)
    }
}

fn default_pool_count() -> u8 {
    DEFAULT_POOL_COUNT
}

fn default_name() -> String {
    "ifo".to_string()
}

/// Terms of one pool as written in a sale config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub pool_id: PoolId,
    #[serde(with = "u256_toml")]
    pub offering_amount: U256,
    #[serde(with = "u256_toml")]
    pub raising_amount: U256,
    /// 0 = uncapped
    #[serde(default, with = "u256_toml")]
    pub cap_per_user: U256,
    #[serde(default)]
    pub has_tax: bool,
    /// Custom tiers; the standard schedule when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_schedule: Option<TaxSchedule>,
}

impl PoolConfig {
    pub fn terms(&self) -> PoolTerms {
        let terms = PoolTerms::new(
            self.offering_amount,
            self.raising_amount,
            self.cap_per_user,
            self.has_tax,
        );
        match &self.tax_schedule {
            Some(schedule) => terms.with_tax_schedule(schedule.clone()),
            None => terms,
        }
    }
}

/// Sale definition: identity, window and pool terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub address: Address,
    pub raise_token: Address,
    pub offering_token: Address,
    #[serde(default)]
    pub admin: Address,
    pub start_block: u64,
    pub end_block: u64,
    #[serde(default = "default_pool_count")]
    pub pool_count: u8,
    #[serde(default)]
    pub pools: Vec<PoolConfig>,
}

impl SaleConfig {
    /// Load sale config from TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let config: SaleConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save sale config to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Apply `IFO_START_BLOCK`, `IFO_END_BLOCK` and `IFO_ADMIN` when set.
    pub fn with_env_overrides(self) -> Result<Self, IfoError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Same as [`with_env_overrides`](Self::with_env_overrides), reading
    /// values through `lookup` instead of the process environment.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, IfoError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("IFO_START_BLOCK") {
            self.start_block = v
                .trim()
                .parse()
                .map_err(|e| IfoError::Config(format!("IFO_START_BLOCK: {}", e)))?;
        }
        if let Some(v) = lookup("IFO_END_BLOCK") {
            self.end_block = v
                .trim()
                .parse()
                .map_err(|e| IfoError::Config(format!("IFO_END_BLOCK: {}", e)))?;
        }
        if let Some(v) = lookup("IFO_ADMIN") {
            self.admin = v
                .trim()
                .parse()
                .map_err(|e| IfoError::Config(format!("IFO_ADMIN: {}", e)))?;
        }
        Ok(self)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), IfoError> {
        SaleWindow::new(self.start_block, self.end_block)?;

        if self.raise_token == self.offering_token {
            return Err(IfoError::InvalidToken(
                "raise token and offering token must be different".to_string(),
            ));
        }
        if self.admin == Address::ZERO {
            return Err(IfoError::Config("admin address is not set".to_string()));
        }
        if self.pool_count == 0 || self.pool_count > MAX_POOL_COUNT {
            return Err(IfoError::Config(format!(
                "pool count must be within 1..={}, got {}",
                MAX_POOL_COUNT, self.pool_count
            )));
        }

        let mut seen = BTreeSet::new();
        for pool in &self.pools {
            if pool.pool_id >= self.pool_count {
                return Err(IfoError::InvalidPool(pool.pool_id));
            }
            if !seen.insert(pool.pool_id) {
                return Err(IfoError::Config(format!(
                    "pool {} configured twice",
                    pool.pool_id
                )));
            }
            if pool.offering_amount.is_zero() || pool.raising_amount.is_zero() {
                return Err(IfoError::Config(format!(
                    "pool {} needs non-zero offering and raising amounts",
                    pool.pool_id
                )));
            }
            if let Some(schedule) = &pool.tax_schedule {
                schedule.validate()?;
            }
        }

        check_price_consistency(
            self.pools
                .iter()
                .map(|p| (p.pool_id, p.offering_amount, p.raising_amount)),
        )
    }

    pub fn sale_params(&self) -> Result<SaleParams, IfoError> {
        Ok(SaleParams {
            address: self.address,
            raise_token: self.raise_token,
            offering_token: self.offering_token,
            window: SaleWindow::new(self.start_block, self.end_block)?,
            pool_count: self.pool_count,
        })
    }

    /// Total offering tokens the sale must hold before deposits open.
    pub fn total_offering(&self) -> Result<U256, IfoError> {
        self.pools.iter().try_fold(U256::ZERO, |acc, p| {
            acc.checked_add(p.offering_amount)
                .ok_or(IfoError::ArithmeticOverflow)
        })
    }

    /// Validate, create the sale owned by `admin` and apply every pool's terms.
    ///
    /// Must run before `start_block`, like any pool configuration.
    pub fn build(
        &self,
        tokens: Arc<dyn TokenLedger>,
        clock: Arc<dyn BlockOracle>,
    ) -> Result<SaleInstance, IfoError> {
        self.validate()?;
        let sale = SaleInstance::new(
            self.sale_params()?,
            tokens,
            Arc::new(SingleOwner(self.admin)),
            clock,
        )?;
        for pool in &self.pools {
            sale.configure_pool(self.admin, pool.pool_id, pool.terms())?;
        }
        Ok(sale)
    }
}
