// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IFO ENGINE - SCENARIO REPLAY
//
// A scenario is a TOML script: one sale config, named accounts with starting
// balances, and block-stamped steps. Replay runs against an in-memory token
// ledger and a manual clock, checks each step's expected outcome and reports
// final pool state, balances and events.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::allocation::Allocation;
use crate::chain::{BlockOracle, ManualBlockClock};
use crate::config::{u256_toml, PoolConfig, SaleConfig};
use crate::error::IfoError;
use crate::events::SaleEvent;
use crate::pool::PoolInfo;
use crate::sale::SaleInstance;
use crate::tokens::{InMemoryTokenLedger, TokenLedger, Transfer};
use crate::{Address, PoolId, U256};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Reserved account name resolving to the sale's own address.
pub const SALE_ACCOUNT: &str = "sale";

/// Expected outcome meaning "the step succeeds".
pub const EXPECT_OK: &str = "ok";

/// Deterministic address for a named account: last 20 bytes of keccak256(name).
pub fn account_address(name: &str) -> Address {
    let digest = Keccak256::digest(name.as_bytes());
    Address::from_slice(&digest[12..])
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    /// Starting raise-token balance.
    #[serde(default, with = "u256_toml")]
    pub lp: U256,
    /// Starting offering-token balance.
    #[serde(default, with = "u256_toml")]
    pub offering: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Move offering tokens from an account into the sale escrow.
    Fund {
        from: String,
        #[serde(with = "u256_toml")]
        amount: U256,
    },
    /// Credit an arbitrary token (`lp`, `offering` or an address) to an account.
    Mint {
        to: String,
        token: String,
        #[serde(with = "u256_toml")]
        amount: U256,
    },
    Deposit {
        user: String,
        pool: PoolId,
        #[serde(with = "u256_toml")]
        amount: U256,
    },
    Harvest {
        user: String,
        pool: PoolId,
    },
    ConfigurePool {
        caller: String,
        pool: PoolId,
        #[serde(with = "u256_toml")]
        offering_amount: U256,
        #[serde(with = "u256_toml")]
        raising_amount: U256,
        #[serde(default, with = "u256_toml")]
        cap_per_user: U256,
        #[serde(default)]
        has_tax: bool,
    },
    UpdateWindow {
        caller: String,
        start_block: u64,
        end_block: u64,
    },
    Withdraw {
        caller: String,
        #[serde(default, with = "u256_toml")]
        lp_amount: U256,
        #[serde(default, with = "u256_toml")]
        offering_amount: U256,
    },
    Recover {
        caller: String,
        token: String,
        #[serde(with = "u256_toml")]
        amount: U256,
    },
}

impl Step {
    pub fn action(&self) -> &'static str {
        match self {
            Step::Fund { .. } => "fund",
            Step::Mint { .. } => "mint",
            Step::Deposit { .. } => "deposit",
            Step::Harvest { .. } => "harvest",
            Step::ConfigurePool { .. } => "configure_pool",
            Step::UpdateWindow { .. } => "update_window",
            Step::Withdraw { .. } => "withdraw",
            Step::Recover { .. } => "recover",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledStep {
    /// Block the clock is advanced to before the step runs.
    pub block: u64,
    #[serde(flatten)]
    pub step: Step,
    /// `"ok"` or an error kind such as `"TooEarly"`; unchecked when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub description: String,
    /// Block the clock starts at; must precede the sale start.
    #[serde(default)]
    pub initial_block: u64,
    /// Account name administering the sale; overrides `sale.admin`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin: Option<String>,
    pub sale: SaleConfig,
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
    #[serde(default)]
    pub steps: Vec<ScheduledStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub index: usize,
    pub block: u64,
    pub action: String,
    /// `"ok"` or the error kind.
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation: Option<Allocation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    pub index: usize,
    pub action: String,
    pub expected: String,
    pub actual: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub name: String,
    pub address: Address,
    pub lp: U256,
    pub offering: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub name: String,
    pub sale: Address,
    pub final_block: u64,
    pub outcomes: Vec<StepOutcome>,
    pub mismatches: Vec<Mismatch>,
    pub pools: Vec<PoolInfo>,
    /// Named accounts followed by the sale itself.
    pub balances: Vec<AccountBalance>,
    pub events: Vec<SaleEvent>,
    /// Hex keccak256 of pools, balances and events; equal for identical replays.
    pub state_digest: String,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub fn balance(&self, name: &str) -> Option<&AccountBalance> {
        self.balances.iter().find(|b| b.name == name)
    }
}

fn state_digest(
    pools: &[PoolInfo],
    balances: &[AccountBalance],
    events: &[SaleEvent],
) -> Result<String, IfoError> {
    let encoded = serde_json::to_vec(&(pools, balances, events))
        .map_err(|e| IfoError::Config(format!("cannot encode replay state: {}", e)))?;
    Ok(hex::encode(Keccak256::digest(&encoded)))
}

/// Live replay environment.
struct Replay {
    accounts: BTreeMap<String, Address>,
    tokens: Arc<InMemoryTokenLedger>,
    clock: Arc<ManualBlockClock>,
    sale: SaleInstance,
}

impl Replay {
    fn resolve(&self, name: &str) -> Result<Address, IfoError> {
        if name == SALE_ACCOUNT {
            return Ok(self.sale.address());
        }
        self.accounts
            .get(name)
            .copied()
            .ok_or_else(|| IfoError::Config(format!("unknown account '{}'", name)))
    }

    fn resolve_token(&self, token: &str) -> Result<Address, IfoError> {
        match token {
            "lp" | "raise" => Ok(self.sale.raise_token()),
            "offering" => Ok(self.sale.offering_token()),
            other => other
                .parse()
                .map_err(|e| IfoError::Config(format!("invalid token '{}': {}", other, e))),
        }
    }

    fn execute(&self, step: &Step) -> Result<Option<Allocation>, IfoError> {
        match step {
            Step::Fund { from, amount } => {
                let from = self.resolve(from)?;
                self.tokens.execute(&[Transfer::new(
                    self.sale.offering_token(),
                    from,
                    self.sale.address(),
                    *amount,
                )])?;
                Ok(None)
            }
            Step::Mint { to, token, amount } => {
                let to = self.resolve(to)?;
                let token = self.resolve_token(token)?;
                self.tokens.mint(token, to, *amount)?;
                Ok(None)
            }
            Step::Deposit { user, pool, amount } => {
                self.sale.deposit(self.resolve(user)?, *pool, *amount)?;
                Ok(None)
            }
            Step::Harvest { user, pool } => {
                let allocation = self.sale.harvest(self.resolve(user)?, *pool)?;
                Ok(Some(allocation))
            }
            Step::ConfigurePool {
                caller,
                pool,
                offering_amount,
                raising_amount,
                cap_per_user,
                has_tax,
            } => {
                let terms = PoolConfig {
                    pool_id: *pool,
                    offering_amount: *offering_amount,
                    raising_amount: *raising_amount,
                    cap_per_user: *cap_per_user,
                    has_tax: *has_tax,
                    tax_schedule: None,
                }
                .terms();
                self.sale
                    .configure_pool(self.resolve(caller)?, *pool, terms)?;
                Ok(None)
            }
            Step::UpdateWindow {
                caller,
                start_block,
                end_block,
            } => {
                self.sale
                    .update_sale_window(self.resolve(caller)?, *start_block, *end_block)?;
                Ok(None)
            }
            Step::Withdraw {
                caller,
                lp_amount,
                offering_amount,
            } => {
                self.sale
                    .withdraw(self.resolve(caller)?, *lp_amount, *offering_amount)?;
                Ok(None)
            }
            Step::Recover {
                caller,
                token,
                amount,
            } => {
                let token = self.resolve_token(token)?;
                self.sale
                    .recover_foreign_token(self.resolve(caller)?, token, *amount)?;
                Ok(None)
            }
        }
    }

    fn balance_of(&self, name: &str, address: Address) -> Result<AccountBalance, IfoError> {
        Ok(AccountBalance {
            name: name.to_string(),
            address,
            lp: self.tokens.balance_of(self.sale.raise_token(), address)?,
            offering: self.tokens.balance_of(self.sale.offering_token(), address)?,
        })
    }
}

impl Scenario {
    pub fn from_toml_str(content: &str) -> Result<Self, IfoError> {
        toml::from_str(content).map_err(|e| IfoError::Config(format!("invalid scenario: {}", e)))
    }

    pub fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&content)?)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn resolve_accounts(&self) -> Result<BTreeMap<String, Address>, IfoError> {
        let mut accounts = BTreeMap::new();
        for account in &self.accounts {
            if account.name == SALE_ACCOUNT {
                return Err(IfoError::Config(format!(
                    "account name '{}' is reserved",
                    SALE_ACCOUNT
                )));
            }
            let address = account
                .address
                .unwrap_or_else(|| account_address(&account.name));
            if accounts.insert(account.name.clone(), address).is_some() {
                return Err(IfoError::Config(format!(
                    "account '{}' declared twice",
                    account.name
                )));
            }
        }
        Ok(accounts)
    }

    /// Replay every step. Setup problems are errors; step failures are recorded.
    pub fn run(&self) -> Result<ScenarioReport, IfoError> {
        let accounts = self.resolve_accounts()?;

        let mut config = self.sale.clone();
        if let Some(admin) = &self.admin {
            config.admin = accounts
                .get(admin)
                .copied()
                .ok_or_else(|| IfoError::Config(format!("unknown admin account '{}'", admin)))?;
        }

        let tokens = Arc::new(InMemoryTokenLedger::new());
        for account in &self.accounts {
            let address = accounts
                .get(&account.name)
                .copied()
                .unwrap_or_else(|| account_address(&account.name));
            tokens.mint(config.raise_token, address, account.lp)?;
            tokens.mint(config.offering_token, address, account.offering)?;
        }
        let clock = Arc::new(ManualBlockClock::new(self.initial_block));
        let sale = config.build(tokens.clone(), clock.clone())?;
        info!(
            "Replaying scenario '{}' against sale {} ({} steps)",
            config.name,
            sale.address(),
            self.steps.len()
        );

        let replay = Replay {
            accounts,
            tokens,
            clock,
            sale,
        };

        let mut outcomes = Vec::with_capacity(self.steps.len());
        let mut mismatches = Vec::new();
        for (index, scheduled) in self.steps.iter().enumerate() {
            let current = replay.clock.current_block();
            if scheduled.block < current {
                return Err(IfoError::Config(format!(
                    "step {} at block {} precedes current block {}",
                    index, scheduled.block, current
                )));
            }
            replay.clock.advance_to(scheduled.block);

            let action = scheduled.step.action();
            let result = replay.execute(&scheduled.step);
            let (kind, error, allocation) = match result {
                Ok(allocation) => (EXPECT_OK.to_string(), None, allocation),
                Err(e) => (e.kind().to_string(), Some(e.to_string()), None),
            };
            debug!("step {} [{}] @{} -> {}", index, action, scheduled.block, kind);

            if let Some(expected) = &scheduled.expect {
                if !expected.eq_ignore_ascii_case(&kind) {
                    warn!(
                        "step {} [{}]: expected {}, got {}",
                        index, action, expected, kind
                    );
                    mismatches.push(Mismatch {
                        index,
                        action: action.to_string(),
                        expected: expected.clone(),
                        actual: kind.clone(),
                    });
                }
            }
            outcomes.push(StepOutcome {
                index,
                block: scheduled.block,
                action: action.to_string(),
                result: kind,
                error,
                allocation,
            });
        }

        let pool_count = replay.sale.pool_count()?;
        let pools = (0..pool_count)
            .map(|pid| replay.sale.pool_info(pid))
            .collect::<Result<Vec<_>, _>>()?;
        let mut balances = self
            .accounts
            .iter()
            .map(|a| replay.balance_of(&a.name, replay.resolve(&a.name)?))
            .collect::<Result<Vec<_>, _>>()?;
        balances.push(replay.balance_of(SALE_ACCOUNT, replay.sale.address())?);

        let events = replay.sale.events()?;
        let report = ScenarioReport {
            name: config.name.clone(),
            sale: replay.sale.address(),
            final_block: replay.clock.current_block(),
            outcomes,
            mismatches,
            state_digest: state_digest(&pools, &balances, &events)?,
            pools,
            balances,
            events,
        };
        info!(
            "Scenario '{}' finished: {} steps, {} mismatches",
            report.name,
            report.outcomes.len(),
            report.mismatches.len()
        );
        Ok(report)
    }
}
