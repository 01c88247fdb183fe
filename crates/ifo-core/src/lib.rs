// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IFO ENGINE - CORE MODULE
//
// Proportional offering allocation engine for Initial Farm Offering sales.
// Users commit LP (raise token) into fixed-price pools; once the sale ends each
// participant harvests a pro-rata share of the offering token and a refund of
// any oversubscribed (overflow) contribution, minus an optional overflow tax.
// All financial arithmetic uses 256-bit unsigned integers (no floating-point).
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub mod admin;
pub mod allocation;
pub mod auth;
pub mod chain;
pub mod config;
pub mod deployer;
pub mod error;
pub mod events;
pub mod harvest;
pub mod math;
pub mod pool;
pub mod sale;
pub mod scenario;
pub mod tax;
pub mod tokens;
pub mod units;

pub use alloy_primitives::{Address, U256};

pub use allocation::Allocation;
pub use auth::{AdminAction, Authorizer, OperatorSet, SingleOwner};
pub use chain::{BlockOracle, ManualBlockClock};
pub use config::{PoolConfig, SaleConfig};
pub use deployer::SaleFactory;
pub use error::{IfoError, TokenError};
pub use events::SaleEvent;
pub use harvest::ParticipationState;
pub use pool::{Pool, PoolInfo, PoolLedger, SalePhase, SaleWindow, UserPoolPosition};
pub use sale::{SaleInstance, SaleParams};
pub use tax::TaxSchedule;
pub use tokens::{InMemoryTokenLedger, TokenLedger, Transfer};

/// Raise-token and offering-token amounts (wei-style atomic units).
pub type Amount = U256;

/// Pool index inside one sale (the on-chain contract uses `uint8`).
pub type PoolId = u8;

/// Fixed-point precision for allocation fractions and tax rates (1e12 = 100%).
pub const PRECISION: u64 = 1_000_000_000_000;

/// Number of pools a sale exposes unless configured otherwise.
pub const DEFAULT_POOL_COUNT: u8 = 2;

/// Hard upper bound on pools per sale.
pub const MAX_POOL_COUNT: u8 = 16;

/// Maximum distance (in blocks) between factory creation and a sale's end block.
pub const MAX_BUFFER_BLOCKS: u64 = 200_000;

/// `PRECISION` as a 256-bit value.
pub fn precision() -> U256 {
    U256::from(PRECISION)
}
