// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IFO ENGINE - ERRORS
//
// Every rejection is a precondition violation, never a transient fault:
// errors are returned immediately and the ledger is left untouched.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::{Address, PoolId, U256};

/// Failure reported by a token ledger collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    InsufficientBalance {
        token: Address,
        holder: Address,
        balance: U256,
        needed: U256,
    },
    Paused(Address),
    Overflow,
    LockPoisoned,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            TokenError::InsufficientBalance {
                token,
                holder,
                balance,
                needed,
            } => write!(
                f,
                "Insufficient balance of {} for {}: have {}, need {}",
                token, holder, balance, needed
            ),
            TokenError::Paused(token) => write!(f, "Transfers of {} are paused", token),
            TokenError::Overflow => write!(f, "Balance overflow"),
            TokenError::LockPoisoned => write!(f, "Token ledger lock poisoned"),
        }
    }
}

impl std::error::Error for TokenError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IfoError {
    /// Operation attempted before the relevant block (deposit before start, harvest before end).
    TooEarly,
    /// Deposit attempted after the end block.
    TooLate,
    /// Configuration change attempted once the sale has started.
    SaleStarted,
    InvalidPool(PoolId),
    /// Pool exists but has no offering/raising amounts configured.
    PoolNotSet(PoolId),
    InvalidAmount,
    CapExceeded {
        cap: U256,
        requested: U256,
    },
    NotFunded {
        required: U256,
        escrowed: U256,
    },
    AlreadyHarvested,
    NotParticipated,
    ForbiddenToken(Address),
    InvalidToken(String),
    Unauthorized(Address),
    InvalidRange {
        start: u64,
        end: u64,
    },
    /// Pools of one sale imply different prices.
    Inconsistent(String),
    InsufficientBalance {
        token: Address,
        available: U256,
        requested: U256,
    },
    SaleExists(Address),
    Transfer(TokenError),
    ArithmeticOverflow,
    DivisionByZero,
    Config(String),
    LockPoisoned,
}

impl IfoError {
    /// Stable variant name, used by scenario expectations and the CLI.
    pub fn kind(&self) -> &'static str {
        match self {
            IfoError::TooEarly => "TooEarly",
            IfoError::TooLate => "TooLate",
            IfoError::SaleStarted => "SaleStarted",
            IfoError::InvalidPool(_) => "InvalidPool",
            IfoError::PoolNotSet(_) => "PoolNotSet",
            IfoError::InvalidAmount => "InvalidAmount",
            IfoError::CapExceeded { .. } => "CapExceeded",
            IfoError::NotFunded { .. } => "NotFunded",
            IfoError::AlreadyHarvested => "AlreadyHarvested",
            IfoError::NotParticipated => "NotParticipated",
            IfoError::ForbiddenToken(_) => "ForbiddenToken",
            IfoError::InvalidToken(_) => "InvalidToken",
            IfoError::Unauthorized(_) => "Unauthorized",
            IfoError::InvalidRange { .. } => "InvalidRange",
            IfoError::Inconsistent(_) => "Inconsistent",
            IfoError::InsufficientBalance { .. } => "InsufficientBalance",
            IfoError::SaleExists(_) => "SaleExists",
            IfoError::Transfer(_) => "Transfer",
            IfoError::ArithmeticOverflow => "ArithmeticOverflow",
            IfoError::DivisionByZero => "DivisionByZero",
            IfoError::Config(_) => "Config",
            IfoError::LockPoisoned => "LockPoisoned",
        }
    }

    /// True for errors caused by calling an operation in the wrong sale stage.
    pub fn is_phase_error(&self) -> bool {
        matches!(
            self,
            IfoError::TooEarly | IfoError::TooLate | IfoError::SaleStarted
        )
    }
}

impl std::fmt::Display for IfoError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            IfoError::TooEarly => write!(f, "Too early"),
            IfoError::TooLate => write!(f, "Too late"),
            IfoError::SaleStarted => write!(f, "IFO has started"),
            IfoError::InvalidPool(pid) => write!(f, "Non valid pool id: {}", pid),
            IfoError::PoolNotSet(pid) => write!(f, "Pool {} not set", pid),
            IfoError::InvalidAmount => write!(f, "Amount must be > 0"),
            IfoError::CapExceeded { cap, requested } => write!(
                f,
                "New amount above user limit: {} > {}",
                requested, cap
            ),
            IfoError::NotFunded { required, escrowed } => write!(
                f,
                "Tokens not deposited properly: escrowed {}, required {}",
                escrowed, required
            ),
            IfoError::AlreadyHarvested => write!(f, "Already harvested"),
            IfoError::NotParticipated => write!(f, "Did not participate"),
            IfoError::ForbiddenToken(token) => {
                write!(f, "Cannot recover sale token {}", token)
            }
            IfoError::InvalidToken(msg) => write!(f, "Invalid token: {}", msg),
            IfoError::Unauthorized(caller) => write!(f, "Caller {} is not authorized", caller),
            IfoError::InvalidRange { start, end } => {
                write!(f, "Invalid block range: start {} end {}", start, end)
            }
            IfoError::Inconsistent(msg) => write!(f, "Inconsistent pools: {}", msg),
            IfoError::InsufficientBalance {
                token,
                available,
                requested,
            } => write!(
                f,
                "Not enough {} held by sale: available {}, requested {}",
                token, available, requested
            ),
            IfoError::SaleExists(addr) => write!(f, "Sale already deployed at {}", addr),
            IfoError::Transfer(e) => write!(f, "Transfer failed: {}", e),
            IfoError::ArithmeticOverflow => write!(f, "Arithmetic overflow"),
            IfoError::DivisionByZero => write!(f, "Division by zero"),
            IfoError::Config(msg) => write!(f, "Configuration error: {}", msg),
            IfoError::LockPoisoned => write!(f, "Sale lock poisoned"),
        }
    }
}

impl std::error::Error for IfoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IfoError::Transfer(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TokenError> for IfoError {
    fn from(e: TokenError) -> Self {
        IfoError::Transfer(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_grouping() {
        assert!(IfoError::TooEarly.is_phase_error());
        assert!(IfoError::TooLate.is_phase_error());
        assert!(IfoError::SaleStarted.is_phase_error());
        assert!(!IfoError::AlreadyHarvested.is_phase_error());
        assert!(!IfoError::InvalidPool(3).is_phase_error());
    }

    #[test]
    fn test_transfer_error_source() {
        let err: IfoError = TokenError::Paused(Address::ZERO).into();
        assert_eq!(err.kind(), "Transfer");
        assert!(std::error::Error::source(&err).is_some());
    }
}
