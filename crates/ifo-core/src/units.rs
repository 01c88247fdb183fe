//! Amount parsing and display.
//!
//! Accepted input forms:
//! - `"5000000000000000000"` → atomic units
//! - `"0.3 ether"` / `"0.3ether"` → 0.3 × 10^18 atomic units

use crate::error::IfoError;
use crate::U256;
use alloy_primitives::utils::{format_ether, parse_ether};

const ETHER_SUFFIX: &str = "ether";

pub fn parse_amount(input: &str) -> Result<U256, IfoError> {
    let trimmed = input.trim();
    if let Some(value) = trimmed.strip_suffix(ETHER_SUFFIX) {
        return parse_ether(value.trim())
            .map_err(|e| IfoError::Config(format!("invalid ether amount '{}': {}", input, e)));
    }
    U256::from_str_radix(trimmed, 10)
        .map_err(|e| IfoError::Config(format!("invalid amount '{}': {}", input, e)))
}

/// Shorthand for tests and scenarios: whole/decimal ether to atomic units.
pub fn ether(value: &str) -> Result<U256, IfoError> {
    parse_ether(value).map_err(|e| IfoError::Config(format!("invalid ether amount '{}': {}", value, e)))
}

/// Render atomic units as an ether decimal, trailing zeros removed.
pub fn display_ether(amount: U256) -> String {
    let formatted = format_ether(amount);
    if formatted.contains('.') {
        let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
        trimmed.to_string()
    } else {
        formatted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!(parse_amount("42").unwrap(), U256::from(42u64));
        assert_eq!(
            parse_amount("0.3 ether").unwrap(),
            U256::from(300_000_000_000_000_000u64)
        );
        assert_eq!(
            parse_amount("1ether").unwrap(),
            U256::from(1_000_000_000_000_000_000u64)
        );
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("-1").is_err());
    }

    #[test]
    fn test_display_ether() {
        assert_eq!(display_ether(ether("4.455").unwrap()), "4.455");
        assert_eq!(display_ether(ether("50").unwrap()), "50");
        assert_eq!(display_ether(U256::ZERO), "0");
    }
}
