//! Checked 256-bit helpers.
//!
//! Order of operations is load-bearing: every ratio is computed as
//! `(a * b) / c` with truncating division, exactly like the EVM contract.

use crate::error::IfoError;
use crate::U256;

/// `a * b / c`, multiply first, floor division.
pub fn mul_div(a: U256, b: U256, c: U256) -> Result<U256, IfoError> {
    if c.is_zero() {
        return Err(IfoError::DivisionByZero);
    }
    let product = a.checked_mul(b).ok_or(IfoError::ArithmeticOverflow)?;
    Ok(product / c)
}

pub fn add(a: U256, b: U256) -> Result<U256, IfoError> {
    a.checked_add(b).ok_or(IfoError::ArithmeticOverflow)
}

pub fn sub(a: U256, b: U256) -> Result<U256, IfoError> {
    a.checked_sub(b).ok_or(IfoError::ArithmeticOverflow)
}
