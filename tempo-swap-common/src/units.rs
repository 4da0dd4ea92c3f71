//! Exact conversion between user entered decimal strings and token base units.
//!
//! Amounts feed irreversible transfers, so everything here is integer arithmetic on
//! [`BigUint`]. Inputs with more fractional digits than the token supports are rejected rather
//! than truncated.

use alloy_primitives::U256;
use num_bigint::BigUint;

use crate::error::ActionError;

/// Converts a non-negative decimal string into base units of a token with `decimals` precision.
///
/// Accepted forms are `"12"`, `"12.5"`, `"12."` and `".5"`, surrounded by optional whitespace.
/// Signs, exponents, digit separators and excess fractional digits fail with
/// [`ActionError::InvalidAmount`].
pub fn to_base_units(input: &str, decimals: u8) -> Result<BigUint, ActionError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ActionError::InvalidAmount("amount is empty".to_string()));
    }
    if trimmed.starts_with('-') {
        return Err(ActionError::InvalidAmount(format!("negative amount {trimmed:?}")));
    }

    let (whole, fraction) = trimmed
        .split_once('.')
        .unwrap_or((trimmed, ""));
    let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
        return Err(ActionError::InvalidAmount(format!("{trimmed:?} is not a decimal number")));
    }

    let decimals = usize::from(decimals);
    if fraction.len() > decimals {
        return Err(ActionError::InvalidAmount(format!(
            "{trimmed:?} has {} fractional digits, the token supports at most {decimals}",
            fraction.len()
        )));
    }

    let mut digits = String::with_capacity(whole.len() + decimals);
    digits.push_str(whole);
    digits.push_str(fraction);
    digits.extend(std::iter::repeat('0').take(decimals - fraction.len()));

    BigUint::parse_bytes(digits.as_bytes(), 10)
        .ok_or_else(|| ActionError::InvalidAmount(format!("{trimmed:?} is not a decimal number")))
}

/// Renders base units as the shortest decimal string denoting the same value.
pub fn from_base_units(value: &BigUint, decimals: u8) -> String {
    let digits = value.to_str_radix(10);
    let decimals = usize::from(decimals);
    if decimals == 0 {
        return digits;
    }

    let padded = if digits.len() <= decimals {
        format!("{}{digits}", "0".repeat(decimals + 1 - digits.len()))
    } else {
        digits
    };
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{fraction}")
    }
}

/// Narrows an amount to the 256-bit word the EVM works with.
pub fn to_u256(value: &BigUint) -> Result<U256, ActionError> {
    U256::try_from_be_slice(&value.to_bytes_be())
        .ok_or_else(|| ActionError::InvalidAmount(format!("{value} does not fit into 256 bits")))
}

pub fn from_u256(value: U256) -> BigUint {
    BigUint::from_bytes_be(&value.to_be_bytes::<32>())
}
