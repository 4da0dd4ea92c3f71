pub mod token;
pub mod transaction;

use std::str::FromStr;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::ActionError;

/// Transaction hash literal type to uniquely identify a transaction in the chain.
pub type TxHash = alloy_primitives::B256;

/// The four user-facing actions the orchestrator knows how to drive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionKind {
    Approve,
    Swap,
    AddLiquidity,
    CreateToken,
}

/// Which side of a base/custom token pair is being sold.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SwapDirection {
    #[default]
    BaseToCustom,
    CustomToBase,
}

impl SwapDirection {
    pub fn flipped(self) -> Self {
        match self {
            SwapDirection::BaseToCustom => SwapDirection::CustomToBase,
            SwapDirection::CustomToBase => SwapDirection::BaseToCustom,
        }
    }

    /// Orders a (base, custom) pair into the (from, to) hop of a swap.
    pub fn order<T>(self, base: T, custom: T) -> (T, T) {
        match self {
            SwapDirection::BaseToCustom => (base, custom),
            SwapDirection::CustomToBase => (custom, base),
        }
    }
}

/// Identifies one ERC-20 allowance: `owner` lets `spender` move `token`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AllowanceKey {
    pub owner: Address,
    pub token: Address,
    pub spender: Address,
}

impl AllowanceKey {
    pub fn new(owner: Address, token: Address, spender: Address) -> Self {
        Self { owner, token, spender }
    }
}

impl std::fmt::Display for AllowanceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{} -> {}]", self.token, self.owner, self.spender)
    }
}

/// Parses a user supplied `0x`-prefixed, 40 hex digit address in any letter case.
///
/// Checksums are not enforced: addresses are compared as 20-byte values.
pub fn parse_address(input: &str) -> Result<Address, ActionError> {
    let trimmed = input.trim();
    let well_formed = trimmed.len() == 42 &&
        (trimmed.starts_with("0x") || trimmed.starts_with("0X")) &&
        trimmed[2..]
            .bytes()
            .all(|b| b.is_ascii_hexdigit());
    if !well_formed {
        return Err(ActionError::InvalidInput(format!("not a valid address: {trimmed:?}")));
    }
    Address::from_str(&trimmed[2..])
        .map_err(|e| ActionError::InvalidInput(format!("not a valid address {trimmed:?}: {e}")))
}
