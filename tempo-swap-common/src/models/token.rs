use std::hash::{Hash, Hasher};

use alloy_primitives::Address;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::{error::ActionError, units};

/// Decimal precision assumed when a token does not tell us otherwise.
pub const DEFAULT_DECIMALS: u8 = 18;

/// A resolved fungible token.
///
/// Two descriptors are equal when their addresses are equal; `symbol` is advisory only.
#[derive(Debug, Clone, Deserialize, Serialize, Eq)]
pub struct TokenDescriptor {
    pub address: Address,
    pub decimals: u8,
    pub symbol: String,
}

impl TokenDescriptor {
    pub fn new(address: Address, decimals: u8, symbol: &str) -> Self {
        Self { address, decimals, symbol: symbol.to_string() }
    }

    /// The network's native accounting token. It has no contract, so it lives at the zero
    /// address.
    pub fn native(symbol: &str, decimals: u8) -> Self {
        Self::new(Address::ZERO, decimals, symbol)
    }

    /// Normalises a user entered decimal string into this token's base units.
    pub fn parse_amount(&self, input: &str) -> Result<BigUint, ActionError> {
        units::to_base_units(input, self.decimals)
    }

    /// Renders base units as a decimal string in this token's precision.
    pub fn format_amount(&self, amount: &BigUint) -> String {
        units::from_base_units(amount, self.decimals)
    }
}

impl PartialEq for TokenDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Hash for TokenDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl std::fmt::Display for TokenDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.symbol, self.address)
    }
}
