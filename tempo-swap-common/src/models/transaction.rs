use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use super::TxHash;

/// A state changing contract call, ready to be signed and broadcast by the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRequest {
    pub to: Address,
    /// ABI encoded function selector and arguments.
    pub calldata: Bytes,
    /// Native value attached to the call, zero for plain token calls.
    pub value: U256,
    /// Explicit gas ceiling. `None` lets the wallet estimate.
    pub gas_limit: Option<u64>,
}

impl CallRequest {
    pub fn new(to: Address, calldata: impl Into<Bytes>) -> Self {
        Self { to, calldata: calldata.into(), value: U256::ZERO, gas_limit: None }
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    /// The 4-byte function selector, if the calldata carries one.
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.calldata
            .get(..4)
            .and_then(|s| s.try_into().ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InclusionStatus {
    Succeeded,
    Reverted,
}

/// A log entry emitted by an included transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/// What the chain reports once a submitted transaction has been mined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inclusion {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub status: InclusionStatus,
    pub logs: Vec<EventLog>,
}

impl Inclusion {
    pub fn succeeded(&self) -> bool {
        self.status == InclusionStatus::Succeeded
    }
}
