use alloy::{
    primitives::{Address, U256},
    sol,
    sol_types::{SolCall, SolEvent},
};
use serde::{Deserialize, Serialize};
use tempo_swap_common::models::transaction::EventLog;
use tracing::{debug, warn};

sol! {
    function createToken(string name, string symbol, uint256 initialSupply) external returns (address);

    event TokenCreated(
        address indexed tokenAddress,
        string name,
        string symbol,
        uint256 initialSupply,
        address indexed creator
    );
}

/// A token deployed through the token factory, as announced by its `TokenCreated` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedToken {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub initial_supply: U256,
    pub creator: Address,
}

/// Encode createToken(string,string,uint256) call
pub fn encode_create_token(name: &str, symbol: &str, initial_supply: U256) -> Vec<u8> {
    createTokenCall {
        name: name.to_string(),
        symbol: symbol.to_string(),
        initialSupply: initial_supply,
    }
    .abi_encode()
}

/// Finds the first `TokenCreated` event emitted by `factory` among a receipt's logs.
///
/// Logs from other contracts, and factory logs that fail to decode, are skipped.
pub fn decode_token_created(logs: &[EventLog], factory: Address) -> Option<CreatedToken> {
    logs.iter()
        .filter(|log| log.address == factory)
        .filter(|log| log.topics.first() == Some(&TokenCreated::SIGNATURE_HASH))
        .find_map(|log| match TokenCreated::decode_raw_log(log.topics.iter().copied(), &log.data) {
            Ok(event) => {
                debug!(token = %event.tokenAddress, symbol = %event.symbol, "Decoded TokenCreated");
                Some(CreatedToken {
                    address: event.tokenAddress,
                    name: event.name,
                    symbol: event.symbol,
                    initial_supply: event.initialSupply,
                    creator: event.creator,
                })
            }
            Err(e) => {
                warn!(?e, "Failed to decode TokenCreated log");
                None
            }
        })
}
