use alloy::{
    primitives::{Address, U256},
    sol,
    sol_types::SolCall,
};

use crate::RPCError;

// ERC20 interface definition
// Copied from EIP-20: https://eips.ethereum.org/EIPS/eip-20
sol! {
    function symbol() public view returns (string);
    function decimals() public view returns (uint8);
    function balanceOf(address _owner) public view returns (uint256 balance);
    function approve(address _spender, uint256 _value) public returns (bool success);
    function allowance(address _owner, address _spender) public view returns (uint256 remaining);
}

/// Encode balanceOf(address) call
pub fn encode_balance_of(owner: Address) -> Vec<u8> {
    balanceOfCall { _owner: owner }.abi_encode()
}

/// Encode approve(address,uint256) call
pub fn encode_approve(spender: Address, value: U256) -> Vec<u8> {
    approveCall { _spender: spender, _value: value }.abi_encode()
}

/// Encode allowance(address,address) call
pub fn encode_allowance(owner: Address, spender: Address) -> Vec<u8> {
    allowanceCall { _owner: owner, _spender: spender }.abi_encode()
}

/// Encode symbol() call
pub fn encode_symbol() -> Vec<u8> {
    symbolCall {}.abi_encode()
}

/// Encode decimals() call
pub fn encode_decimals() -> Vec<u8> {
    decimalsCall {}.abi_encode()
}

/// Decode symbol() return value
pub fn decode_symbol(data: &[u8]) -> Result<String, RPCError> {
    symbolCall::abi_decode_returns(data).map_err(|e| RPCError::decode("symbol()", e))
}

/// Decode decimals() return value
pub fn decode_decimals(data: &[u8]) -> Result<u8, RPCError> {
    decimalsCall::abi_decode_returns(data).map_err(|e| RPCError::decode("decimals()", e))
}

/// Decode balanceOf(address) return value
pub fn decode_balance_of(data: &[u8]) -> Result<U256, RPCError> {
    balanceOfCall::abi_decode_returns(data).map_err(|e| RPCError::decode("balanceOf()", e))
}

/// Decode allowance(address,address) return value
pub fn decode_allowance(data: &[u8]) -> Result<U256, RPCError> {
    allowanceCall::abi_decode_returns(data).map_err(|e| RPCError::decode("allowance()", e))
}
