#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

pub mod erc20;
pub mod gateway;
pub mod router;
pub mod rpc;
pub mod token_factory;
pub mod token_metadata;

pub use gateway::EthereumGateway;
pub use rpc::{
    config::{RPCRetryConfig, ReceiptPollingConfig},
    errors::{RPCError, RequestError},
    EthereumRpcClient,
};
pub use token_factory::CreatedToken;
