//! Shared building blocks of the tempo-swap client.
//!
//! This crate holds everything the transaction orchestrator needs that does not perform I/O:
//! token and transaction models, the decimal <-> base unit normaliser, the error taxonomy and
//! the [`traits::ChainGateway`] capability through which all chain access is routed.

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

pub mod display;
pub mod error;
pub mod models;
pub mod traits;
pub mod units;

pub use alloy_primitives::{Address, Bytes, B256, U256};
pub use error::{ActionError, GatewayError};
