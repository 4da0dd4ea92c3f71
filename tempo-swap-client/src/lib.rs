//! Two-phase (approve, then act) transaction orchestration for a Uniswap-V2 style router on
//! Tempo, plus the `tempo-swap` command line client built on top of it.
#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

pub mod allowance;
pub mod cli;
pub mod config;
pub mod forms;
pub mod orchestrator;
pub mod tokens;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{NetworkConfig, TransactionPolicy};
pub use orchestrator::{Orchestrator, TxReceipt};
