use std::time::Duration;

use alloy_primitives::Address;
use num_bigint::BigUint;
use thiserror::Error;

use crate::{
    display::{first_line, DisplayOption},
    models::ActionKind,
};

/// Failures reported by a [`crate::traits::ChainGateway`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The wallet declined to sign. Not a system failure.
    #[error("User rejected the request: {0}")]
    UserRejected(String),
    /// The transaction (or its pre-flight simulation) reverted.
    #[error("Execution reverted: {reason}")]
    Reverted { reason: String },
    /// The endpoint could not be reached or answered with an error.
    #[error("Gateway request failed: {0}")]
    Network(String),
}

/// Everything that can go wrong while driving a user action.
///
/// `InvalidAmount`, `InsufficientAllowance`, `WalletNotConnected`, `ActionInFlight`,
/// `TokenNotResolved` and `InvalidInput` are raised before anything is sent to the network.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error(
        "Insufficient allowance of {token} for spender {spender}: required {required}, approved {}",
        DisplayOption(.available, "nothing yet")
    )]
    InsufficientAllowance {
        token: Address,
        spender: Address,
        required: BigUint,
        available: Option<BigUint>,
    },

    #[error("Request cancelled in wallet: {0}")]
    UserRejected(String),

    #[error("Transaction reverted: {0}")]
    TransactionReverted(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("No wallet connected")]
    WalletNotConnected,

    #[error("A {0} transaction is already awaiting signature or confirmation")]
    ActionInFlight(ActionKind),

    #[error("Token {0} has not been resolved yet")]
    TokenNotResolved(Address),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Transaction not confirmed within {0:?}")]
    ConfirmationTimeout(Duration),
}

impl ActionError {
    /// Message suitable for showing to the user: the first line only, and a neutral wording for
    /// wallet rejections.
    pub fn user_message(&self) -> String {
        match self {
            ActionError::UserRejected(_) => "Request cancelled in wallet.".to_string(),
            other => first_line(&other.to_string()).to_string(),
        }
    }

    /// Whether the error was detected locally, before anything reached the network.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ActionError::InvalidAmount(_) |
                ActionError::InsufficientAllowance { .. } |
                ActionError::WalletNotConnected |
                ActionError::ActionInFlight(_) |
                ActionError::TokenNotResolved(_) |
                ActionError::InvalidInput(_)
        )
    }
}

impl From<GatewayError> for ActionError {
    fn from(value: GatewayError) -> Self {
        match value {
            GatewayError::UserRejected(msg) => ActionError::UserRejected(first_line(&msg).into()),
            GatewayError::Reverted { reason } => {
                ActionError::TransactionReverted(first_line(&reason).into())
            }
            GatewayError::Network(msg) => ActionError::NetworkError(first_line(&msg).into()),
        }
    }
}
