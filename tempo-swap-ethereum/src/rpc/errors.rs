use std::fmt::Display;

use alloy::transports::{RpcError as AlloyRpcError, TransportErrorKind};
use tempo_swap_common::GatewayError;
use thiserror::Error;

/// Alloy RPC error type alias for convenience.
pub(crate) type AlloyError = AlloyRpcError<TransportErrorKind>;

/// EIP-1193 "User Rejected Request".
pub(crate) const USER_REJECTED_CODE: i64 = 4001;
/// Geth's error code for a call that reverted.
pub(crate) const EXECUTION_REVERTED_CODE: i64 = 3;

#[derive(Error, Debug)]
pub struct ReqwestError {
    pub msg: String,
    #[source]
    pub source: AlloyError,
}

impl Display for ReqwestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.msg, self.source)
    }
}

#[derive(Error, Debug)]
pub enum RequestError {
    Reqwest(ReqwestError),
    Other(String),
}

impl Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestError::Reqwest(e) => write!(f, "{}: {}", e.msg, e.source),
            RequestError::Other(e) => write!(f, "{e}"),
        }
    }
}

#[derive(Error, Debug)]
pub enum RPCError {
    #[error("RPC setup error: {0}")]
    SetupError(String),
    #[error("Request error: {0}")]
    RequestError(RequestError),
    #[error("Request rejected by wallet: {0}")]
    Rejected(String),
    #[error("Execution reverted: {0}")]
    Reverted(String),
    #[error("Connected to chain {actual}, expected chain {expected}")]
    ChainMismatch { expected: u64, actual: u64 },
    #[error("Failed to decode {what}: {reason}")]
    DecodeError { what: String, reason: String },
}

impl RPCError {
    /// Wraps an alloy error, lifting wallet rejections and reverts into their own variants.
    pub(crate) fn from_alloy<S: ToString>(msg: S, error: AlloyError) -> Self {
        if let AlloyRpcError::ErrorResp(payload) = &error {
            let message = payload.message.to_string();
            let lowered = message.to_lowercase();
            if payload.code == USER_REJECTED_CODE ||
                lowered.contains("user rejected") ||
                lowered.contains("user denied")
            {
                return RPCError::Rejected(message);
            }
            if payload.code == EXECUTION_REVERTED_CODE || lowered.contains("execution reverted") {
                return RPCError::Reverted(message);
            }
        }
        RPCError::RequestError(RequestError::Reqwest(ReqwestError {
            msg: msg.to_string(),
            source: error,
        }))
    }

    pub(crate) fn decode<W: ToString, R: Display>(what: W, reason: R) -> Self {
        RPCError::DecodeError { what: what.to_string(), reason: reason.to_string() }
    }
}

impl From<RPCError> for GatewayError {
    fn from(value: RPCError) -> Self {
        match value {
            RPCError::Rejected(msg) => GatewayError::UserRejected(msg),
            RPCError::Reverted(reason) => GatewayError::Reverted { reason },
            other => GatewayError::Network(other.to_string()),
        }
    }
}

/// Extension trait for adding RPC context to Results containing Alloy errors.
///
/// Similar to `anyhow::Context`, this converts Alloy RPC errors into `RPCError` with a
/// contextual message.
pub(crate) trait RpcResultExt<T> {
    fn rpc_context<C: Display>(self, context: C) -> Result<T, RPCError>;

    /// Wraps the error with lazily-evaluated context.
    fn with_rpc_context<C: Display, F: FnOnce() -> C>(self, f: F) -> Result<T, RPCError>;
}

impl<T> RpcResultExt<T> for Result<T, AlloyError> {
    fn rpc_context<C: Display>(self, context: C) -> Result<T, RPCError> {
        self.map_err(|e| RPCError::from_alloy(context.to_string(), e))
    }

    fn with_rpc_context<C: Display, F: FnOnce() -> C>(self, f: F) -> Result<T, RPCError> {
        self.map_err(|e| RPCError::from_alloy(f().to_string(), e))
    }
}
