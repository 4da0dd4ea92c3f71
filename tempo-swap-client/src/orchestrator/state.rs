//! Lifecycle of a single pending transaction.
//!
//! ```text
//! Idle -> AwaitingSignature -> Submitted -> Confirmed
//!              |                   \-----> Failed
//!              \-> Idle (rejected, invalid, not accepted)
//! ```
//!
//! Transitions are pure: [`PendingTransaction::apply`] mutates the record and returns the
//! follow-up work the orchestrator must perform, it never performs I/O itself.

use std::time::Duration;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use tempo_swap_common::{
    display::{short_hex, DisplayOption},
    models::{transaction::Inclusion, ActionKind, AllowanceKey, TxHash},
    ActionError,
};
use thiserror::Error;

/// The orchestrator keeps one [`PendingTransaction`] per slot.
///
/// Approvals are keyed by (token, spender), so approving both legs of a liquidity pair are
/// independent slots that may be in flight at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionSlot {
    Approve { token: Address, spender: Address },
    Swap,
    AddLiquidity,
    CreateToken,
}

impl ActionSlot {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionSlot::Approve { .. } => ActionKind::Approve,
            ActionSlot::Swap => ActionKind::Swap,
            ActionSlot::AddLiquidity => ActionKind::AddLiquidity,
            ActionSlot::CreateToken => ActionKind::CreateToken,
        }
    }
}

impl std::fmt::Display for ActionSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionSlot::Approve { token, spender } => {
                write!(f, "approve({} -> {})", short_hex(token), short_hex(spender))
            }
            other => write!(f, "{}", other.kind()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(tag = "status", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TxStatus {
    Idle,
    AwaitingSignature,
    Submitted { tx_hash: TxHash },
    Confirmed { tx_hash: TxHash, block_number: Option<u64> },
    Failed { tx_hash: TxHash },
}

impl TxStatus {
    /// Waiting on the wallet or on the chain.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, TxStatus::AwaitingSignature | TxStatus::Submitted { .. })
    }

    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            TxStatus::Submitted { tx_hash } |
            TxStatus::Confirmed { tx_hash, .. } |
            TxStatus::Failed { tx_hash } => Some(*tx_hash),
            TxStatus::Idle | TxStatus::AwaitingSignature => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Display)]
pub enum TxEvent {
    /// The user asked for the action.
    Trigger,
    /// Local validation failed before anything was sent.
    Invalidated(ActionError),
    /// The wallet declined to sign.
    Rejected(String),
    /// The wallet signed and the network accepted the transaction.
    Signed { tx_hash: TxHash, owner: Address },
    Included(Inclusion),
    Reverted(String),
    GatewayFailed(ActionError),
    TimedOut(Duration),
    Reset,
}

/// Work the orchestrator performs after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Re-read exactly this allowance; it changed on chain.
    RefreshAllowance(AllowanceKey),
    /// Forget this allowance. An approval we stopped waiting for may still be mined, so the
    /// next gating check has to read it again.
    InvalidateAllowance(AllowanceKey),
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{slot}: cannot apply {event} while {status}")]
pub struct InvalidTransition {
    pub slot: ActionSlot,
    pub status: String,
    pub event: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingTransaction {
    pub slot: ActionSlot,
    pub status: TxStatus,
    /// Account that signed, known once the transaction was accepted.
    pub owner: Option<Address>,
    pub last_error: Option<ActionError>,
}

impl PendingTransaction {
    pub fn new(slot: ActionSlot) -> Self {
        Self { slot, status: TxStatus::Idle, owner: None, last_error: None }
    }

    pub fn kind(&self) -> ActionKind {
        self.slot.kind()
    }

    pub fn apply(&mut self, event: TxEvent) -> Result<Vec<Effect>, InvalidTransition> {
        let slot = self.slot;
        let invalid = |status: &TxStatus, event: &TxEvent| InvalidTransition {
            slot,
            status: status.as_ref().to_string(),
            event: event.to_string(),
        };

        let next = match (&self.status, &event) {
            (status, TxEvent::Trigger) if !status.is_in_flight() => {
                self.owner = None;
                self.last_error = None;
                TxStatus::AwaitingSignature
            }
            (status, TxEvent::Reset) if !status.is_in_flight() => {
                self.owner = None;
                self.last_error = None;
                TxStatus::Idle
            }
            (TxStatus::AwaitingSignature, TxEvent::Invalidated(err)) |
            (TxStatus::AwaitingSignature, TxEvent::GatewayFailed(err)) => {
                self.last_error = Some(err.clone());
                TxStatus::Idle
            }
            (TxStatus::AwaitingSignature, TxEvent::Rejected(reason)) => {
                self.last_error = Some(ActionError::UserRejected(reason.clone()));
                TxStatus::Idle
            }
            (TxStatus::AwaitingSignature, TxEvent::Signed { tx_hash, owner }) => {
                self.owner = Some(*owner);
                TxStatus::Submitted { tx_hash: *tx_hash }
            }
            (TxStatus::Submitted { tx_hash }, TxEvent::Included(inclusion))
                if inclusion.tx_hash == *tx_hash =>
            {
                if inclusion.succeeded() {
                    TxStatus::Confirmed { tx_hash: *tx_hash, block_number: inclusion.block_number }
                } else {
                    self.last_error = Some(reverted(inclusion));
                    TxStatus::Failed { tx_hash: *tx_hash }
                }
            }
            (TxStatus::Submitted { tx_hash }, TxEvent::Reverted(reason)) => {
                self.last_error = Some(ActionError::TransactionReverted(reason.clone()));
                TxStatus::Failed { tx_hash: *tx_hash }
            }
            (TxStatus::Submitted { tx_hash }, TxEvent::GatewayFailed(err)) => {
                self.last_error = Some(err.clone());
                TxStatus::Failed { tx_hash: *tx_hash }
            }
            (TxStatus::Submitted { tx_hash }, TxEvent::TimedOut(after)) => {
                self.last_error = Some(ActionError::ConfirmationTimeout(*after));
                TxStatus::Failed { tx_hash: *tx_hash }
            }
            (status, event) => return Err(invalid(status, event)),
        };

        self.status = next;
        Ok(self.effects())
    }

    fn effects(&self) -> Vec<Effect> {
        let ActionSlot::Approve { token, spender } = self.slot else {
            return Vec::new();
        };
        let Some(owner) = self.owner else {
            return Vec::new();
        };
        let key = AllowanceKey::new(owner, token, spender);
        match (&self.status, &self.last_error) {
            (TxStatus::Confirmed { .. }, _) => vec![Effect::RefreshAllowance(key)],
            (TxStatus::Failed { .. }, Some(ActionError::ConfirmationTimeout(_))) => {
                vec![Effect::InvalidateAllowance(key)]
            }
            _ => Vec::new(),
        }
    }
}

/// The error reported for a transaction that was mined but reverted.
pub fn reverted(inclusion: &Inclusion) -> ActionError {
    ActionError::TransactionReverted(format!(
        "transaction {} reverted in block {}",
        inclusion.tx_hash,
        DisplayOption(&inclusion.block_number, "unknown")
    ))
}
