use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;

use crate::{
    error::GatewayError,
    models::{
        transaction::{CallRequest, Inclusion},
        TxHash,
    },
};

/// The wallet / RPC capability the orchestrator consumes.
///
/// Implementations own signing and network access. The orchestrator never signs: a call handed
/// to [`ChainGateway::submit`] is signed by whatever wallet sits behind the gateway, and a
/// declined signature surfaces as [`GatewayError::UserRejected`].
#[cfg_attr(feature = "test-utils", mockall::automock)]
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// The account transactions are sent from, or `None` if no wallet is connected.
    async fn connected_account(&self) -> Result<Option<Address>, GatewayError>;

    /// Hands a call to the wallet for signing and broadcasts it.
    ///
    /// Returns once the transaction has been accepted by the network, not once it is mined.
    async fn submit(&self, request: CallRequest) -> Result<TxHash, GatewayError>;

    /// Waits until the transaction is included in a block.
    ///
    /// A reverted transaction is reported as an [`Inclusion`] with a reverted status, not as an
    /// error. Implementations do not bound the wait; callers that need a bound apply one.
    async fn await_inclusion(&self, tx_hash: TxHash) -> Result<Inclusion, GatewayError>;

    /// Performs a read-only call against the latest block and returns the raw return data.
    async fn read(&self, to: Address, calldata: Bytes) -> Result<Bytes, GatewayError>;
}
