use std::time::Duration;

use alloy::{
    primitives::{Address, Bytes, B256, U64},
    rpc::{
        client::{ClientBuilder, ReqwestClient},
        types::{BlockNumberOrTag, TransactionInput, TransactionRequest},
    },
    transports::http::reqwest,
};
use serde::Deserialize;
use tempo_swap_common::models::transaction::{EventLog, Inclusion, InclusionStatus};
use tracing::{debug, instrument};

pub mod config;
pub mod errors;
mod retry;

use crate::rpc::{
    config::RPCRetryConfig,
    errors::{RPCError, RpcResultExt},
    retry::RetryPolicy,
};

/// Thin JSON-RPC client for the handful of methods a wallet front end needs.
///
/// Reads are retried according to the configured [`RPCRetryConfig`]; `eth_sendTransaction` is
/// sent exactly once. It is cheap to clone, the inner client is reference counted.
#[derive(Clone, Debug)]
pub struct EthereumRpcClient {
    inner: ReqwestClient,
    retry_policy: RetryPolicy,
    url: String,
}

impl EthereumRpcClient {
    /// Creates a new client for the given RPC URL with the default retry configuration.
    pub fn new(rpc_url: &str) -> Result<Self, RPCError> {
        let url = rpc_url
            .parse()
            .map_err(|e| RPCError::SetupError(format!("Invalid RPC URL {rpc_url}: {e}")))?;

        let http_client = reqwest::ClientBuilder::new()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| RPCError::SetupError(format!("Failed to create HTTP client: {e}")))?;

        let rpc = ClientBuilder::default().http_with_client(http_client, url);

        Ok(Self {
            inner: rpc,
            retry_policy: RPCRetryConfig::default().into(),
            url: rpc_url.to_string(),
        })
    }

    pub fn get_url(&self) -> &str {
        &self.url
    }

    pub fn with_retry(mut self, retry_config: RPCRetryConfig) -> Self {
        self.retry_policy = retry_config.into();
        self
    }

    #[cfg(test)]
    pub(crate) fn with_test_retry(mut self) -> Self {
        self.retry_policy = RetryPolicy::for_testing();
        self
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn chain_id(&self) -> Result<u64, RPCError> {
        let chain_id: U64 = self
            .retry_policy
            .retry_request(|| async {
                self.inner
                    .request_noparams("eth_chainId")
                    .await
            })
            .await
            .rpc_context("Failed to get chain id")?;

        Ok(chain_id.to::<u64>())
    }

    /// Accounts the endpoint is able to sign for. Empty when no wallet is connected.
    #[instrument(level = "debug", skip(self))]
    pub async fn accounts(&self) -> Result<Vec<Address>, RPCError> {
        self.retry_policy
            .retry_request(|| async {
                self.inner
                    .request_noparams("eth_accounts")
                    .await
            })
            .await
            .rpc_context("Failed to list accounts")
    }

    /// Executes a message call against the latest block without creating a transaction.
    /// See https://ethereum.org/en/developers/docs/apis/json-rpc/#eth_call
    #[instrument(level = "debug", skip(self, calldata))]
    pub async fn eth_call(&self, to: Address, calldata: Bytes) -> Result<Bytes, RPCError> {
        let request = TransactionRequest::default()
            .to(to)
            .input(TransactionInput::both(calldata));

        self.retry_policy
            .retry_request(|| async {
                self.inner
                    .request("eth_call", (&request, BlockNumberOrTag::Latest))
                    .await
            })
            .await
            .with_rpc_context(|| format!("Failed to send an eth_call request to {to}"))
    }

    /// Hands a transaction to the endpoint's wallet for signing and broadcast.
    ///
    /// Not retried: a second attempt could prompt the user twice or double-spend.
    #[instrument(level = "debug", skip(self, request))]
    pub async fn send_transaction(&self, request: TransactionRequest) -> Result<B256, RPCError> {
        let tx_hash: B256 = self
            .inner
            .request("eth_sendTransaction", (&request,))
            .await
            .rpc_context("Failed to send transaction")?;
        debug!(%tx_hash, "Transaction accepted by wallet");
        Ok(tx_hash)
    }

    /// Returns the receipt of a mined transaction, `None` while it is still pending.
    #[instrument(level = "debug", skip(self))]
    pub async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<Inclusion>, RPCError> {
        let receipt: Option<RpcReceipt> = self
            .retry_policy
            .retry_request(|| async {
                self.inner
                    .request("eth_getTransactionReceipt", (tx_hash,))
                    .await
            })
            .await
            .with_rpc_context(|| format!("Failed to get receipt for {tx_hash}"))?;

        receipt
            .map(RpcReceipt::into_inclusion)
            .transpose()
    }
}

/// The subset of an `eth_getTransactionReceipt` result the gateway looks at.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: B256,
    block_number: Option<U64>,
    /// Absent on pre-Byzantium receipts, which carry a state root instead.
    status: Option<U64>,
    #[serde(default)]
    logs: Vec<RpcLog>,
}

#[derive(Debug, Deserialize)]
struct RpcLog {
    address: Address,
    topics: Vec<B256>,
    data: Bytes,
}

impl RpcReceipt {
    fn into_inclusion(self) -> Result<Inclusion, RPCError> {
        let status = match self.status.map(|s| s.to::<u64>()) {
            Some(1) => InclusionStatus::Succeeded,
            Some(0) => InclusionStatus::Reverted,
            other => {
                return Err(RPCError::decode(
                    format!("receipt status of {}", self.transaction_hash),
                    format!("unexpected value {other:?}"),
                ))
            }
        };

        Ok(Inclusion {
            tx_hash: self.transaction_hash,
            block_number: self.block_number.map(|n| n.to::<u64>()),
            status,
            logs: self
                .logs
                .into_iter()
                .map(|log| EventLog { address: log.address, topics: log.topics, data: log.data })
                .collect(),
        })
    }
}
