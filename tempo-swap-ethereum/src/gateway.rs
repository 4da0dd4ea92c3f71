use alloy::{
    primitives::{Address, Bytes, U256},
    rpc::types::{TransactionInput, TransactionRequest},
};
use async_trait::async_trait;
use tempo_swap_common::{
    models::{
        transaction::{CallRequest, Inclusion},
        TxHash,
    },
    traits::ChainGateway,
    GatewayError,
};
use tracing::{debug, info, instrument, trace};

use crate::rpc::{config::ReceiptPollingConfig, errors::RPCError, EthereumRpcClient};

/// [`ChainGateway`] backed by JSON-RPC endpoints.
///
/// Reads and receipt polling go to the network node. Transactions are handed to the wallet
/// endpoint with `eth_sendTransaction`, which signs them with an account it controls; this
/// process never sees a private key. Both endpoints may be the same node.
#[derive(Clone, Debug)]
pub struct EthereumGateway {
    node: EthereumRpcClient,
    wallet: EthereumRpcClient,
    from: Option<Address>,
    polling: ReceiptPollingConfig,
}

impl EthereumGateway {
    /// Creates a gateway after checking that `node` serves the expected chain.
    pub async fn connect(
        node: EthereumRpcClient,
        wallet: Option<EthereumRpcClient>,
        chain_id: u64,
    ) -> Result<Self, RPCError> {
        let actual = node.chain_id().await?;
        if actual != chain_id {
            return Err(RPCError::ChainMismatch { expected: chain_id, actual });
        }
        info!(chain_id, node = node.get_url(), "Connected to network");

        let wallet = wallet.unwrap_or_else(|| node.clone());
        Ok(Self { node, wallet, from: None, polling: ReceiptPollingConfig::default() })
    }

    /// Sends from `account` instead of the wallet's first account.
    pub fn with_from(mut self, account: Address) -> Self {
        self.from = Some(account);
        self
    }

    pub fn with_receipt_polling(mut self, polling: ReceiptPollingConfig) -> Self {
        self.polling = polling;
        self
    }

    fn build_transaction(&self, from: Address, request: CallRequest) -> TransactionRequest {
        let mut tx = TransactionRequest::default()
            .from(from)
            .to(request.to)
            .input(TransactionInput::both(request.calldata));
        if request.value != U256::ZERO {
            tx = tx.value(request.value);
        }
        if let Some(gas_limit) = request.gas_limit {
            tx = tx.gas_limit(gas_limit);
        }
        tx
    }
}

#[async_trait]
impl ChainGateway for EthereumGateway {
    async fn connected_account(&self) -> Result<Option<Address>, GatewayError> {
        if let Some(from) = self.from {
            return Ok(Some(from));
        }
        let accounts = self.wallet.accounts().await?;
        Ok(accounts.first().copied())
    }

    #[instrument(level = "debug", skip(self, request), fields(to = %request.to))]
    async fn submit(&self, request: CallRequest) -> Result<TxHash, GatewayError> {
        let from = self
            .connected_account()
            .await?
            .ok_or_else(|| GatewayError::Network("Wallet exposes no account to sign with".into()))?;

        let tx = self.build_transaction(from, request);
        Ok(self.wallet.send_transaction(tx).await?)
    }

    #[instrument(level = "debug", skip(self))]
    async fn await_inclusion(&self, tx_hash: TxHash) -> Result<Inclusion, GatewayError> {
        loop {
            if let Some(inclusion) = self.node.transaction_receipt(tx_hash).await? {
                debug!(%tx_hash, block = ?inclusion.block_number, status = ?inclusion.status, "Transaction included");
                return Ok(inclusion);
            }
            trace!(%tx_hash, "Receipt not available yet");
            tokio::time::sleep(self.polling.interval).await;
        }
    }

    async fn read(&self, to: Address, calldata: Bytes) -> Result<Bytes, GatewayError> {
        Ok(self.node.eth_call(to, calldata).await?)
    }
}
