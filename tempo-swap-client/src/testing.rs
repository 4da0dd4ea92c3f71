//! In-memory chain used by the orchestrator scenario tests.
//!
//! Models just enough of an EVM network: ERC-20 `decimals`/`symbol`/`allowance` reads, approvals
//! that update allowances when mined, token factory deployments that emit `TokenCreated`, wallet
//! rejections, reverts and transactions whose inclusion is held back until released.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use alloy::sol_types::{SolCall, SolEvent, SolValue};
use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use tempo_swap_common::{
    models::{
        transaction::{CallRequest, EventLog, Inclusion, InclusionStatus},
        TxHash,
    },
    traits::ChainGateway,
    GatewayError,
};
use tempo_swap_ethereum::{erc20, token_factory};
use tokio::sync::Notify;

use crate::config::NetworkConfig;

pub(crate) const OWNER: Address = Address::repeat_byte(0xaa);
pub(crate) const CUSTOM: Address = Address::repeat_byte(0xc0);
pub(crate) const DEPLOYED: Address = Address::repeat_byte(0xde);

#[derive(Default)]
pub(crate) struct FakeState {
    pub account: Option<Address>,
    pub decimals: HashMap<Address, u8>,
    /// (owner, token, spender) -> amount
    pub allowances: HashMap<(Address, Address, Address), U256>,
    pub submitted: Vec<CallRequest>,
    pub reads: usize,
    pub reject_next: bool,
    pub submit_error: Option<GatewayError>,
    pub revert_on_chain: bool,
    pub hold_inclusions: bool,
    receipts: HashMap<TxHash, Inclusion>,
}

pub(crate) struct FakeChain {
    state: Mutex<FakeState>,
    token_factory: Address,
    release: Notify,
}

impl FakeChain {
    /// A chain with a connected wallet and a 6 decimal custom token.
    pub(crate) fn new(config: &NetworkConfig) -> Arc<Self> {
        let mut state = FakeState { account: Some(OWNER), ..Default::default() };
        state.decimals.insert(CUSTOM, 6);
        Arc::new(Self {
            state: Mutex::new(state),
            token_factory: config.contracts.token_factory,
            release: Notify::new(),
        })
    }

    pub(crate) fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub(crate) fn submitted(&self) -> Vec<CallRequest> {
        self.with(|s| s.submitted.clone())
    }

    /// Lets one held-back transaction be mined.
    pub(crate) fn release_one(&self) {
        self.release.notify_one();
    }

    fn mine(&self, state: &mut FakeState, owner: Address, request: &CallRequest) -> Vec<EventLog> {
        let Some(selector) = request.selector() else {
            return Vec::new();
        };
        if selector == erc20::approveCall::SELECTOR {
            let call = erc20::approveCall::abi_decode(&request.calldata).unwrap();
            state
                .allowances
                .insert((owner, request.to, call._spender), call._value);
        } else if selector == token_factory::createTokenCall::SELECTOR &&
            request.to == self.token_factory
        {
            let call = token_factory::createTokenCall::abi_decode(&request.calldata).unwrap();
            let data = (call.name, call.symbol, call.initialSupply).abi_encode_params();
            return vec![EventLog {
                address: self.token_factory,
                topics: vec![
                    token_factory::TokenCreated::SIGNATURE_HASH,
                    DEPLOYED.into_word(),
                    owner.into_word(),
                ],
                data: data.into(),
            }];
        }
        Vec::new()
    }
}

#[async_trait]
impl ChainGateway for FakeChain {
    async fn connected_account(&self) -> Result<Option<Address>, GatewayError> {
        Ok(self.with(|s| s.account))
    }

    async fn submit(&self, request: CallRequest) -> Result<TxHash, GatewayError> {
        let mut state = self.state.lock().unwrap();
        if std::mem::take(&mut state.reject_next) {
            return Err(GatewayError::UserRejected("User rejected the request.".into()));
        }
        if let Some(err) = state.submit_error.take() {
            return Err(err);
        }
        let owner = state
            .account
            .ok_or_else(|| GatewayError::Network("no account".into()))?;

        state.submitted.push(request.clone());
        let tx_hash = B256::from(U256::from(state.submitted.len()));
        let (status, logs) = if state.revert_on_chain {
            (InclusionStatus::Reverted, Vec::new())
        } else {
            (InclusionStatus::Succeeded, self.mine(&mut state, owner, &request))
        };
        let block_number = Some(100 + state.submitted.len() as u64);
        state
            .receipts
            .insert(tx_hash, Inclusion { tx_hash, block_number, status, logs });
        Ok(tx_hash)
    }

    async fn await_inclusion(&self, tx_hash: TxHash) -> Result<Inclusion, GatewayError> {
        if self.with(|s| s.hold_inclusions) {
            self.release.notified().await;
        }
        self.with(|s| s.receipts.get(&tx_hash).cloned())
            .ok_or_else(|| GatewayError::Network(format!("unknown transaction {tx_hash}")))
    }

    async fn read(&self, to: Address, calldata: Bytes) -> Result<Bytes, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.reads += 1;
        let selector: [u8; 4] = calldata
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .unwrap_or_default();

        let result = if selector == erc20::decimalsCall::SELECTOR {
            let decimals = state.decimals.get(&to).copied().unwrap_or(18);
            U256::from(decimals).abi_encode()
        } else if selector == erc20::symbolCall::SELECTOR {
            (format!("T{}", to.0[0]),).abi_encode_params()
        } else if selector == erc20::allowanceCall::SELECTOR {
            let call = erc20::allowanceCall::abi_decode(&calldata).unwrap();
            state
                .allowances
                .get(&(call._owner, to, call._spender))
                .copied()
                .unwrap_or_default()
                .abi_encode()
        } else {
            return Err(GatewayError::Reverted { reason: "execution reverted".into() });
        };
        Ok(result.into())
    }
}
