//! Drives user actions through their two on-chain phases.
//!
//! Every action runs the same pipeline: claim the action's slot, validate locally (wallet,
//! token metadata, amount normalisation, allowance gating), hand the call to the wallet and
//! wait for it to be mined. Nothing reaches the gateway's `submit` unless every local check
//! passed, and nothing is ever retried automatically.

pub mod state;

use std::{collections::HashMap, sync::Arc};

use alloy_primitives::{Address, U256};
use num_bigint::BigUint;
use serde::Serialize;
use tempo_swap_common::{
    display::first_line,
    models::{
        token::{TokenDescriptor, DEFAULT_DECIMALS},
        transaction::{CallRequest, Inclusion},
        ActionKind, AllowanceKey, SwapDirection, TxHash,
    },
    traits::ChainGateway,
    units::{to_base_units, to_u256},
    ActionError, GatewayError,
};
use tempo_swap_ethereum::{
    erc20,
    router::{self, AddLiquidity, ExactInputSwap},
    token_factory::{self, CreatedToken},
};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::{
    allowance::AllowanceTracker,
    config::{NetworkConfig, TransactionPolicy},
    orchestrator::state::{ActionSlot, Effect, PendingTransaction, TxEvent, TxStatus},
    tokens::TokenRegistry,
};

/// Outcome of an action that reached the chain and was mined successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxReceipt {
    pub kind: ActionKind,
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    /// Only set when `TokenCreated` decoding is enabled and the event was found.
    pub created_token: Option<CreatedToken>,
}

/// Renderable view of one slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotView {
    pub slot: ActionSlot,
    #[serde(flatten)]
    pub status: TxStatus,
    pub last_error: Option<String>,
}

pub struct Orchestrator<G> {
    gateway: Arc<G>,
    config: NetworkConfig,
    tokens: TokenRegistry<G>,
    allowances: AllowanceTracker<G>,
    slots: Mutex<HashMap<ActionSlot, PendingTransaction>>,
}

impl<G: ChainGateway> Orchestrator<G> {
    pub fn new(gateway: Arc<G>, config: NetworkConfig) -> Self {
        Self {
            tokens: TokenRegistry::new(gateway.clone(), config.native_token()),
            allowances: AllowanceTracker::new(gateway.clone()),
            gateway,
            config,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn policy(&self) -> &TransactionPolicy {
        &self.config.policy
    }

    pub fn tokens(&self) -> &TokenRegistry<G> {
        &self.tokens
    }

    pub fn allowances(&self) -> &AllowanceTracker<G> {
        &self.allowances
    }

    pub fn router(&self) -> Address {
        self.config.contracts.router
    }

    /// The connected account, or `WalletNotConnected`.
    pub async fn account(&self) -> Result<Address, ActionError> {
        self.gateway
            .connected_account()
            .await?
            .ok_or(ActionError::WalletNotConnected)
    }

    pub async fn status(&self, slot: ActionSlot) -> TxStatus {
        self.slots
            .lock()
            .await
            .get(&slot)
            .map(|record| record.status.clone())
            .unwrap_or(TxStatus::Idle)
    }

    pub async fn record(&self, slot: ActionSlot) -> Option<PendingTransaction> {
        self.slots
            .lock()
            .await
            .get(&slot)
            .cloned()
    }

    pub async fn is_in_flight(&self, slot: ActionSlot) -> bool {
        self.status(slot).await.is_in_flight()
    }

    /// Every slot that has been used, in a stable order.
    pub async fn snapshot(&self) -> Vec<SlotView> {
        let slots = self.slots.lock().await;
        let mut views: Vec<SlotView> = slots
            .values()
            .map(|record| SlotView {
                slot: record.slot,
                status: record.status.clone(),
                last_error: record
                    .last_error
                    .as_ref()
                    .map(ActionError::user_message),
            })
            .collect();
        views.sort_by_key(|view| view.slot.to_string());
        views
    }

    /// Returns a finished slot to `Idle`, e.g. when its form is cleared.
    pub async fn reset(&self, slot: ActionSlot) -> Result<(), ActionError> {
        self.transition(slot, TxEvent::Reset)
            .await
    }

    /// Grants `spender` an allowance of `amount` (decimal, in `token`'s precision).
    ///
    /// Overwrites any previous allowance. Once mined, the tracked allowance for
    /// (account, token, spender) is re-read before this returns.
    #[instrument(skip(self))]
    pub async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: &str,
    ) -> Result<TxReceipt, ActionError> {
        let slot = ActionSlot::Approve { token, spender };
        self.transition(slot, TxEvent::Trigger)
            .await?;
        let prepared = self
            .prepare_approve(token, spender, amount)
            .await;
        let inclusion = self.execute(slot, prepared).await?;
        Ok(self.receipt(ActionKind::Approve, &inclusion))
    }

    /// Sells `amount_in` of one side of the (base, custom) pair for the other.
    ///
    /// The router is called with a zero minimum output: the swap accepts any price. Blocked
    /// locally with `InsufficientAllowance` unless the router may already spend `amount_in`.
    #[instrument(skip(self))]
    pub async fn swap(
        &self,
        direction: SwapDirection,
        base: Address,
        custom: Address,
        amount_in: &str,
    ) -> Result<TxReceipt, ActionError> {
        let slot = ActionSlot::Swap;
        self.transition(slot, TxEvent::Trigger)
            .await?;
        let prepared = self
            .prepare_swap(direction, base, custom, amount_in)
            .await;
        let inclusion = self.execute(slot, prepared).await?;
        Ok(self.receipt(ActionKind::Swap, &inclusion))
    }

    /// Deposits both sides of a (base, custom) pair into the router's pool.
    ///
    /// Requires both allowances to the router to cover their amounts. Both minimums are zero
    /// and the gas ceiling always covers the router creating the pair.
    #[instrument(skip(self))]
    pub async fn add_liquidity(
        &self,
        base: Address,
        custom: Address,
        base_amount: &str,
        custom_amount: &str,
        recipient: Option<Address>,
    ) -> Result<TxReceipt, ActionError> {
        let slot = ActionSlot::AddLiquidity;
        self.transition(slot, TxEvent::Trigger)
            .await?;
        let prepared = self
            .prepare_add_liquidity(base, custom, base_amount, custom_amount, recipient)
            .await;
        let inclusion = self.execute(slot, prepared).await?;
        Ok(self.receipt(ActionKind::AddLiquidity, &inclusion))
    }

    /// Deploys a new token through the token factory.
    ///
    /// The supply is normalised with 18 decimals: the token does not exist yet, so its
    /// precision cannot be read.
    #[instrument(skip(self))]
    pub async fn create_token(
        &self,
        name: &str,
        symbol: &str,
        initial_supply: &str,
    ) -> Result<TxReceipt, ActionError> {
        let slot = ActionSlot::CreateToken;
        self.transition(slot, TxEvent::Trigger)
            .await?;
        let prepared = self
            .prepare_create_token(name, symbol, initial_supply)
            .await;
        let inclusion = self.execute(slot, prepared).await?;

        let mut receipt = self.receipt(ActionKind::CreateToken, &inclusion);
        if self.policy().decode_created_token {
            let factory = self.config.contracts.token_factory;
            receipt.created_token = token_factory::decode_token_created(&inclusion.logs, factory);
            match &receipt.created_token {
                Some(created) => {
                    info!(address = %created.address, symbol = %created.symbol, "Token created");
                    self.tokens
                        .insert(TokenDescriptor::new(
                            created.address,
                            DEFAULT_DECIMALS,
                            &created.symbol,
                        ))
                        .await;
                }
                None => warn!(tx_hash = %inclusion.tx_hash, "No TokenCreated event in receipt"),
            }
        }
        Ok(receipt)
    }

    async fn prepare_approve(
        &self,
        token: Address,
        spender: Address,
        amount: &str,
    ) -> Result<(Address, CallRequest), ActionError> {
        let owner = self.account().await?;
        let descriptor = self.tokens.resolve(token).await?;
        let value = to_u256(&descriptor.parse_amount(amount)?)?;
        debug!(%descriptor, %value, "Prepared approval");
        Ok((owner, CallRequest::new(token, erc20::encode_approve(spender, value))))
    }

    async fn prepare_swap(
        &self,
        direction: SwapDirection,
        base: Address,
        custom: Address,
        amount_in: &str,
    ) -> Result<(Address, CallRequest), ActionError> {
        let owner = self.account().await?;
        let (from, to) = direction.order(base, custom);
        let from_token = self.tokens.resolve(from).await?;
        let amount = from_token.parse_amount(amount_in)?;
        self.check_allowance(owner, from, &amount)
            .await?;

        let policy = self.policy();
        let calldata = router::encode_swap_exact_tokens_for_tokens(&ExactInputSwap {
            amount_in: to_u256(&amount)?,
            amount_out_min: U256::from(policy.min_amount_out),
            path: vec![from, to],
            to: owner,
            deadline: U256::from(policy.deadline),
        });
        let request =
            CallRequest::new(self.router(), calldata).with_gas_limit(policy.swap_gas_limit);
        Ok((owner, request))
    }

    async fn prepare_add_liquidity(
        &self,
        base: Address,
        custom: Address,
        base_amount: &str,
        custom_amount: &str,
        recipient: Option<Address>,
    ) -> Result<(Address, CallRequest), ActionError> {
        let owner = self.account().await?;
        let base_token = self.tokens.resolve(base).await?;
        let custom_token = self.tokens.resolve(custom).await?;
        let base_units = base_token.parse_amount(base_amount)?;
        let custom_units = custom_token.parse_amount(custom_amount)?;
        self.check_allowance(owner, base, &base_units)
            .await?;
        self.check_allowance(owner, custom, &custom_units)
            .await?;

        let policy = self.policy();
        let min = U256::from(policy.min_liquidity_amounts);
        let calldata = router::encode_add_liquidity(&AddLiquidity {
            token_a: base,
            token_b: custom,
            amount_a_desired: to_u256(&base_units)?,
            amount_b_desired: to_u256(&custom_units)?,
            amount_a_min: min,
            amount_b_min: min,
            to: recipient.unwrap_or(owner),
            deadline: U256::from(policy.deadline),
        });
        let request = CallRequest::new(self.router(), calldata)
            .with_gas_limit(policy.add_liquidity_gas_limit);
        Ok((owner, request))
    }

    async fn prepare_create_token(
        &self,
        name: &str,
        symbol: &str,
        initial_supply: &str,
    ) -> Result<(Address, CallRequest), ActionError> {
        let owner = self.account().await?;
        let (name, symbol) = (name.trim(), symbol.trim());
        if name.is_empty() || symbol.is_empty() {
            return Err(ActionError::InvalidInput("token name and symbol are required".into()));
        }
        let supply = to_u256(&to_base_units(initial_supply, DEFAULT_DECIMALS)?)?;
        let calldata = token_factory::encode_create_token(name, symbol, supply);
        Ok((owner, CallRequest::new(self.config.contracts.token_factory, calldata)))
    }

    /// Fails with `InsufficientAllowance` unless the router may spend `required` of `token`.
    ///
    /// Reads the allowance once if it was never read; a cached value is trusted until the
    /// approval that changes it is confirmed.
    async fn check_allowance(
        &self,
        owner: Address,
        token: Address,
        required: &BigUint,
    ) -> Result<(), ActionError> {
        let key = AllowanceKey::new(owner, token, self.router());
        let available = self.allowances.get_allowance(&key).await?;
        if self
            .allowances
            .is_sufficient(&key, Some(required))
            .await
        {
            return Ok(());
        }
        Err(ActionError::InsufficientAllowance {
            token,
            spender: key.spender,
            required: required.clone(),
            available: Some(available),
        })
    }

    /// Applies `event` to the slot's record and runs the resulting effects.
    async fn transition(&self, slot: ActionSlot, event: TxEvent) -> Result<(), ActionError> {
        let effects = {
            let mut slots = self.slots.lock().await;
            let record = slots
                .entry(slot)
                .or_insert_with(|| PendingTransaction::new(slot));
            let before = record.status.clone();
            let effects = record.apply(event).map_err(|e| {
                debug!(error = %e, "Rejected transition");
                ActionError::ActionInFlight(slot.kind())
            })?;
            if before != record.status {
                info!(%slot, from = before.as_ref(), to = record.status.as_ref(), "Transaction state changed");
            }
            effects
        };

        for effect in effects {
            match effect {
                Effect::RefreshAllowance(key) => {
                    if let Err(e) = self.allowances.refresh(&key).await {
                        warn!(%key, error = %e, "Failed to refresh allowance after approval");
                    }
                }
                Effect::InvalidateAllowance(key) => {
                    self.allowances.invalidate(&key).await;
                }
            }
        }
        Ok(())
    }

    /// Records the outcome of a step on `slot` and passes `error` through.
    async fn fail(&self, slot: ActionSlot, event: TxEvent, error: ActionError) -> ActionError {
        warn!(%slot, error = %error.user_message(), "Action failed");
        if let Err(e) = self.transition(slot, event).await {
            warn!(%slot, error = %e, "Could not record failure");
        }
        error
    }

    /// Submits a validated call and waits for it to be mined.
    async fn execute(
        &self,
        slot: ActionSlot,
        prepared: Result<(Address, CallRequest), ActionError>,
    ) -> Result<Inclusion, ActionError> {
        let (owner, request) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => return Err(self.fail(slot, TxEvent::Invalidated(e.clone()), e).await),
        };

        let tx_hash = match self.gateway.submit(request).await {
            Ok(tx_hash) => tx_hash,
            Err(GatewayError::UserRejected(reason)) => {
                let reason = first_line(&reason).to_string();
                let error = ActionError::UserRejected(reason.clone());
                return Err(self
                    .fail(slot, TxEvent::Rejected(reason), error)
                    .await);
            }
            Err(e) => {
                let error = ActionError::from(e);
                return Err(self
                    .fail(slot, TxEvent::GatewayFailed(error.clone()), error)
                    .await);
            }
        };
        self.transition(slot, TxEvent::Signed { tx_hash, owner })
            .await?;

        let inclusion = match self.policy().confirmation_timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, self.gateway.await_inclusion(tx_hash)).await {
                    Ok(result) => result,
                    Err(_) => {
                        let error = ActionError::ConfirmationTimeout(limit);
                        return Err(self
                            .fail(slot, TxEvent::TimedOut(limit), error)
                            .await);
                    }
                }
            }
            None => self.gateway.await_inclusion(tx_hash).await,
        };

        match inclusion {
            Ok(inclusion) if inclusion.succeeded() => {
                self.transition(slot, TxEvent::Included(inclusion.clone()))
                    .await?;
                Ok(inclusion)
            }
            Ok(inclusion) => {
                let error = state::reverted(&inclusion);
                Err(self
                    .fail(slot, TxEvent::Included(inclusion), error)
                    .await)
            }
            Err(GatewayError::Reverted { reason }) => {
                let reason = first_line(&reason).to_string();
                let error = ActionError::TransactionReverted(reason.clone());
                Err(self
                    .fail(slot, TxEvent::Reverted(reason), error)
                    .await)
            }
            Err(e) => {
                let error = ActionError::from(e);
                Err(self
                    .fail(slot, TxEvent::GatewayFailed(error.clone()), error)
                    .await)
            }
        }
    }

    fn receipt(&self, kind: ActionKind, inclusion: &Inclusion) -> TxReceipt {
        TxReceipt {
            kind,
            tx_hash: inclusion.tx_hash,
            block_number: inclusion.block_number,
            created_token: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use alloy::sol_types::{SolCall, SolValue};
    use rstest::rstest;
    use tempo_swap_common::traits::MockChainGateway;

    use super::*;
    use crate::testing::{FakeChain, CUSTOM, DEPLOYED, OWNER};

    const ONE_ETHER: u128 = 1_000_000_000_000_000_000;

    fn setup() -> (Arc<FakeChain>, Orchestrator<FakeChain>) {
        setup_with(NetworkConfig::tempo_testnet())
    }

    fn setup_with(config: NetworkConfig) -> (Arc<FakeChain>, Orchestrator<FakeChain>) {
        let chain = FakeChain::new(&config);
        let orchestrator = Orchestrator::new(chain.clone(), config);
        (chain, orchestrator)
    }

    fn base(orchestrator: &Orchestrator<FakeChain>) -> Address {
        orchestrator
            .config()
            .default_base_token()
            .map(|s| s.address)
            .unwrap()
    }

    #[tokio::test]
    async fn test_swap_gated_by_approved_amount() {
        let (chain, orchestrator) = setup();
        let (base, router) = (base(&orchestrator), orchestrator.router());

        orchestrator
            .approve(base, router, "1000")
            .await
            .unwrap();
        let receipt = orchestrator
            .swap(SwapDirection::BaseToCustom, base, CUSTOM, "1000")
            .await
            .unwrap();
        assert_eq!(receipt.kind, ActionKind::Swap);
        assert_eq!(chain.submitted().len(), 2);

        let reads = chain.with(|s| s.reads);
        let err = orchestrator
            .swap(SwapDirection::BaseToCustom, base, CUSTOM, "1000.000001")
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ActionError::InsufficientAllowance {
                token: base,
                spender: router,
                required: BigUint::from(1_000_000_001u64) * BigUint::from(10u64).pow(12),
                available: Some(BigUint::from(1_000u64) * BigUint::from(ONE_ETHER)),
            }
        );
        assert_eq!(chain.submitted().len(), 2);
        assert_eq!(chain.with(|s| s.reads), reads);
        assert_eq!(orchestrator.status(ActionSlot::Swap).await, TxStatus::Idle);
    }

    #[tokio::test]
    async fn test_confirmed_approval_refreshes_allowance() {
        let (_, orchestrator) = setup();
        let router = orchestrator.router();
        let key = AllowanceKey::new(OWNER, CUSTOM, router);

        orchestrator
            .approve(CUSTOM, router, "42.5")
            .await
            .unwrap();

        assert_eq!(
            orchestrator
                .allowances()
                .cached(&key)
                .await,
            Some(BigUint::from(42_500_000u64))
        );
        assert!(matches!(
            orchestrator
                .status(ActionSlot::Approve { token: CUSTOM, spender: router })
                .await,
            TxStatus::Confirmed { block_number: Some(101), .. }
        ));
    }

    #[tokio::test]
    async fn test_swap_calldata() {
        let (chain, orchestrator) = setup();
        let (base, router) = (base(&orchestrator), orchestrator.router());
        orchestrator
            .approve(CUSTOM, router, "5")
            .await
            .unwrap();

        orchestrator
            .swap(SwapDirection::CustomToBase, base, CUSTOM, "5")
            .await
            .unwrap();

        let request = chain.submitted().pop().unwrap();
        let call = router::swapExactTokensForTokensCall::abi_decode(&request.calldata).unwrap();
        assert_eq!(request.to, router);
        assert_eq!(request.gas_limit, Some(2_000_000));
        assert_eq!(call.amountIn, U256::from(5_000_000u64));
        assert_eq!(call.amountOutMin, U256::ZERO);
        assert_eq!(call.path, vec![CUSTOM, base]);
        assert_eq!(call.to, OWNER);
        assert_eq!(call.deadline, U256::from(9_999_999_999u64));
    }

    #[tokio::test]
    async fn test_add_liquidity_after_concurrent_approvals() {
        let (chain, orchestrator) = setup();
        let (base, router) = (base(&orchestrator), orchestrator.router());

        let err = orchestrator
            .add_liquidity(base, CUSTOM, "100", "250", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::InsufficientAllowance { token, .. } if token == base));

        let (base_approval, custom_approval) = tokio::join!(
            orchestrator.approve(base, router, "100"),
            orchestrator.approve(CUSTOM, router, "250"),
        );
        base_approval.unwrap();
        custom_approval.unwrap();

        orchestrator
            .add_liquidity(base, CUSTOM, "100", "250", None)
            .await
            .unwrap();

        let request = chain.submitted().pop().unwrap();
        let call = router::addLiquidityCall::abi_decode(&request.calldata).unwrap();
        assert_eq!(request.gas_limit, Some(9_000_000));
        assert_eq!((call.tokenA, call.tokenB), (base, CUSTOM));
        assert_eq!(call.amountADesired, U256::from(100 * ONE_ETHER));
        assert_eq!(call.amountBDesired, U256::from(250_000_000u64));
        assert_eq!((call.amountAMin, call.amountBMin), (U256::ZERO, U256::ZERO));
        assert_eq!(call.to, OWNER);
    }

    #[tokio::test]
    async fn test_add_liquidity_blocked_by_one_leg() {
        let (chain, orchestrator) = setup();
        let (base, router) = (base(&orchestrator), orchestrator.router());
        orchestrator
            .approve(base, router, "100")
            .await
            .unwrap();
        orchestrator
            .approve(CUSTOM, router, "249.999999")
            .await
            .unwrap();

        let err = orchestrator
            .add_liquidity(base, CUSTOM, "100", "250", None)
            .await
            .unwrap_err();

        assert!(matches!(err, ActionError::InsufficientAllowance { token, .. } if token == CUSTOM));
        assert_eq!(chain.submitted().len(), 2);
    }

    #[tokio::test]
    async fn test_wallet_not_connected() {
        let (chain, orchestrator) = setup();
        chain.with(|s| s.account = None);

        let err = orchestrator
            .approve(CUSTOM, orchestrator.router(), "1")
            .await
            .unwrap_err();

        assert_eq!(err, ActionError::WalletNotConnected);
        assert!(chain.submitted().is_empty());
        let record = orchestrator
            .record(ActionSlot::Approve { token: CUSTOM, spender: orchestrator.router() })
            .await
            .unwrap();
        assert_eq!(record.status, TxStatus::Idle);
        assert_eq!(record.last_error, Some(ActionError::WalletNotConnected));
    }

    #[test_log::test(tokio::test)]
    async fn test_user_rejection_returns_to_idle() {
        let (chain, orchestrator) = setup();
        let router = orchestrator.router();
        chain.with(|s| s.reject_next = true);

        let err = orchestrator
            .approve(CUSTOM, router, "1")
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), "Request cancelled in wallet.");
        assert_eq!(
            orchestrator
                .status(ActionSlot::Approve { token: CUSTOM, spender: router })
                .await,
            TxStatus::Idle
        );
        assert_eq!(
            orchestrator
                .allowances()
                .cached(&AllowanceKey::new(OWNER, CUSTOM, router))
                .await,
            None
        );

        // A rejection is final for that attempt only.
        orchestrator
            .approve(CUSTOM, router, "1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_gateway_error_on_submit() {
        let (chain, orchestrator) = setup();
        chain.with(|s| s.submit_error = Some(GatewayError::Network("connection reset".into())));

        let err = orchestrator
            .create_token("Moon", "MOON", "1")
            .await
            .unwrap_err();

        assert_eq!(err, ActionError::NetworkError("connection reset".into()));
        assert_eq!(orchestrator.status(ActionSlot::CreateToken).await, TxStatus::Idle);
    }

    #[test_log::test(tokio::test)]
    async fn test_reverted_approval_fails_without_refresh() {
        let (chain, orchestrator) = setup();
        let router = orchestrator.router();
        let slot = ActionSlot::Approve { token: CUSTOM, spender: router };
        chain.with(|s| s.revert_on_chain = true);

        let err = orchestrator
            .approve(CUSTOM, router, "1")
            .await
            .unwrap_err();

        assert!(matches!(err, ActionError::TransactionReverted(_)));
        let tx_hash = TxHash::from(U256::from(1u64));
        assert_eq!(orchestrator.status(slot).await, TxStatus::Failed { tx_hash });
        assert_eq!(
            orchestrator
                .allowances()
                .cached(&AllowanceKey::new(OWNER, CUSTOM, router))
                .await,
            None
        );

        chain.with(|s| s.revert_on_chain = false);
        orchestrator
            .approve(CUSTOM, router, "1")
            .await
            .unwrap();
        assert!(matches!(orchestrator.status(slot).await, TxStatus::Confirmed { .. }));
    }

    #[tokio::test]
    async fn test_second_trigger_while_in_flight() {
        let (chain, orchestrator) = setup();
        let orchestrator = Arc::new(orchestrator);
        let router = orchestrator.router();
        let slot = ActionSlot::Approve { token: CUSTOM, spender: router };
        chain.with(|s| s.hold_inclusions = true);

        let first = tokio::spawn({
            let orchestrator = orchestrator.clone();
            async move {
                orchestrator
                    .approve(CUSTOM, router, "10")
                    .await
            }
        });
        while !matches!(orchestrator.status(slot).await, TxStatus::Submitted { .. }) {
            tokio::task::yield_now().await;
        }

        let err = orchestrator
            .approve(CUSTOM, router, "20")
            .await
            .unwrap_err();
        assert_eq!(err, ActionError::ActionInFlight(ActionKind::Approve));
        assert_eq!(
            orchestrator.reset(slot).await,
            Err(ActionError::ActionInFlight(ActionKind::Approve))
        );
        assert_eq!(chain.submitted().len(), 1);

        // Other slots are unaffected.
        assert!(!orchestrator.is_in_flight(ActionSlot::Swap).await);

        chain.release_one();
        first.await.unwrap().unwrap();
        assert!(matches!(orchestrator.status(slot).await, TxStatus::Confirmed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmation_timeout() {
        let mut config = NetworkConfig::tempo_testnet();
        config.policy.confirmation_timeout = Some(Duration::from_secs(30));
        let (chain, orchestrator) = setup_with(config);
        chain.with(|s| s.hold_inclusions = true);

        let err = orchestrator
            .create_token("Moon", "MOON", "1")
            .await
            .unwrap_err();

        assert_eq!(err, ActionError::ConfirmationTimeout(Duration::from_secs(30)));
        assert!(matches!(
            orchestrator.status(ActionSlot::CreateToken).await,
            TxStatus::Failed { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_approval_is_read_again() {
        let mut config = NetworkConfig::tempo_testnet();
        config.policy.confirmation_timeout = Some(Duration::from_secs(30));
        let (chain, orchestrator) = setup_with(config);
        let router = orchestrator.router();
        let key = AllowanceKey::new(OWNER, CUSTOM, router);
        orchestrator
            .approve(CUSTOM, router, "5")
            .await
            .unwrap();
        chain.with(|s| s.hold_inclusions = true);

        let err = orchestrator
            .approve(CUSTOM, router, "50")
            .await
            .unwrap_err();
        assert_eq!(err, ActionError::ConfirmationTimeout(Duration::from_secs(30)));
        assert_eq!(orchestrator.allowances().cached(&key).await, None);

        // The approval was mined after all: gating sees it on the next read.
        chain.with(|s| s.hold_inclusions = false);
        orchestrator
            .swap(SwapDirection::CustomToBase, base(&orchestrator), CUSTOM, "50")
            .await
            .unwrap();
    }

    #[rstest]
    #[case::decoded(true, Some(DEPLOYED))]
    #[case::not_decoded(false, None)]
    #[tokio::test]
    async fn test_create_token(#[case] decode: bool, #[case] expected: Option<Address>) {
        let mut config = NetworkConfig::tempo_testnet();
        config.policy.decode_created_token = decode;
        let factory = config.contracts.token_factory;
        let (chain, orchestrator) = setup_with(config);

        let receipt = orchestrator
            .create_token(" Moon ", "MOON", "1000000")
            .await
            .unwrap();

        assert_eq!(
            receipt
                .created_token
                .as_ref()
                .map(|t| t.address),
            expected
        );
        let request = chain.submitted().pop().unwrap();
        let call = token_factory::createTokenCall::abi_decode(&request.calldata).unwrap();
        assert_eq!(request.to, factory);
        assert_eq!(request.gas_limit, None);
        assert_eq!(call.name, "Moon");
        assert_eq!(call.initialSupply, U256::from(1_000_000 * ONE_ETHER));
        let registered = orchestrator.tokens().get(DEPLOYED).await;
        assert_eq!(registered.as_ref().map(|t| t.address), expected);
        if let Some(created) = receipt.created_token {
            assert_eq!(created.creator, OWNER);
            assert_eq!(created.initial_supply, call.initialSupply);
            let registered = registered.unwrap();
            assert_eq!((registered.decimals, registered.symbol.as_str()), (18, "MOON"));
        }
    }

    #[rstest]
    #[case::missing_name("", "MOON", "1")]
    #[case::blank_symbol("Moon", "  ", "1")]
    #[case::too_precise("Moon", "MOON", "1.0000000000000000001")]
    #[case::negative("Moon", "MOON", "-1")]
    #[tokio::test]
    async fn test_create_token_validation(
        #[case] name: &str,
        #[case] symbol: &str,
        #[case] supply: &str,
    ) {
        let (chain, orchestrator) = setup();

        let err = orchestrator
            .create_token(name, symbol, supply)
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert!(chain.submitted().is_empty());
        assert_eq!(orchestrator.status(ActionSlot::CreateToken).await, TxStatus::Idle);
    }

    #[rstest]
    #[case::too_many_decimals("1.1234567")]
    #[case::not_a_number("1,5")]
    #[case::empty("")]
    #[tokio::test]
    async fn test_invalid_amount(#[case] amount: &str) {
        let (chain, orchestrator) = setup();

        let err = orchestrator
            .approve(CUSTOM, orchestrator.router(), amount)
            .await
            .unwrap_err();

        assert!(matches!(err, ActionError::InvalidAmount(_)));
        assert!(chain.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_and_reset() {
        let (chain, orchestrator) = setup();
        let router = orchestrator.router();
        orchestrator
            .approve(CUSTOM, router, "1")
            .await
            .unwrap();
        chain.with(|s| s.reject_next = true);
        let _ = orchestrator
            .swap(SwapDirection::CustomToBase, base(&orchestrator), CUSTOM, "1")
            .await;

        let snapshot = orchestrator.snapshot().await;

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].slot, ActionSlot::Approve { token: CUSTOM, spender: router });
        assert_eq!(snapshot[1].slot, ActionSlot::Swap);
        assert_eq!(snapshot[1].last_error.as_deref(), Some("Request cancelled in wallet."));
        let json = serde_json::to_value(&snapshot[0]).unwrap();
        assert_eq!(json["status"], "confirmed");
        assert_eq!(json["slot"]["kind"], "approve");

        orchestrator
            .reset(ActionSlot::Approve { token: CUSTOM, spender: router })
            .await
            .unwrap();
        assert_eq!(
            orchestrator
                .status(ActionSlot::Approve { token: CUSTOM, spender: router })
                .await,
            TxStatus::Idle
        );
    }

    #[tokio::test]
    async fn test_unapproved_swap_never_submits() {
        let config = NetworkConfig::tempo_testnet();
        let base = config
            .default_base_token()
            .map(|s| s.address)
            .unwrap();
        let mut gateway = MockChainGateway::new();
        gateway
            .expect_connected_account()
            .returning(|| Ok(Some(OWNER)));
        gateway
            .expect_read()
            .returning(|_, calldata| {
                let result = match &calldata[..4] {
                    s if s == erc20::decimalsCall::SELECTOR => U256::from(18u8).abi_encode(),
                    s if s == erc20::symbolCall::SELECTOR => {
                        ("ThetaUSD".to_string(),).abi_encode_params()
                    }
                    _ => U256::ZERO.abi_encode(),
                };
                Ok(result.into())
            });
        gateway.expect_submit().never();
        let orchestrator = Orchestrator::new(Arc::new(gateway), config);

        let err = orchestrator
            .swap(SwapDirection::BaseToCustom, base, CUSTOM, "1")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ActionError::InsufficientAllowance { available: Some(ref available), .. }
                if *available == BigUint::from(0u8)
        ));
    }
}
