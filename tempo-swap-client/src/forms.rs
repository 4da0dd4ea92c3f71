//! Headless state of the three action forms.
//!
//! Forms hold raw user input and answer "may this button be pressed" by reading orchestrator
//! state. They never submit anything themselves.

use alloy_primitives::Address;
use num_bigint::BigUint;
use tempo_swap_common::{
    models::{parse_address, token::DEFAULT_DECIMALS, AllowanceKey, SwapDirection},
    traits::ChainGateway,
    units::to_base_units,
};

use crate::orchestrator::{state::ActionSlot, Orchestrator};

/// Supply pre-filled in the token creation form.
pub const DEFAULT_SUPPLY: &str = "1000000";

/// Base units of `amount` in `token`, if the token is resolved and the amount is well formed.
async fn required_amount<G: ChainGateway>(
    orchestrator: &Orchestrator<G>,
    token: Address,
    amount: &str,
) -> Option<BigUint> {
    let descriptor = orchestrator.tokens().get(token).await?;
    descriptor.parse_amount(amount).ok()
}

async fn router_may_spend<G: ChainGateway>(
    orchestrator: &Orchestrator<G>,
    owner: Address,
    token: Address,
    amount: &str,
) -> bool {
    let required = required_amount(orchestrator, token, amount).await;
    let key = AllowanceKey::new(owner, token, orchestrator.router());
    orchestrator
        .allowances()
        .is_sufficient(&key, required.as_ref())
        .await
}

async fn approval_in_flight<G: ChainGateway>(orchestrator: &Orchestrator<G>, token: Address) -> bool {
    orchestrator
        .is_in_flight(ActionSlot::Approve { token, spender: orchestrator.router() })
        .await
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapForm {
    pub base_token: Address,
    pub custom_token_address: String,
    pub amount_in: String,
    pub direction: SwapDirection,
}

impl SwapForm {
    pub fn new(base_token: Address) -> Self {
        Self {
            base_token,
            custom_token_address: String::new(),
            amount_in: String::new(),
            direction: SwapDirection::default(),
        }
    }

    /// Swaps the sides of the trade. The amount was denominated in the old input token, so it
    /// is cleared.
    pub fn flip(&mut self) {
        self.direction = self.direction.flipped();
        self.amount_in.clear();
    }

    pub fn custom_token(&self) -> Option<Address> {
        parse_address(&self.custom_token_address).ok()
    }

    /// `[from, to]`, once the custom token address is complete.
    pub fn path(&self) -> Option<[Address; 2]> {
        let (from, to) = self
            .direction
            .order(self.base_token, self.custom_token()?);
        Some([from, to])
    }

    pub fn from_token(&self) -> Option<Address> {
        self.path().map(|[from, _]| from)
    }

    pub fn can_approve(&self) -> bool {
        self.custom_token().is_some() && !self.amount_in.trim().is_empty()
    }

    pub async fn is_approved<G: ChainGateway>(
        &self,
        orchestrator: &Orchestrator<G>,
        owner: Address,
    ) -> bool {
        match self.from_token() {
            Some(from) => router_may_spend(orchestrator, owner, from, &self.amount_in).await,
            None => false,
        }
    }

    pub async fn can_swap<G: ChainGateway>(
        &self,
        orchestrator: &Orchestrator<G>,
        owner: Address,
    ) -> bool {
        self.is_approved(orchestrator, owner).await &&
            !orchestrator
                .is_in_flight(ActionSlot::Swap)
                .await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidityForm {
    pub base_token: Address,
    pub custom_token_address: String,
    pub base_amount: String,
    pub custom_amount: String,
}

impl LiquidityForm {
    pub fn new(base_token: Address) -> Self {
        Self {
            base_token,
            custom_token_address: String::new(),
            base_amount: String::new(),
            custom_amount: String::new(),
        }
    }

    pub fn custom_token(&self) -> Option<Address> {
        parse_address(&self.custom_token_address).ok()
    }

    pub async fn base_approved<G: ChainGateway>(
        &self,
        orchestrator: &Orchestrator<G>,
        owner: Address,
    ) -> bool {
        router_may_spend(orchestrator, owner, self.base_token, &self.base_amount).await
    }

    pub async fn custom_approved<G: ChainGateway>(
        &self,
        orchestrator: &Orchestrator<G>,
        owner: Address,
    ) -> bool {
        match self.custom_token() {
            Some(custom) => router_may_spend(orchestrator, owner, custom, &self.custom_amount).await,
            None => false,
        }
    }

    /// Both legs approved for their amounts, and neither approval nor a previous deposit still
    /// pending.
    pub async fn can_add_liquidity<G: ChainGateway>(
        &self,
        orchestrator: &Orchestrator<G>,
        owner: Address,
    ) -> bool {
        let Some(custom) = self.custom_token() else {
            return false;
        };
        self.base_approved(orchestrator, owner).await &&
            self.custom_approved(orchestrator, owner)
                .await &&
            !approval_in_flight(orchestrator, self.base_token).await &&
            !approval_in_flight(orchestrator, custom).await &&
            !orchestrator
                .is_in_flight(ActionSlot::AddLiquidity)
                .await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTokenForm {
    pub name: String,
    pub symbol: String,
    pub supply: String,
}

impl Default for CreateTokenForm {
    fn default() -> Self {
        Self { name: String::new(), symbol: String::new(), supply: DEFAULT_SUPPLY.to_string() }
    }
}

impl CreateTokenForm {
    pub fn can_deploy(&self) -> bool {
        !self.name.trim().is_empty() &&
            !self.symbol.trim().is_empty() &&
            to_base_units(&self.supply, DEFAULT_DECIMALS).is_ok()
    }
}
