use std::{collections::HashMap, sync::Arc};

use alloy_primitives::Address;
use tempo_swap_common::{
    models::token::TokenDescriptor, traits::ChainGateway, ActionError, GatewayError,
};
use tempo_swap_ethereum::token_metadata;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

/// Per-session cache of token metadata.
///
/// A token's decimals must be known before any amount in that token can be normalised, so
/// actions resolve their tokens first and [`TokenRegistry::get`] doubles as the "is this token
/// usable yet" check.
pub struct TokenRegistry<G> {
    gateway: Arc<G>,
    native: TokenDescriptor,
    tokens: RwLock<HashMap<Address, TokenDescriptor>>,
}

impl<G: ChainGateway> TokenRegistry<G> {
    pub fn new(gateway: Arc<G>, native: TokenDescriptor) -> Self {
        Self { gateway, native, tokens: RwLock::new(HashMap::new()) }
    }

    /// Returns the cached descriptor, `None` while the token has not been resolved.
    pub async fn get(&self, address: Address) -> Option<TokenDescriptor> {
        if address == self.native.address {
            return Some(self.native.clone());
        }
        self.tokens
            .read()
            .await
            .get(&address)
            .cloned()
    }

    /// Returns the descriptor of `address`, reading `decimals()` and `symbol()` on first use.
    #[instrument(skip(self))]
    pub async fn resolve(&self, address: Address) -> Result<TokenDescriptor, ActionError> {
        if let Some(token) = self.get(address).await {
            return Ok(token);
        }

        let decimals = token_metadata::fetch_decimals(self.gateway.as_ref(), address).await?;
        let symbol = match token_metadata::fetch_symbol(self.gateway.as_ref(), address).await {
            Ok(symbol) => symbol,
            Err(GatewayError::Network(e)) | Err(GatewayError::Reverted { reason: e }) => {
                warn!(error = %e, ?address, "Failed to read symbol, using address as fallback");
                address.to_string()
            }
            Err(e) => return Err(e.into()),
        };

        let token = TokenDescriptor::new(address, decimals, &symbol);
        debug!(%token, decimals, "Resolved token");
        self.tokens
            .write()
            .await
            .insert(address, token.clone());
        Ok(token)
    }

    /// Records a descriptor obtained without reading the token, e.g. one the token factory just
    /// deployed with the default precision.
    pub async fn insert(&self, token: TokenDescriptor) {
        self.tokens
            .write()
            .await
            .insert(token.address, token);
    }
}
