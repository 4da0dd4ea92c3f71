use std::{collections::HashMap, sync::Arc};

use num_bigint::BigUint;
use tempo_swap_common::{
    models::AllowanceKey, traits::ChainGateway, units::from_u256, ActionError,
};
use tempo_swap_ethereum::token_metadata;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Last observed ERC-20 allowances, keyed by (owner, token, spender).
///
/// An entry is created by the first read of its key and only replaced when that same key is
/// invalidated, which the orchestrator does once an approval for it is confirmed.
pub struct AllowanceTracker<G> {
    gateway: Arc<G>,
    cache: RwLock<HashMap<AllowanceKey, BigUint>>,
}

impl<G: ChainGateway> AllowanceTracker<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway, cache: RwLock::new(HashMap::new()) }
    }

    /// Returns the allowance for `key`, reading it from the chain if it is not cached.
    pub async fn get_allowance(&self, key: &AllowanceKey) -> Result<BigUint, ActionError> {
        if let Some(amount) = self.cached(key).await {
            return Ok(amount);
        }
        self.fetch(key).await
    }

    pub async fn cached(&self, key: &AllowanceKey) -> Option<BigUint> {
        self.cache
            .read()
            .await
            .get(key)
            .cloned()
    }

    /// Whether the cached allowance covers `required`.
    ///
    /// An allowance that has not been read yet, or a missing `required` amount, counts as "not
    /// approved" rather than "approved for zero". Never touches the network.
    pub async fn is_sufficient(&self, key: &AllowanceKey, required: Option<&BigUint>) -> bool {
        let Some(required) = required else {
            return false;
        };
        self.cached(key)
            .await
            .is_some_and(|available| &available >= required)
    }

    pub async fn invalidate(&self, key: &AllowanceKey) {
        if self.cache.write().await.remove(key).is_some() {
            debug!(%key, "Invalidated allowance");
        }
    }

    /// Drops the cached value of `key` and reads it again, once.
    #[instrument(skip(self), fields(%key))]
    pub async fn refresh(&self, key: &AllowanceKey) -> Result<BigUint, ActionError> {
        self.invalidate(key).await;
        self.fetch(key).await
    }

    async fn fetch(&self, key: &AllowanceKey) -> Result<BigUint, ActionError> {
        let amount = from_u256(token_metadata::fetch_allowance(self.gateway.as_ref(), key).await?);
        debug!(%key, %amount, "Read allowance");
        self.cache
            .write()
            .await
            .insert(*key, amount.clone());
        Ok(amount)
    }
}
