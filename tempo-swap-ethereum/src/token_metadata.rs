//! ERC-20 reads routed through a [`ChainGateway`].
//!
//! Metadata reads are forgiving: a token that answers `decimals()` or `symbol()` with data we
//! cannot decode still gets a usable descriptor. Transport failures are never papered over and
//! propagate to the caller.

use alloy::primitives::{Address, U256};
use tempo_swap_common::{
    models::{token::DEFAULT_DECIMALS, AllowanceKey},
    traits::ChainGateway,
    GatewayError,
};
use tracing::{instrument, warn};

use crate::erc20;

/// Longest symbol we keep, in characters. Anything beyond is junk a token chose to return.
const MAX_SYMBOL_CHARS: usize = 64;

#[instrument(level = "debug", skip(gateway))]
pub async fn fetch_decimals<G: ChainGateway + ?Sized>(
    gateway: &G,
    token: Address,
) -> Result<u8, GatewayError> {
    let result = gateway
        .read(token, erc20::encode_decimals().into())
        .await?;

    match erc20::decode_decimals(&result) {
        Ok(decimals) => Ok(decimals),
        Err(e) => {
            warn!(
                ?e,
                ?token,
                "Failed to decode decimals function result, using default decimals {DEFAULT_DECIMALS}"
            );
            Ok(DEFAULT_DECIMALS)
        }
    }
}

#[instrument(level = "debug", skip(gateway))]
pub async fn fetch_symbol<G: ChainGateway + ?Sized>(
    gateway: &G,
    token: Address,
) -> Result<String, GatewayError> {
    let result = gateway
        .read(token, erc20::encode_symbol().into())
        .await?;

    let symbol = match erc20::decode_symbol(&result) {
        Ok(symbol) => symbol
            .replace('\0', "")
            .trim()
            .chars()
            .take(MAX_SYMBOL_CHARS)
            .collect::<String>(),
        Err(e) => {
            warn!(?e, ?token, "Failed to decode symbol function result, using address as fallback");
            return Ok(token.to_string());
        }
    };

    if symbol.is_empty() {
        return Ok(token.to_string());
    }
    Ok(symbol)
}

#[instrument(level = "debug", skip(gateway))]
pub async fn fetch_balance<G: ChainGateway + ?Sized>(
    gateway: &G,
    token: Address,
    owner: Address,
) -> Result<U256, GatewayError> {
    let result = gateway
        .read(token, erc20::encode_balance_of(owner).into())
        .await?;
    Ok(erc20::decode_balance_of(&result)?)
}

/// Reads the amount `key.spender` may currently move out of `key.owner`'s `key.token` balance.
#[instrument(level = "debug", skip(gateway), fields(%key))]
pub async fn fetch_allowance<G: ChainGateway + ?Sized>(
    gateway: &G,
    key: &AllowanceKey,
) -> Result<U256, GatewayError> {
    let result = gateway
        .read(key.token, erc20::encode_allowance(key.owner, key.spender).into())
        .await?;
    Ok(erc20::decode_allowance(&result)?)
}

#[cfg(test)]
mod tests {
    use alloy::{primitives::Bytes, sol_types::SolValue};
    use mockall::predicate::eq;
    use tempo_swap_common::traits::MockChainGateway;

    use super::*;

    const TOKEN: Address = Address::repeat_byte(0x42);

    fn gateway_returning(result: Result<Bytes, GatewayError>) -> MockChainGateway {
        let mut gateway = MockChainGateway::new();
        gateway
            .expect_read()
            .with(eq(TOKEN), mockall::predicate::always())
            .times(1)
            .return_once(move |_, _| result);
        gateway
    }

    #[tokio::test]
    async fn test_fetch_decimals() {
        let gateway = gateway_returning(Ok(U256::from(6)
            .to_be_bytes::<32>()
            .to_vec()
            .into()));

        assert_eq!(fetch_decimals(&gateway, TOKEN).await.unwrap(), 6);
    }

    #[test_log::test(tokio::test)]
    async fn test_fetch_decimals_falls_back_on_garbage() {
        let gateway = gateway_returning(Ok(Bytes::from_static(&[0x01, 0x02])));

        assert_eq!(fetch_decimals(&gateway, TOKEN).await.unwrap(), DEFAULT_DECIMALS);
    }

    #[tokio::test]
    async fn test_fetch_decimals_propagates_network_errors() {
        let gateway = gateway_returning(Err(GatewayError::Network("connection refused".into())));

        assert_eq!(
            fetch_decimals(&gateway, TOKEN).await,
            Err(GatewayError::Network("connection refused".into()))
        );
    }

    #[tokio::test]
    async fn test_fetch_symbol_strips_padding() {
        let encoded = ("ThetaUSD\0\0".to_string(),).abi_encode_params();
        let gateway = gateway_returning(Ok(encoded.into()));

        assert_eq!(fetch_symbol(&gateway, TOKEN).await.unwrap(), "ThetaUSD");
    }

    #[tokio::test]
    async fn test_fetch_symbol_falls_back_to_address() {
        let gateway = gateway_returning(Ok(Bytes::new()));

        assert_eq!(fetch_symbol(&gateway, TOKEN).await.unwrap(), TOKEN.to_string());
    }

    #[tokio::test]
    async fn test_fetch_allowance() {
        let owner = Address::repeat_byte(0x01);
        let spender = Address::repeat_byte(0x02);
        let mut gateway = MockChainGateway::new();
        gateway
            .expect_read()
            .withf(move |to, calldata| {
                *to == TOKEN && calldata[..] == erc20::encode_allowance(owner, spender)[..]
            })
            .return_once(|_, _| Ok(U256::from(1_000u64).to_be_bytes::<32>().to_vec().into()));

        let allowance = fetch_allowance(&gateway, &AllowanceKey::new(owner, TOKEN, spender))
            .await
            .unwrap();

        assert_eq!(allowance, U256::from(1_000u64));
    }
}
