//! Static network configuration: chain identity, endpoints, contract addresses, the well-known
//! base tokens and the transaction policy applied to every call the orchestrator builds.

use std::{fs, path::Path, time::Duration};

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};
use tempo_swap_common::models::token::{TokenDescriptor, DEFAULT_DECIMALS};
use tempo_swap_ethereum::{RPCRetryConfig, ReceiptPollingConfig};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub symbol: String,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

fn default_decimals() -> u8 {
    DEFAULT_DECIMALS
}

/// Addresses of the already deployed contracts the client talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contracts {
    pub factory: Address,
    pub router: Address,
    pub wrapped_native: Address,
    pub token_factory: Address,
}

/// A well-known token offered as the base side of swaps and pools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stablecoin {
    pub name: String,
    pub address: Address,
}

/// Knobs applied to every call the orchestrator builds.
///
/// The defaults reproduce the deployed front end's deliberate choices: the deadline is a fixed
/// timestamp far in the future because the network clock cannot be trusted, and every minimum
/// output is zero, i.e. swaps and liquidity provision accept unlimited slippage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionPolicy {
    /// Unix timestamp passed as `deadline` to the router.
    pub deadline: u64,
    /// `amountOutMin` of swaps, in base units of the output token.
    pub min_amount_out: u128,
    /// `amountAMin` and `amountBMin` of liquidity provision.
    pub min_liquidity_amounts: u128,
    pub swap_gas_limit: u64,
    /// Sized for the worst case, where the router deploys the pair contract on first deposit.
    pub add_liquidity_gas_limit: u64,
    /// Upper bound on waiting for a submitted transaction to be mined. `None` waits forever.
    #[serde(rename = "confirmation_timeout_secs", with = "optional_secs")]
    pub confirmation_timeout: Option<Duration>,
    /// Recover the new token's address from the `TokenCreated` event after deployment.
    pub decode_created_token: bool,
}

impl Default for TransactionPolicy {
    fn default() -> Self {
        Self {
            deadline: 9_999_999_999,
            min_amount_out: 0,
            min_liquidity_amounts: 0,
            swap_gas_limit: 2_000_000,
            add_liquidity_gas_limit: 9_000_000,
            confirmation_timeout: None,
            decode_created_token: false,
        }
    }
}

mod optional_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}

/// How hard the client tries against the node before giving up on a read, and how often it
/// asks whether a submitted transaction was mined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcSettings {
    pub retry_initial_backoff_ms: u64,
    pub retry_multiplier: f64,
    pub retry_max_backoff_ms: u64,
    /// Total time spent retrying a single read.
    pub retry_max_elapsed_secs: u64,
    pub receipt_poll_interval_ms: u64,
}

impl Default for RpcSettings {
    fn default() -> Self {
        let retry = RPCRetryConfig::default();
        Self {
            retry_initial_backoff_ms: retry.initial_backoff.as_millis() as u64,
            retry_multiplier: retry.multiplier,
            retry_max_backoff_ms: retry.max_backoff.as_millis() as u64,
            retry_max_elapsed_secs: retry.max_elapsed.as_secs(),
            receipt_poll_interval_ms: ReceiptPollingConfig::default()
                .interval
                .as_millis() as u64,
        }
    }
}

impl RpcSettings {
    pub fn retry_config(&self) -> RPCRetryConfig {
        RPCRetryConfig::new(
            Duration::from_millis(self.retry_initial_backoff_ms),
            self.retry_multiplier,
            Duration::from_millis(self.retry_max_backoff_ms),
            Duration::from_secs(self.retry_max_elapsed_secs),
        )
    }

    pub fn receipt_polling(&self) -> ReceiptPollingConfig {
        ReceiptPollingConfig { interval: Duration::from_millis(self.receipt_poll_interval_ms) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
    /// Endpoint that signs transactions. Falls back to `rpc_url`.
    #[serde(default)]
    pub wallet_url: Option<String>,
    pub native_currency: NativeCurrency,
    pub contracts: Contracts,
    /// Ordered: the order is the order base tokens are offered in.
    pub stablecoins: Vec<Stablecoin>,
    /// Name of the stablecoin used as base token when none is chosen.
    pub default_base: String,
    #[serde(default)]
    pub policy: TransactionPolicy,
    #[serde(default)]
    pub rpc: RpcSettings,
}

impl NetworkConfig {
    /// The Tempo testnet deployment.
    pub fn tempo_testnet() -> Self {
        Self {
            chain_id: 42429,
            name: "Tempo Testnet".to_string(),
            rpc_url: "https://rpc.testnet.tempo.xyz".to_string(),
            wallet_url: None,
            native_currency: NativeCurrency { symbol: "USD".to_string(), decimals: 18 },
            contracts: Contracts {
                factory: address!("7332A00364F08f44ffFD3fFde3C98df788809A96"),
                router: address!("1cdAbff6825cb20648f58e6d1461A0F2bdd90a17"),
                wrapped_native: address!("395481387C5C95eAE2531C3A804f60de7EC55150"),
                token_factory: address!("38BD332e1055aECD0c034CE6a5A4631b3c62Fbb4"),
            },
            stablecoins: vec![
                Stablecoin {
                    name: "PathUSD".to_string(),
                    address: address!("20c0000000000000000000000000000000000000"),
                },
                Stablecoin {
                    name: "AlphaUSD".to_string(),
                    address: address!("20c0000000000000000000000000000000000001"),
                },
                Stablecoin {
                    name: "BetaUSD".to_string(),
                    address: address!("20C0000000000000000000000000000000000002"),
                },
                Stablecoin {
                    name: "ThetaUSD".to_string(),
                    address: address!("20c0000000000000000000000000000000000003"),
                },
            ],
            default_base: "ThetaUSD".to_string(),
            policy: TransactionPolicy::default(),
            rpc: RpcSettings::default(),
        }
    }

    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: NetworkConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain_id == 0 {
            return Err(ConfigError::Invalid("chain_id must not be zero".into()));
        }
        for (field, value) in
            std::iter::once(("rpc_url", &self.rpc_url)).chain(self.wallet_url.iter().map(|w| ("wallet_url", w)))
        {
            url::Url::parse(value)
                .map_err(|e| ConfigError::Invalid(format!("{field} {value:?} is not a URL: {e}")))?;
        }

        let contracts = [
            ("factory", self.contracts.factory),
            ("router", self.contracts.router),
            ("wrapped_native", self.contracts.wrapped_native),
            ("token_factory", self.contracts.token_factory),
        ];
        for (i, (name, address)) in contracts.iter().enumerate() {
            if address.is_zero() {
                return Err(ConfigError::Invalid(format!("contracts.{name} is the zero address")));
            }
            if let Some((other, _)) = contracts[..i]
                .iter()
                .find(|(_, a)| a == address)
            {
                return Err(ConfigError::Invalid(format!(
                    "contracts.{name} and contracts.{other} share the address {address}"
                )));
            }
        }

        if self.rpc.retry_multiplier < 1.0 {
            return Err(ConfigError::Invalid("rpc.retry_multiplier must be at least 1".into()));
        }
        if self.rpc.receipt_poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("rpc.receipt_poll_interval_ms must not be zero".into()));
        }

        if self.stablecoins.is_empty() {
            return Err(ConfigError::Invalid("at least one stablecoin is required".into()));
        }
        if self.stablecoin(&self.default_base).is_none() {
            return Err(ConfigError::Invalid(format!(
                "default_base {} is not a configured stablecoin",
                self.default_base
            )));
        }
        Ok(())
    }

    /// Looks a stablecoin up by name, ignoring case.
    pub fn stablecoin(&self, name: &str) -> Option<&Stablecoin> {
        self.stablecoins
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn default_base_token(&self) -> Option<&Stablecoin> {
        self.stablecoin(&self.default_base)
    }

    /// The URL transactions are sent to for signing.
    pub fn signer_url(&self) -> &str {
        self.wallet_url
            .as_deref()
            .unwrap_or(&self.rpc_url)
    }

    pub fn native_token(&self) -> TokenDescriptor {
        TokenDescriptor::native(&self.native_currency.symbol, self.native_currency.decimals)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::tempo_testnet()
    }
}
