use std::{path::PathBuf, sync::Arc, time::Duration};

use alloy_primitives::Address;
use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tempo_swap_common::{
    models::{parse_address, AllowanceKey, SwapDirection},
    units::from_u256,
    ActionError,
};
use tempo_swap_ethereum::{token_metadata, EthereumGateway, EthereumRpcClient};
use tracing::{debug, info};
use tracing_appender::rolling;

use crate::{
    config::NetworkConfig,
    forms::DEFAULT_SUPPLY,
    orchestrator::{Orchestrator, TxReceipt},
};

/// Tempo SWAP - swap tokens, supply liquidity and deploy tokens on Tempo from the command line.
///
/// Transactions are signed by the wallet behind `--wallet-url` (any node or signer exposing
/// `eth_sendTransaction`); this tool never handles private keys. Results are printed to stdout
/// as JSON, logs go to `--log-folder`.
#[derive(Parser, Debug, Clone, PartialEq)]
#[clap(version = env!("CARGO_PKG_VERSION"))]
pub struct CliArgs {
    /// Network config file (YAML). Defaults to the built-in Tempo testnet config.
    #[clap(long, env = "TEMPO_SWAP_CONFIG")]
    config: Option<PathBuf>,

    /// Overrides the config's RPC endpoint.
    #[clap(long, env = "TEMPO_RPC_URL")]
    rpc_url: Option<String>,

    /// Endpoint that signs and sends transactions. Defaults to the RPC endpoint.
    #[clap(long, env = "TEMPO_WALLET_URL")]
    wallet_url: Option<String>,

    /// Send from this account instead of the wallet's first account.
    #[clap(long)]
    from: Option<String>,

    /// Give up waiting for a transaction to be mined after this many seconds. By default the
    /// wait is unbounded.
    #[clap(long)]
    confirmation_timeout: Option<u64>,

    /// After creating a token, read its address from the `TokenCreated` event.
    #[clap(long)]
    decode_created_token: bool,

    /// Enable verbose logging.
    #[clap(long)]
    verbose: bool,

    /// Logging folder path.
    #[clap(long, default_value = "logs")]
    log_folder: String,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
enum Command {
    /// Show a token's symbol and decimals.
    TokenInfo { address: String },
    /// Show how much of a token the spender (default: router) may move for the account.
    Allowance {
        token: String,
        #[clap(long)]
        spender: Option<String>,
    },
    /// Show the account's balance of a token.
    Balance { token: String },
    /// Approve a spender (default: router) for an amount of a token.
    Approve {
        token: String,
        amount: String,
        #[clap(long)]
        spender: Option<String>,
    },
    /// Swap an amount of the base token for a custom token, or back with --reverse.
    Swap {
        custom_token: String,
        amount: String,
        /// Stablecoin used as base token, by name.
        #[clap(long)]
        base: Option<String>,
        /// Sell the custom token for the base token.
        #[clap(long)]
        reverse: bool,
    },
    /// Deposit a base/custom token pair into the router's pool.
    AddLiquidity {
        custom_token: String,
        base_amount: String,
        custom_amount: String,
        #[clap(long)]
        base: Option<String>,
        /// Approve both legs for their amounts first, concurrently.
        #[clap(long)]
        approve: bool,
    },
    /// Deploy a new token through the token factory.
    CreateToken {
        name: String,
        symbol: String,
        #[clap(long, default_value = DEFAULT_SUPPLY)]
        supply: String,
    },
}

impl CliArgs {
    /// Loads the network config and applies command line overrides.
    fn network_config(&self) -> anyhow::Result<NetworkConfig> {
        let mut config = match &self.config {
            Some(path) => NetworkConfig::from_yaml(path)?,
            None => NetworkConfig::tempo_testnet(),
        };
        if let Some(rpc_url) = &self.rpc_url {
            config.rpc_url = rpc_url.clone();
        }
        if let Some(wallet_url) = &self.wallet_url {
            config.wallet_url = Some(wallet_url.clone());
        }
        if let Some(secs) = self.confirmation_timeout {
            config.policy.confirmation_timeout = Some(Duration::from_secs(secs));
        }
        if self.decode_created_token {
            config.policy.decode_created_token = true;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Errors caught before submission say so: the user can fix the input and retry safely.
fn user_error(error: ActionError) -> anyhow::Error {
    if error.is_validation() {
        anyhow!("{} (nothing was sent)", error.user_message())
    } else {
        anyhow!(error.user_message())
    }
}

fn address(input: &str) -> anyhow::Result<Address> {
    parse_address(input).map_err(user_error)
}

fn base_token(config: &NetworkConfig, name: Option<&str>) -> anyhow::Result<Address> {
    let name = name.unwrap_or(&config.default_base);
    config
        .stablecoin(name)
        .map(|s| s.address)
        .ok_or_else(|| {
            let known: Vec<&str> = config
                .stablecoins
                .iter()
                .map(|s| s.name.as_str())
                .collect();
            anyhow!("Unknown base token {name}, expected one of: {}", known.join(", "))
        })
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct AmountView {
    token: Address,
    symbol: String,
    amount: String,
    base_units: String,
}

pub async fn run_cli() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // Setup Logging
    let log_level = if args.verbose { "debug" } else { "info" };
    let (non_blocking, _guard) =
        tracing_appender::non_blocking(rolling::never(&args.log_folder, "tempo-swap.log"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(non_blocking)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set up logging subscriber")?;

    info!("Running with version: {}", option_env!("CARGO_PKG_VERSION").unwrap_or("unknown"));
    let config = args.network_config()?;
    run(args, config).await
}

async fn run(args: CliArgs, config: NetworkConfig) -> anyhow::Result<()> {
    let retry = config.rpc.retry_config();
    let node = EthereumRpcClient::new(&config.rpc_url)?.with_retry(retry.clone());
    let wallet = match &config.wallet_url {
        Some(url) if url != &config.rpc_url => {
            Some(EthereumRpcClient::new(url)?.with_retry(retry))
        }
        _ => None,
    };
    let mut gateway = EthereumGateway::connect(node, wallet, config.chain_id)
        .await
        .with_context(|| format!("Failed to connect to {}", config.name))?
        .with_receipt_polling(config.rpc.receipt_polling());
    if let Some(from) = &args.from {
        gateway = gateway.with_from(address(from)?);
    }
    let gateway = Arc::new(gateway);
    let orchestrator = Orchestrator::new(gateway.clone(), config.clone());
    debug!(network = %config.name, signer = config.signer_url(), "Orchestrator ready");

    match args.command {
        Command::TokenInfo { address: token } => {
            let token = orchestrator
                .tokens()
                .resolve(address(&token)?)
                .await
                .map_err(user_error)?;
            print_json(&token)
        }
        Command::Allowance { token, spender } => {
            let owner = orchestrator.account().await.map_err(user_error)?;
            let spender = match spender {
                Some(spender) => address(&spender)?,
                None => orchestrator.router(),
            };
            let token = orchestrator
                .tokens()
                .resolve(address(&token)?)
                .await
                .map_err(user_error)?;
            let amount = orchestrator
                .allowances()
                .get_allowance(&AllowanceKey::new(owner, token.address, spender))
                .await
                .map_err(user_error)?;
            print_json(&AmountView {
                token: token.address,
                symbol: token.symbol.clone(),
                amount: token.format_amount(&amount),
                base_units: amount.to_string(),
            })
        }
        Command::Balance { token } => {
            let owner = orchestrator.account().await.map_err(user_error)?;
            let token = orchestrator
                .tokens()
                .resolve(address(&token)?)
                .await
                .map_err(user_error)?;
            let balance = token_metadata::fetch_balance(gateway.as_ref(), token.address, owner)
                .await
                .map_err(|e| user_error(e.into()))?;
            let balance = from_u256(balance);
            print_json(&AmountView {
                token: token.address,
                symbol: token.symbol.clone(),
                amount: token.format_amount(&balance),
                base_units: balance.to_string(),
            })
        }
        Command::Approve { token, amount, spender } => {
            let spender = match spender {
                Some(spender) => address(&spender)?,
                None => orchestrator.router(),
            };
            let receipt = orchestrator
                .approve(address(&token)?, spender, &amount)
                .await
                .map_err(user_error)?;
            print_json(&receipt)
        }
        Command::Swap { custom_token, amount, base, reverse } => {
            let base = base_token(&config, base.as_deref())?;
            let direction =
                if reverse { SwapDirection::CustomToBase } else { SwapDirection::BaseToCustom };
            let receipt = orchestrator
                .swap(direction, base, address(&custom_token)?, &amount)
                .await
                .map_err(user_error)?;
            print_json(&receipt)
        }
        Command::AddLiquidity { custom_token, base_amount, custom_amount, base, approve } => {
            let base = base_token(&config, base.as_deref())?;
            let custom = address(&custom_token)?;
            if approve {
                let router = orchestrator.router();
                let (base_receipt, custom_receipt): (TxReceipt, TxReceipt) = futures03::try_join!(
                    orchestrator.approve(base, router, &base_amount),
                    orchestrator.approve(custom, router, &custom_amount),
                )
                .map_err(user_error)?;
                info!(base = %base_receipt.tx_hash, custom = %custom_receipt.tx_hash, "Both legs approved");
            }
            let receipt = orchestrator
                .add_liquidity(base, custom, &base_amount, &custom_amount, None)
                .await
                .map_err(user_error)?;
            print_json(&receipt)
        }
        Command::CreateToken { name, symbol, supply } => {
            let receipt = orchestrator
                .create_token(&name, &symbol, &supply)
                .await
                .map_err(user_error)?;
            print_json(&receipt)
        }
    }
}
