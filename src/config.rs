//! Configuration surface.
//!
//! Command-line flags (with environment fallbacks, clap `env` feature) are
//! resolved against the statically known deployments in
//! [`crate::network::StoreDeployment`] into a [`CheckoutConfig`], the single
//! struct the rest of the crate reads.

use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;
use url::Url;

use crate::network::{Network, StoreDeployment};
use crate::types::EvmAddress;

/// Submit a signed storefront purchase order on the Ronin chain family.
#[derive(Debug, Parser)]
#[command(name = "nft-checkout", version, about)]
pub struct CliArgs {
    /// Path to the payload JSON file. Reads stdin when omitted.
    pub payload: Option<PathBuf>,

    /// Network to purchase on.
    #[arg(long, env = "NETWORK", default_value = "saigon")]
    pub network: String,

    /// JSON-RPC endpoint. Defaults to the network's public endpoint.
    #[arg(long, env = "RPC_URL")]
    pub rpc_url: Option<Url>,

    /// Store contract address. Defaults to the network's known deployment.
    #[arg(long, env = "STORE_ADDRESS")]
    pub store_address: Option<String>,

    /// ERC-20 payment token address. Defaults to the network's known deployment.
    #[arg(long, env = "TOKEN_ADDRESS")]
    pub token_address: Option<String>,

    /// Send transactions with fixed gas ceilings instead of estimating.
    #[arg(long, env = "SKIP_SIMULATION")]
    pub skip_simulation: bool,
}

/// Represents all possible errors of resolving the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    UnknownNetwork(#[from] crate::network::NetworkParseError),
    /// The network has no known deployment and no explicit addresses were
    /// given.
    #[error("No known store deployment on {0}; set --store-address and --token-address")]
    UnknownDeployment(Network),
    #[error("Invalid store address: {0}")]
    InvalidStoreAddress(String),
    #[error("Invalid token address: {0}")]
    InvalidTokenAddress(String),
}

/// Fully resolved configuration for one checkout run.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub network: Network,
    pub rpc_url: Url,
    /// The store contract executing purchases; also the allowance spender.
    pub store_address: EvmAddress,
    /// The ERC-20 token the store charges in.
    pub token_address: EvmAddress,
    /// Decimals of the payment token, for display formatting. Taken from the
    /// known deployment; explicit token addresses assume 18.
    pub token_decimals: u8,
    /// When set, transactions carry fixed gas ceilings instead of being
    /// estimated by the node.
    pub skip_simulation: bool,
}

impl CheckoutConfig {
    /// Resolves CLI arguments into a complete configuration.
    ///
    /// Explicit addresses win over the network's known deployment; a network
    /// without a known deployment requires both addresses.
    pub fn from_args(args: &CliArgs) -> Result<Self, ConfigError> {
        let network = Network::from_str(&args.network)?;
        let deployment = StoreDeployment::by_network(network);

        let store_address = match &args.store_address {
            Some(raw) => EvmAddress::from_str(raw)
                .map_err(|_| ConfigError::InvalidStoreAddress(raw.clone()))?,
            None => {
                deployment
                    .ok_or(ConfigError::UnknownDeployment(network))?
                    .store
            }
        };
        let token_address = match &args.token_address {
            Some(raw) => EvmAddress::from_str(raw)
                .map_err(|_| ConfigError::InvalidTokenAddress(raw.clone()))?,
            None => {
                deployment
                    .ok_or(ConfigError::UnknownDeployment(network))?
                    .token
            }
        };
        let rpc_url = args
            .rpc_url
            .clone()
            .unwrap_or_else(|| network.default_rpc_url());
        let token_decimals = match &args.token_address {
            Some(_) => 18,
            None => deployment.map(|d| d.token_decimals).unwrap_or(18),
        };

        Ok(CheckoutConfig {
            network,
            rpc_url,
            store_address,
            token_address,
            token_decimals,
            skip_simulation: args.skip_simulation,
        })
    }

    /// Configuration for a network's known deployment with all defaults.
    pub fn for_network(network: Network) -> Result<Self, ConfigError> {
        let deployment =
            StoreDeployment::by_network(network).ok_or(ConfigError::UnknownDeployment(network))?;
        Ok(CheckoutConfig {
            network,
            rpc_url: network.default_rpc_url(),
            store_address: deployment.store,
            token_address: deployment.token,
            token_decimals: deployment.token_decimals,
            skip_simulation: false,
        })
    }
}
