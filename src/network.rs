//! Network definitions and known storefront deployments.
//!
//! This module defines the supported networks and their chain IDs, and
//! provides statically known store/token deployments per network.

use alloy::primitives::address;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use url::Url;

use crate::types::EvmAddress;

/// Supported networks for the storefront.
///
/// The storefront runs on the Ronin chain family; Saigon is its testnet.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Network {
    /// Saigon testnet (chain ID 2021).
    #[serde(rename = "saigon")]
    Saigon,
    /// Ronin mainnet (chain ID 2020).
    #[serde(rename = "ronin")]
    Ronin,
}

impl Display for Network {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Saigon => write!(f, "saigon"),
            Network::Ronin => write!(f, "ronin"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown network: {0}")]
pub struct NetworkParseError(String);

impl FromStr for Network {
    type Err = NetworkParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "saigon" => Ok(Network::Saigon),
            "ronin" => Ok(Network::Ronin),
            other => Err(NetworkParseError(other.to_string())),
        }
    }
}

impl Network {
    /// Return all known [`Network`] variants.
    pub fn variants() -> &'static [Network] {
        &[Network::Saigon, Network::Ronin]
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Saigon => 2021,
            Network::Ronin => 2020,
        }
    }

    /// Whether the network accepts EIP-1559 fee parameters.
    ///
    /// Ronin-family nodes price transactions with a legacy fixed gas price,
    /// so outbound transactions carry an explicit `gasPrice`.
    pub fn eip1559(&self) -> bool {
        match self {
            Network::Saigon => false,
            Network::Ronin => false,
        }
    }

    /// Public RPC endpoint used when no `RPC_URL` is configured.
    pub fn default_rpc_url(&self) -> Url {
        let url = match self {
            Network::Saigon => "https://saigon-testnet.roninchain.com/rpc",
            Network::Ronin => "https://api.roninchain.com/rpc",
        };
        Url::parse(url).expect("static RPC URL parses")
    }
}

/// A known storefront deployment: the store contract and the ERC-20 token it
/// charges in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreDeployment {
    /// The store contract executing purchases.
    pub store: EvmAddress,
    /// The ERC-20 payment token the store pulls via allowance.
    pub token: EvmAddress,
    /// Decimals of the payment token, for display formatting.
    pub token_decimals: u8,
}

const SAIGON_DEPLOYMENT: StoreDeployment = StoreDeployment {
    store: EvmAddress(address!("0xef5801daea84ff3436881be6039084a907308114")),
    token: EvmAddress(address!("0xcb9d4e04e68b13cf6bdb428a317c9db74a60551b")),
    token_decimals: 18,
};

impl StoreDeployment {
    /// Statically known deployment for the given network, if any.
    ///
    /// Networks without a known deployment require explicit store/token
    /// addresses in the configuration.
    pub fn by_network(network: Network) -> Option<&'static StoreDeployment> {
        match network {
            Network::Saigon => Some(&SAIGON_DEPLOYMENT),
            Network::Ronin => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_parses_case_insensitively() {
        assert_eq!(Network::from_str("Saigon").expect("parses"), Network::Saigon);
        assert_eq!(Network::from_str("RONIN").expect("parses"), Network::Ronin);
        assert!(Network::from_str("base").is_err());
    }

    #[test]
    fn chain_ids_match_ronin_family() {
        assert_eq!(Network::Saigon.chain_id(), 2021);
        assert_eq!(Network::Ronin.chain_id(), 2020);
    }

    #[test]
    fn saigon_has_a_known_deployment() {
        let deployment = StoreDeployment::by_network(Network::Saigon).expect("saigon deployment");
        assert_eq!(deployment.token_decimals, 18);
        assert!(StoreDeployment::by_network(Network::Ronin).is_none());
    }
}
