//! Wallet session management.
//!
//! A [`WalletSession`] is the orchestrator's view of the signing wallet:
//! whether an account is connected, whether it sits on the expected chain,
//! and (for the concrete [`RpcWalletSession`]) the signer-backed provider
//! used to submit transactions.

use alloy::network::EthereumWallet;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use std::env;
use std::str::FromStr;
use tracing::instrument;

use crate::config::CheckoutConfig;
use crate::network::Network;
use crate::types::EvmAddress;

/// How the session sources its signing key.
///
/// Selected via the `SIGNER_TYPE` environment variable; absent means
/// `private-key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerType {
    /// A raw secp256k1 key from `EVM_PRIVATE_KEY`.
    PrivateKey,
}

impl FromStr for SignerType {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "private-key" => Ok(SignerType::PrivateKey),
            other => Err(SessionError::UnsupportedSignerType(other.to_string())),
        }
    }
}

/// Represents all possible errors of establishing or using a wallet session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// `SIGNER_TYPE` names a signer this build does not support.
    #[error("Unsupported signer type: {0}")]
    UnsupportedSignerType(String),
    /// `EVM_PRIVATE_KEY` is unset or empty.
    #[error("Missing EVM_PRIVATE_KEY environment variable")]
    MissingPrivateKey,
    /// The private key failed to parse.
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),
    /// The RPC endpoint could not report its chain id.
    #[error("Failed to query chain id: {0}")]
    ChainIdQuery(String),
    /// The endpoint serves a different chain than the configured network.
    #[error("Connected to chain {actual}, expected {expected} ({network})")]
    ChainMismatch {
        actual: u64,
        expected: u64,
        network: Network,
    },
    /// No session has been established yet.
    #[error("Please connect your wallet first")]
    NotConnected,
}

/// The orchestrator's read-only view of a wallet session.
///
/// Kept narrow so tests can stand in a stub; the concrete session adds
/// connect/disconnect and provider access on top.
pub trait WalletSession {
    /// Address of the connected account, if any.
    fn address(&self) -> Option<EvmAddress>;

    /// Whether an account is connected.
    fn is_connected(&self) -> bool {
        self.address().is_some()
    }

    /// Whether the session currently sits on a chain other than the
    /// expected one.
    fn is_wrong_chain(&self) -> bool;

    /// The network purchases are expected to run on.
    fn expected_network(&self) -> Network;
}

struct ConnectedState {
    address: EvmAddress,
    provider: DynProvider,
    chain_id: u64,
}

/// A wallet session backed by a local signer and a JSON-RPC endpoint.
///
/// `connect` builds a signer-wrapped provider and records the endpoint's
/// actual chain id; `switch_to_expected_chain` re-queries it so a node that
/// was pointed elsewhere can be retried without rebuilding the session.
pub struct RpcWalletSession {
    network: Network,
    rpc_url: url::Url,
    connected: Option<ConnectedState>,
    connecting: bool,
}

impl RpcWalletSession {
    pub fn new(config: &CheckoutConfig) -> Self {
        RpcWalletSession {
            network: config.network,
            rpc_url: config.rpc_url.clone(),
            connected: None,
            connecting: false,
        }
    }

    /// Reads the signer configuration from the environment.
    fn signer_from_env() -> Result<PrivateKeySigner, SessionError> {
        let signer_type = match env::var("SIGNER_TYPE") {
            Ok(value) if !value.trim().is_empty() => SignerType::from_str(&value)?,
            _ => SignerType::PrivateKey,
        };
        match signer_type {
            SignerType::PrivateKey => {
                let key = env::var("EVM_PRIVATE_KEY")
                    .ok()
                    .filter(|k| !k.trim().is_empty())
                    .ok_or(SessionError::MissingPrivateKey)?;
                PrivateKeySigner::from_str(key.trim())
                    .map_err(|e| SessionError::InvalidPrivateKey(e.to_string()))
            }
        }
    }

    /// Establishes the session: loads the signer, builds the provider, and
    /// records the endpoint's chain id.
    ///
    /// Connecting to a mismatched chain succeeds; the mismatch is reported
    /// through [`WalletSession::is_wrong_chain`] so the caller can prompt for
    /// a switch before purchasing.
    #[instrument(skip_all, err, fields(network = %self.network))]
    pub async fn connect(&mut self) -> Result<EvmAddress, SessionError> {
        self.connecting = true;
        let result = self.connect_inner().await;
        self.connecting = false;
        result
    }

    async fn connect_inner(&mut self) -> Result<EvmAddress, SessionError> {
        let signer = Self::signer_from_env()?;
        let address = EvmAddress(signer.address());
        let wallet = EthereumWallet::from(signer);
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(self.rpc_url.clone())
            .erased();
        let chain_id = provider
            .get_chain_id()
            .await
            .map_err(|e| SessionError::ChainIdQuery(e.to_string()))?;
        tracing::event!(
            tracing::Level::INFO,
            address = %address,
            chain_id = chain_id,
            "wallet session connected"
        );
        self.connected = Some(ConnectedState {
            address,
            provider,
            chain_id,
        });
        Ok(address)
    }

    /// Drops the session and its provider.
    pub fn disconnect(&mut self) {
        if self.connected.take().is_some() {
            tracing::event!(tracing::Level::INFO, "wallet session disconnected");
        }
    }

    /// Whether a `connect` call is currently in flight.
    pub fn is_connecting(&self) -> bool {
        self.connecting
    }

    /// The signer-backed provider of the connected session.
    pub fn provider(&self) -> Result<&DynProvider, SessionError> {
        self.connected
            .as_ref()
            .map(|state| &state.provider)
            .ok_or(SessionError::NotConnected)
    }

    /// Re-queries the endpoint's chain id and errors unless it now matches
    /// the expected network.
    ///
    /// There is no wallet UI to drive a switch from here; the operator must
    /// point `RPC_URL` at a node on the right chain and retry.
    #[instrument(skip_all, err)]
    pub async fn switch_to_expected_chain(&mut self) -> Result<(), SessionError> {
        let expected = self.network.chain_id();
        let state = self.connected.as_mut().ok_or(SessionError::NotConnected)?;
        let actual = state
            .provider
            .get_chain_id()
            .await
            .map_err(|e| SessionError::ChainIdQuery(e.to_string()))?;
        state.chain_id = actual;
        if actual == expected {
            Ok(())
        } else {
            Err(SessionError::ChainMismatch {
                actual,
                expected,
                network: self.network,
            })
        }
    }
}

impl WalletSession for RpcWalletSession {
    fn address(&self) -> Option<EvmAddress> {
        self.connected.as_ref().map(|state| state.address)
    }

    fn is_wrong_chain(&self) -> bool {
        match &self.connected {
            Some(state) => state.chain_id != self.network.chain_id(),
            None => false,
        }
    }

    fn expected_network(&self) -> Network {
        self.network
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signer_type_parses_and_rejects() {
        assert_eq!(
            SignerType::from_str("private-key").expect("parses"),
            SignerType::PrivateKey
        );
        assert_eq!(
            SignerType::from_str(" Private-Key ").expect("parses"),
            SignerType::PrivateKey
        );
        assert!(matches!(
            SignerType::from_str("ledger"),
            Err(SessionError::UnsupportedSignerType(_))
        ));
    }

    #[test]
    fn disconnected_session_has_no_address_and_no_mismatch() {
        let config = crate::config::CheckoutConfig::for_network(Network::Saigon)
            .expect("saigon config");
        let session = RpcWalletSession::new(&config);
        assert!(session.address().is_none());
        assert!(!session.is_connected());
        assert!(!session.is_wrong_chain());
        assert!(session.provider().is_err());
        assert_eq!(session.expected_network(), Network::Saigon);
    }

    #[test]
    fn chain_mismatch_message_names_both_chains() {
        let error = SessionError::ChainMismatch {
            actual: 1,
            expected: 2021,
            network: Network::Saigon,
        };
        assert_eq!(
            error.to_string(),
            "Connected to chain 1, expected 2021 (saigon)"
        );
    }
}
