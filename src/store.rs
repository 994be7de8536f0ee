//! On-chain surface of the storefront: the ERC-20 payment token and the
//! store contract, behind the [`StoreClient`] trait.
//!
//! [`OnchainStoreClient`] is the live implementation using Alloy contract
//! bindings. `approve` and `execute_purchase` send the transaction and wait
//! for its receipt; a reverted receipt is an error, not a success with a flag.

use alloy::network::Ethereum;
use alloy::primitives::{Address, Bytes, FixedBytes, U256};
use alloy::providers::Provider;
use alloy::sol;
use std::future::IntoFuture;
use std::str::FromStr;
use tracing::{Instrument, instrument};
use tracing_core::Level;

use crate::config::CheckoutConfig;
use crate::types::{EvmAddress, PurchaseRequest, TransactionHash};

/// Gas ceiling for `approve` when transaction simulation is skipped.
pub const GAS_LIMIT_APPROVE: u64 = 100_000;
/// Gas ceiling for `executePurchase` when transaction simulation is skipped.
pub const GAS_LIMIT_PURCHASE: u64 = 500_000;

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IERC20 {
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 value) external returns (bool);
    }
}

sol! {
    #[allow(missing_docs)]
    #[allow(clippy::too_many_arguments)]
    #[derive(Debug)]
    #[sol(rpc)]
    contract NftStore {
        struct PurchaseItem {
            uint256 tokenId;
            uint256 quantity;
            uint256 price;
        }

        struct PurchaseRequest {
            address buyer;
            PurchaseItem[] items;
            uint256 nonce;
            uint256 deadline;
            bytes32 orderId;
        }

        function executePurchase(PurchaseRequest calldata request, bytes calldata signature) external;
    }
}

/// Why a parsed purchase request could not be converted into contract-call
/// arguments.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PurchaseArgsError {
    #[error("Invalid buyer address: {0}")]
    InvalidBuyer(String),
    #[error("Invalid order ID: {0}")]
    InvalidOrderId(String),
    #[error("Invalid signature encoding")]
    InvalidSignature,
}

/// Converts a validated [`PurchaseRequest`] into the store contract's
/// calldata tuple. Buyer must be a 20-byte address, order id a 32-byte hex
/// string.
pub fn to_purchase_args(
    request: &PurchaseRequest,
) -> Result<NftStore::PurchaseRequest, PurchaseArgsError> {
    let buyer = Address::from_str(request.buyer.trim())
        .map_err(|_| PurchaseArgsError::InvalidBuyer(request.buyer.clone()))?;
    let order_id = FixedBytes::<32>::from_str(request.order_id.trim())
        .map_err(|_| PurchaseArgsError::InvalidOrderId(request.order_id.clone()))?;
    let items = request
        .items
        .iter()
        .map(|item| NftStore::PurchaseItem {
            tokenId: item.token_id.0,
            quantity: item.quantity.0,
            price: item.price.0,
        })
        .collect();
    Ok(NftStore::PurchaseRequest {
        buyer,
        items,
        nonce: request.nonce.0,
        deadline: request.deadline.0,
        orderId: order_id,
    })
}

/// Decodes the payload's hex signature into calldata bytes.
pub fn decode_signature(signature: &str) -> Result<Bytes, PurchaseArgsError> {
    let trimmed = signature.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = alloy::hex::decode(digits).map_err(|_| PurchaseArgsError::InvalidSignature)?;
    Ok(Bytes::from(bytes))
}

/// Errors from the on-chain surface.
///
/// A wallet refusal is its own variant: the orchestrator reports it
/// differently from contract or receipt failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The wallet/provider refused to sign or submit the transaction.
    #[error("rejected by signer")]
    Rejected,
    /// Low-level contract interaction failure (e.g. call failed, simulation revert).
    #[error(transparent)]
    Contract(#[from] alloy::contract::Error),
    /// The transaction was mined but reverted.
    #[error("transaction {0} reverted")]
    Reverted(TransactionHash),
    /// The receipt could not be obtained for a submitted transaction.
    #[error("receipt unavailable: {0}")]
    Receipt(String),
}

/// Separates a wallet/user refusal from other contract errors, based on the
/// provider's error text (injected wallets and JSON-RPC signers both phrase
/// refusals with "rejected" or "denied").
fn classify_send_error(error: alloy::contract::Error) -> StoreError {
    let message = error.to_string();
    if message.contains("rejected") || message.contains("denied") {
        StoreError::Rejected
    } else {
        StoreError::Contract(error)
    }
}

/// Asynchronous interface to the storefront's two contracts.
///
/// `approve` and `execute_purchase` resolve only once the transaction receipt
/// is available; the returned hash refers to a mined transaction.
pub trait StoreClient {
    /// Current ERC-20 allowance granted by `owner` to `spender`.
    fn allowance(
        &self,
        owner: EvmAddress,
        spender: EvmAddress,
    ) -> impl Future<Output = Result<U256, StoreError>> + Send;

    /// Approve `spender` for exactly `amount` on the payment token and wait
    /// for the receipt. `gas_limit` is an explicit ceiling used when
    /// simulation is skipped.
    fn approve(
        &self,
        spender: EvmAddress,
        amount: U256,
        gas_limit: Option<u64>,
    ) -> impl Future<Output = Result<TransactionHash, StoreError>> + Send;

    /// Call `executePurchase` on the store contract and wait for the receipt.
    fn execute_purchase(
        &self,
        request: NftStore::PurchaseRequest,
        signature: Bytes,
        gas_limit: Option<u64>,
    ) -> impl Future<Output = Result<TransactionHash, StoreError>> + Send;
}

/// Live [`StoreClient`] over an Alloy provider with signing capability.
#[derive(Clone, Debug)]
pub struct OnchainStoreClient<P> {
    provider: P,
    token_address: EvmAddress,
    store_address: EvmAddress,
    eip1559: bool,
}

impl<P> OnchainStoreClient<P>
where
    P: Provider<Ethereum>,
{
    pub fn new(provider: P, config: &CheckoutConfig) -> Self {
        OnchainStoreClient {
            provider,
            token_address: config.token_address,
            store_address: config.store_address,
            eip1559: config.network.eip1559(),
        }
    }

    /// Applies the legacy gas-price fallback for networks without EIP-1559.
    async fn legacy_gas_price(&self) -> Result<Option<u128>, StoreError> {
        if self.eip1559 {
            return Ok(None);
        }
        let gas_price = self
            .provider
            .get_gas_price()
            .await
            .map_err(|e| StoreError::Contract(e.into()))?;
        Ok(Some(gas_price))
    }
}

impl<P> StoreClient for OnchainStoreClient<P>
where
    P: Provider<Ethereum>,
{
    #[instrument(skip_all, err, fields(owner = %owner, spender = %spender))]
    async fn allowance(
        &self,
        owner: EvmAddress,
        spender: EvmAddress,
    ) -> Result<U256, StoreError> {
        let token = IERC20::new(self.token_address.into(), &self.provider);
        let allowance = token
            .allowance(owner.into(), spender.into())
            .call()
            .into_future()
            .instrument(tracing::info_span!(
                "fetch_allowance",
                token_contract = %self.token_address,
                owner = %owner,
                spender = %spender,
            ))
            .await
            .map_err(StoreError::Contract)?;
        Ok(allowance)
    }

    #[instrument(skip_all, err, fields(spender = %spender, amount = %amount))]
    async fn approve(
        &self,
        spender: EvmAddress,
        amount: U256,
        gas_limit: Option<u64>,
    ) -> Result<TransactionHash, StoreError> {
        let token = IERC20::new(self.token_address.into(), &self.provider);
        let tx = token.approve(spender.into(), amount);
        let tx = match gas_limit {
            Some(limit) => tx.gas(limit),
            None => tx,
        };
        let tx = match self.legacy_gas_price().await? {
            Some(gas_price) => tx.gas_price(gas_price),
            None => tx,
        };
        let pending = tx
            .send()
            .instrument(tracing::info_span!(
                "approve",
                spender = %spender,
                amount = %amount,
                token_contract = %self.token_address,
            ))
            .await
            .map_err(classify_send_error)?;
        let tx_hash = *pending.tx_hash();
        let receipt = pending
            .get_receipt()
            .into_future()
            .instrument(tracing::info_span!("get_receipt", transaction = %tx_hash))
            .await
            .map_err(|e| StoreError::Receipt(e.to_string()))?;
        if receipt.status() {
            tracing::event!(Level::INFO,
                status = "ok",
                tx = %receipt.transaction_hash,
                "approve confirmed"
            );
            Ok(TransactionHash(receipt.transaction_hash.0))
        } else {
            tracing::event!(Level::WARN,
                status = "failed",
                tx = %receipt.transaction_hash,
                "approve reverted"
            );
            Err(StoreError::Reverted(TransactionHash(
                receipt.transaction_hash.0,
            )))
        }
    }

    #[instrument(skip_all, err, fields(buyer = %request.buyer, order_id = %request.orderId))]
    async fn execute_purchase(
        &self,
        request: NftStore::PurchaseRequest,
        signature: Bytes,
        gas_limit: Option<u64>,
    ) -> Result<TransactionHash, StoreError> {
        let store = NftStore::new(self.store_address.into(), &self.provider);
        let buyer = request.buyer;
        let order_id = request.orderId;
        let tx = store.executePurchase(request, signature);
        let tx = match gas_limit {
            Some(limit) => tx.gas(limit),
            None => tx,
        };
        let tx = match self.legacy_gas_price().await? {
            Some(gas_price) => tx.gas_price(gas_price),
            None => tx,
        };
        let pending = tx
            .send()
            .instrument(tracing::info_span!(
                "executePurchase",
                buyer = %buyer,
                order_id = %order_id,
                store_contract = %self.store_address,
            ))
            .await
            .map_err(classify_send_error)?;
        let tx_hash = *pending.tx_hash();
        let receipt = pending
            .get_receipt()
            .into_future()
            .instrument(tracing::info_span!("get_receipt", transaction = %tx_hash))
            .await
            .map_err(|e| StoreError::Receipt(e.to_string()))?;
        if receipt.status() {
            tracing::event!(Level::INFO,
                status = "ok",
                tx = %receipt.transaction_hash,
                "executePurchase succeeded"
            );
            Ok(TransactionHash(receipt.transaction_hash.0))
        } else {
            tracing::event!(Level::WARN,
                status = "failed",
                tx = %receipt.transaction_hash,
                "executePurchase failed"
            );
            Err(StoreError::Reverted(TransactionHash(
                receipt.transaction_hash.0,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PurchaseItem, UintField};

    fn request() -> PurchaseRequest {
        PurchaseRequest {
            buyer: "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".to_string(),
            items: vec![PurchaseItem {
                token_id: UintField::from(7u64),
                quantity: UintField::from(2u64),
                price: UintField::from(10u64),
            }],
            nonce: UintField::from(1u64),
            deadline: UintField::from(1_900_000_000u64),
            order_id: format!("0x{}", "22".repeat(32)),
        }
    }

    #[test]
    fn converts_request_to_contract_args() {
        let args = to_purchase_args(&request()).expect("valid args");
        assert_eq!(args.items.len(), 1);
        assert_eq!(args.items[0].tokenId, U256::from(7u64));
        assert_eq!(args.items[0].quantity, U256::from(2u64));
        assert_eq!(args.nonce, U256::from(1u64));
        assert_eq!(args.orderId, FixedBytes::<32>::from([0x22u8; 32]));
    }

    #[test]
    fn rejects_malformed_buyer() {
        let mut malformed = request();
        malformed.buyer = "not-an-address".to_string();
        assert!(matches!(
            to_purchase_args(&malformed),
            Err(PurchaseArgsError::InvalidBuyer(_))
        ));
    }

    #[test]
    fn rejects_short_order_id() {
        let mut malformed = request();
        malformed.order_id = "0x".to_string();
        assert!(matches!(
            to_purchase_args(&malformed),
            Err(PurchaseArgsError::InvalidOrderId(_))
        ));
    }

    #[test]
    fn decodes_signature_with_and_without_prefix() {
        assert_eq!(
            decode_signature("0xdeadbeef").expect("prefixed"),
            Bytes::from(vec![0xde, 0xad, 0xbe, 0xef])
        );
        assert_eq!(
            decode_signature("deadbeef").expect("bare"),
            Bytes::from(vec![0xde, 0xad, 0xbe, 0xef])
        );
        assert!(decode_signature("0xzz").is_err());
    }
}
