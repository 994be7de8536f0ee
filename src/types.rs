//! Type definitions for signed purchase orders.
//!
//! This mirrors the payload format produced by the storefront's order-signing
//! service: a [`PurchaseRequest`] (buyer, line items, nonce, deadline, order id)
//! wrapped together with an EIP-712 signature into a [`PurchasePayload`].
//!
//! Numeric fields are tolerant on the wire (JSON numbers or strings) and
//! normalize to `U256` at deserialization time. Address and order-id fields
//! stay raw strings here so the business-rule validator can report *presence*
//! errors before any decoding is attempted.

use alloy::hex;
use alloy::primitives::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

/// Represents an EVM address.
///
/// Wrapper around `alloy::primitives::Address`, providing display/serialization support.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct EvmAddress(pub alloy::primitives::Address);

impl Display for EvmAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Failed to decode EVM address")]
pub struct EvmAddressDecodingError;

impl FromStr for EvmAddress {
    type Err = EvmAddressDecodingError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let address =
            alloy::primitives::Address::from_str(s).map_err(|_| EvmAddressDecodingError)?;
        Ok(Self(address))
    }
}

impl From<EvmAddress> for alloy::primitives::Address {
    fn from(address: EvmAddress) -> Self {
        address.0
    }
}

impl From<alloy::primitives::Address> for EvmAddress {
    fn from(address: alloy::primitives::Address) -> Self {
        EvmAddress(address)
    }
}

/// A uint256 field that may arrive as a JSON number or string.
///
/// Order-signing tools serialize numeric fields inconsistently: `1`, `"1"`,
/// and `"0x1"` all denote the same on-chain integer. All three forms normalize
/// to the same [`U256`] here. A blank string coerces to zero, matching the
/// coercion the storefront's web client applies.
///
/// Serialized back out as a decimal string to avoid precision loss in JSON.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct UintField(pub U256);

impl UintField {
    pub const ZERO: UintField = UintField(U256::ZERO);

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl From<u64> for UintField {
    fn from(value: u64) -> Self {
        UintField(U256::from(value))
    }
}

impl From<U256> for UintField {
    fn from(value: U256) -> Self {
        UintField(value)
    }
}

impl From<UintField> for U256 {
    fn from(value: UintField) -> Self {
        value.0
    }
}

impl Display for UintField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for UintField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for UintField {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct UintVisitor;

        impl serde::de::Visitor<'_> for UintVisitor {
            type Value = UintField;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an unsigned integer or a decimal/hex string")
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(UintField(U256::from(v)))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Self::Value, E> {
                if v < 0 {
                    return Err(E::custom("negative values are not valid uint256"));
                }
                Ok(UintField(U256::from(v as u64)))
            }

            fn visit_str<E: serde::de::Error>(self, s: &str) -> Result<Self::Value, E> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(UintField(U256::ZERO));
                }
                let parsed = if let Some(digits) = trimmed
                    .strip_prefix("0x")
                    .or_else(|| trimmed.strip_prefix("0X"))
                {
                    U256::from_str_radix(digits, 16)
                } else {
                    U256::from_str_radix(trimmed, 10)
                };
                parsed
                    .map(UintField)
                    .map_err(|_| E::custom("invalid uint256 string"))
            }
        }

        deserializer.deserialize_any(UintVisitor)
    }
}

/// A single line item of a purchase order: which token, how many, at what
/// unit price (in the payment token's base units).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseItem {
    pub token_id: UintField,
    pub quantity: UintField,
    pub price: UintField,
}

/// The request half of a signed purchase order.
///
/// `buyer` and `order_id` are kept as raw strings: presence is a business
/// rule (checked first), decoding into `Address`/`bytes32` happens only when
/// the order is converted into contract-call arguments.
///
/// Every field defaults when absent so that a structurally incomplete request
/// still parses and fails with a specific business-rule error instead of a
/// generic format error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    #[serde(default)]
    pub buyer: String,
    #[serde(default)]
    pub items: Vec<PurchaseItem>,
    #[serde(default)]
    pub nonce: UintField,
    #[serde(default)]
    pub deadline: UintField,
    #[serde(default)]
    pub order_id: String,
}

/// A complete signed purchase order: the request plus the storefront
/// signature over it, as pasted/piped in by the user.
///
/// Immutable once parsed; the orchestrator discards it after a completed or
/// failed transaction cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchasePayload {
    pub request: PurchaseRequest,
    pub signature: String,
}

/// The orchestrator's position in the allowance/purchase cycle.
///
/// Exactly one transaction cycle may be in flight at a time; any failure
/// returns the orchestrator to [`TransactionStep::Idle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStep {
    Idle,
    Checking,
    Approving,
    Purchasing,
}

impl Display for TransactionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStep::Idle => "idle",
            TransactionStep::Checking => "checking",
            TransactionStep::Approving => "approving",
            TransactionStep::Purchasing => "purchasing",
        };
        write!(f, "{}", s)
    }
}

/// A 32-byte EVM transaction hash, displayed as a 0x-prefixed hex string.
///
/// Only ever produced from mined receipts, so it carries no wire decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionHash(pub [u8; 32]);

impl Display for TransactionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint_field_accepts_numbers_and_strings() {
        let from_number: UintField = serde_json::from_str("7").expect("number");
        let from_decimal: UintField = serde_json::from_str("\"7\"").expect("decimal string");
        let from_hex: UintField = serde_json::from_str("\"0x7\"").expect("hex string");
        assert_eq!(from_number, from_decimal);
        assert_eq!(from_number, from_hex);
        assert_eq!(from_number.0, U256::from(7u64));
    }

    #[test]
    fn uint_field_handles_large_decimal_strings() {
        let wei: UintField =
            serde_json::from_str("\"1000000000000000000\"").expect("18-decimal amount");
        assert_eq!(wei.0, U256::from(10u64).pow(U256::from(18u64)));
    }

    #[test]
    fn uint_field_blank_string_is_zero() {
        let blank: UintField = serde_json::from_str("\"\"").expect("blank");
        assert!(blank.is_zero());
        let spaces: UintField = serde_json::from_str("\"  \"").expect("spaces");
        assert!(spaces.is_zero());
    }

    #[test]
    fn uint_field_rejects_floats_and_negatives() {
        assert!(serde_json::from_str::<UintField>("1.5").is_err());
        assert!(serde_json::from_str::<UintField>("-1").is_err());
        assert!(serde_json::from_str::<UintField>("\"abc\"").is_err());
    }

    #[test]
    fn uint_field_round_trips_as_string() {
        let value = UintField(U256::from(42u64));
        let json = serde_json::to_string(&value).expect("serialize");
        assert_eq!(json, "\"42\"");
    }

    #[test]
    fn transaction_step_displays_lowercase() {
        assert_eq!(TransactionStep::Idle.to_string(), "idle");
        assert_eq!(TransactionStep::Approving.to_string(), "approving");
    }

    #[test]
    fn transaction_hash_displays_prefixed_hex() {
        let hash = TransactionHash([0xab; 32]);
        assert_eq!(hash.to_string(), format!("0x{}", "ab".repeat(32)));
    }

    #[test]
    fn purchase_request_defaults_missing_fields() {
        let request: PurchaseRequest = serde_json::from_str("{}").expect("empty object");
        assert!(request.buyer.is_empty());
        assert!(request.items.is_empty());
        assert!(request.deadline.is_zero());
    }
}
