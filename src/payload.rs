//! Parsing, pricing, and business-rule validation of purchase payloads.
//!
//! The entry point is [`parse_purchase_payload`], which turns a user-supplied
//! JSON string into a typed [`PurchasePayload`] or a human-readable error.
//! [`total_price`] and [`validate_request`] are pure functions over the parsed
//! request; the orchestrator runs them before touching the chain.

use alloy::primitives::U256;

use crate::types::{PurchasePayload, PurchaseRequest};

/// Why a pasted payload string could not be turned into a [`PurchasePayload`].
///
/// The display strings are shown verbatim to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    /// The input was not parseable JSON at all.
    #[error("Invalid JSON")]
    InvalidJson,
    /// The input was a bare request (has `buyer` and `items`) pasted without
    /// the `{request, signature}` envelope.
    #[error("Please use format: {{ \"request\": {{...}}, \"signature\": \"0x...\" }}")]
    BareRequest,
    /// Valid JSON, but not a recognizable payload envelope.
    #[error("Invalid payload format")]
    InvalidFormat,
}

/// Parses a user-supplied JSON string into a [`PurchasePayload`].
///
/// Never panics: every malformed input maps to a [`PayloadError`]. A bare
/// request pasted without the envelope gets a specific hint rather than a
/// generic format error.
pub fn parse_purchase_payload(json: &str) -> Result<PurchasePayload, PayloadError> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|_| PayloadError::InvalidJson)?;
    let Some(object) = value.as_object() else {
        return Err(PayloadError::InvalidFormat);
    };
    if object.contains_key("request") && object.contains_key("signature") {
        serde_json::from_value(value).map_err(|_| PayloadError::InvalidFormat)
    } else if object.contains_key("buyer") && object.contains_key("items") {
        Err(PayloadError::BareRequest)
    } else {
        Err(PayloadError::InvalidFormat)
    }
}

/// Sums `price * quantity` over the request's items using exact uint256
/// arithmetic. Returns zero for an absent request.
///
/// A sum that overflows uint256 also yields zero: such a total can never be
/// approved or settled on-chain, and a zero total fails validation.
pub fn total_price(request: Option<&PurchaseRequest>) -> U256 {
    let Some(request) = request else {
        return U256::ZERO;
    };
    let mut sum = U256::ZERO;
    for item in &request.items {
        let Some(line) = item.price.0.checked_mul(item.quantity.0) else {
            return U256::ZERO;
        };
        let Some(next) = sum.checked_add(line) else {
            return U256::ZERO;
        };
        sum = next;
    }
    sum
}

/// The first business rule a purchase request violates.
///
/// The display strings are shown verbatim to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestValidationError {
    #[error("Buyer address is missing")]
    BuyerMissing,
    #[error("Order ID is missing")]
    OrderIdMissing,
    #[error("Deadline is missing")]
    DeadlineMissing,
    #[error("Items are missing or empty")]
    ItemsMissing,
    #[error("Total price must be greater than 0")]
    ZeroTotalPrice,
}

/// Checks the request's business rules in fixed order and reports only the
/// first violation: buyer, order id, deadline, items, total price.
pub fn validate_request(request: &PurchaseRequest) -> Result<(), RequestValidationError> {
    if request.buyer.trim().is_empty() {
        return Err(RequestValidationError::BuyerMissing);
    }
    if request.order_id.trim().is_empty() {
        return Err(RequestValidationError::OrderIdMissing);
    }
    if request.deadline.is_zero() {
        return Err(RequestValidationError::DeadlineMissing);
    }
    if request.items.is_empty() {
        return Err(RequestValidationError::ItemsMissing);
    }
    if total_price(Some(request)).is_zero() {
        return Err(RequestValidationError::ZeroTotalPrice);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PurchaseItem, UintField};
    use std::str::FromStr;

    fn request_with_items(items: Vec<PurchaseItem>) -> PurchaseRequest {
        PurchaseRequest {
            buyer: "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".to_string(),
            items,
            nonce: UintField::from(1u64),
            deadline: UintField::from(1_900_000_000u64),
            order_id: format!("0x{}", "11".repeat(32)),
        }
    }

    fn item(price: &str, quantity: u64) -> PurchaseItem {
        PurchaseItem {
            token_id: UintField::from(1u64),
            quantity: UintField::from(quantity),
            price: UintField(U256::from_str(price).expect("price")),
        }
    }

    #[test]
    fn parses_a_complete_payload() {
        let json = r#"{
            "request": {
                "buyer": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
                "items": [
                    { "tokenId": 1, "quantity": "2", "price": "1000000000000000000" }
                ],
                "nonce": 0,
                "deadline": "1900000000",
                "orderId": "0x1111111111111111111111111111111111111111111111111111111111111111"
            },
            "signature": "0xdeadbeef"
        }"#;
        let payload = parse_purchase_payload(json).expect("valid payload");
        assert_eq!(payload.signature, "0xdeadbeef");
        assert_eq!(payload.request.items.len(), 1);
        assert_eq!(payload.request.items[0].quantity, UintField::from(2u64));
    }

    #[test]
    fn invalid_json_is_reported_as_such() {
        assert_eq!(
            parse_purchase_payload("not json at all"),
            Err(PayloadError::InvalidJson)
        );
        assert_eq!(
            parse_purchase_payload("{ truncated"),
            Err(PayloadError::InvalidJson)
        );
    }

    #[test]
    fn bare_request_gets_the_envelope_hint() {
        let json = r#"{ "buyer": "0xabc", "items": [] }"#;
        let error = parse_purchase_payload(json).expect_err("bare request");
        assert_eq!(error, PayloadError::BareRequest);
        assert_eq!(
            error.to_string(),
            "Please use format: { \"request\": {...}, \"signature\": \"0x...\" }"
        );
    }

    #[test]
    fn unrecognized_shapes_are_invalid_format() {
        assert_eq!(
            parse_purchase_payload("[1, 2, 3]"),
            Err(PayloadError::InvalidFormat)
        );
        assert_eq!(
            parse_purchase_payload(r#"{ "something": "else" }"#),
            Err(PayloadError::InvalidFormat)
        );
        // Envelope keys present but the body does not deserialize.
        assert_eq!(
            parse_purchase_payload(r#"{ "request": { "items": [{ "price": 1.5 }] }, "signature": "0x" }"#),
            Err(PayloadError::InvalidFormat)
        );
    }

    #[test]
    fn total_price_uses_exact_integer_arithmetic() {
        let request = request_with_items(vec![item("1000000000000000000", 3)]);
        assert_eq!(
            total_price(Some(&request)),
            U256::from_str("3000000000000000000").expect("total")
        );
    }

    #[test]
    fn total_price_sums_multiple_items() {
        let request = request_with_items(vec![item("100", 2), item("7", 3)]);
        assert_eq!(total_price(Some(&request)), U256::from(221u64));
    }

    #[test]
    fn total_price_of_absent_request_is_zero() {
        assert_eq!(total_price(None), U256::ZERO);
    }

    #[test]
    fn total_price_overflow_collapses_to_zero() {
        let request = request_with_items(vec![
            PurchaseItem {
                token_id: UintField::from(1u64),
                quantity: UintField::from(2u64),
                price: UintField(U256::MAX),
            },
        ]);
        assert_eq!(total_price(Some(&request)), U256::ZERO);
    }

    #[test]
    fn validation_reports_first_violation_only() {
        let mut request = request_with_items(vec![item("10", 1)]);
        request.buyer = String::new();
        request.order_id = String::new();
        assert_eq!(
            validate_request(&request),
            Err(RequestValidationError::BuyerMissing)
        );

        request.buyer = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".to_string();
        assert_eq!(
            validate_request(&request),
            Err(RequestValidationError::OrderIdMissing)
        );
    }

    #[test]
    fn zero_deadline_is_missing() {
        let mut request = request_with_items(vec![item("10", 1)]);
        request.deadline = UintField::ZERO;
        assert_eq!(
            validate_request(&request),
            Err(RequestValidationError::DeadlineMissing)
        );
    }

    #[test]
    fn empty_items_are_rejected_regardless_of_other_fields() {
        let request = request_with_items(vec![]);
        let error = validate_request(&request).expect_err("empty items");
        assert_eq!(error, RequestValidationError::ItemsMissing);
        assert_eq!(error.to_string(), "Items are missing or empty");
    }

    #[test]
    fn zero_total_is_rejected() {
        let request = request_with_items(vec![item("0", 5)]);
        assert_eq!(
            validate_request(&request),
            Err(RequestValidationError::ZeroTotalPrice)
        );
    }

    #[test]
    fn valid_request_passes() {
        let request = request_with_items(vec![item("1000000000000000000", 1)]);
        assert_eq!(validate_request(&request), Ok(()));
    }
}
