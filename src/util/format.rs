//! Display formatting for on-chain values.
//!
//! Token amounts are carried as exact base-unit integers everywhere; decimal
//! conversion happens only here, at the display edge.

use alloy::primitives::U256;
use alloy::primitives::utils::format_units;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Fractional digits shown in status lines.
const DISPLAY_DP: u32 = 4;

/// Formats a base-unit token amount as a human-readable decimal in the
/// token's `decimals`, rounded to four fractional digits with trailing zeros
/// stripped.
///
/// Amounts too large for [`Decimal`] fall back to the full-precision decimal
/// string; the exact integer maths upstream are never affected either way.
pub fn format_token_amount(amount: U256, decimals: u8) -> String {
    let Ok(units) = format_units(amount, decimals) else {
        return amount.to_string();
    };
    match Decimal::from_str(&units) {
        Ok(decimal) => decimal.round_dp(DISPLAY_DP).normalize().to_string(),
        Err(_) => units,
    }
}

/// Shortens an address-like string to its first six and last four characters.
///
/// Strings too short to shorten pass through unchanged.
pub fn truncate_address(address: &str) -> String {
    if address.len() < 10 {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_whole_token_amounts() {
        let one = U256::from(10u64).pow(U256::from(18u64));
        assert_eq!(format_token_amount(one, 18), "1");
        assert_eq!(format_token_amount(one * U256::from(250u64), 18), "250");
    }

    #[test]
    fn rounds_to_four_fractional_digits() {
        // 1.23456789 tokens
        let amount = U256::from_str("1234567890000000000").expect("amount");
        assert_eq!(format_token_amount(amount, 18), "1.2346");
    }

    #[test]
    fn strips_trailing_zeros() {
        // 0.5 tokens
        let amount = U256::from_str("500000000000000000").expect("amount");
        assert_eq!(format_token_amount(amount, 18), "0.5");
    }

    #[test]
    fn honors_the_token_decimals() {
        // 2.5 of a 6-decimal token
        assert_eq!(format_token_amount(U256::from(2_500_000u64), 6), "2.5");
        assert_eq!(format_token_amount(U256::from(2_500_000u64), 18), "0");
    }

    #[test]
    fn zero_is_plain_zero() {
        assert_eq!(format_token_amount(U256::ZERO, 18), "0");
    }

    #[test]
    fn truncates_long_addresses() {
        assert_eq!(
            truncate_address("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"),
            "0xf39f...2266"
        );
    }

    #[test]
    fn short_strings_pass_through() {
        assert_eq!(truncate_address("0xabc"), "0xabc");
    }
}
