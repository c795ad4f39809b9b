//! ERC20 amount helpers
//!
//! Converts between human-readable token amounts ("10", "1.5") and raw
//! on-chain units for a given number of decimals.

use alloy::primitives::utils::{format_units, parse_units};
use alloy::primitives::U256;

use crate::error::BridgeError;

/// Default ERC20 decimals (matches `parseEther`)
pub const DEFAULT_DECIMALS: u8 = 18;

/// Convert a human-readable amount to raw token units
pub fn to_token_units(amount: &str, decimals: u8) -> Result<U256, BridgeError> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(BridgeError::InvalidAmount("amount is empty".to_string()));
    }
    if trimmed.starts_with('-') {
        return Err(BridgeError::InvalidAmount(format!(
            "amount must not be negative: {}",
            trimmed
        )));
    }

    let parsed = parse_units(trimmed, decimals)
        .map_err(|e| BridgeError::InvalidAmount(format!("{}: {}", trimmed, e)))?;
    Ok(parsed.into())
}

/// Convert raw token units to a human-readable amount.
/// Falls back to the raw integer if the decimals are out of range.
pub fn from_token_units(raw: U256, decimals: u8) -> String {
    format_units(raw, decimals).unwrap_or_else(|_| raw.to_string())
}
