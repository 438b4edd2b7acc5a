//! Display helpers shared by the flows and the terminal front end.

use alloy::primitives::{utils::format_ether, Address, U256};

use crate::constants::{SHORT_ADDRESS_PREFIX, SHORT_ADDRESS_SUFFIX};

/// Shortens an address to `0x1234...abcd` using its checksummed form.
pub fn shorten_address(address: &Address) -> String {
    let full = address.to_checksum(None);
    format!(
        "{}...{}",
        &full[..SHORT_ADDRESS_PREFIX],
        &full[full.len() - SHORT_ADDRESS_SUFFIX..]
    )
}

/// Truncates a message to at most `max` characters (not bytes).
pub fn truncate_chars(message: &str, max: usize) -> String {
    match message.char_indices().nth(max) {
        Some((idx, _)) => message[..idx].to_string(),
        None => message.to_string(),
    }
}

/// Formats a wei amount as ETH, e.g. `0.010000000000000000 ETH`.
pub fn format_price(wei: U256) -> String {
    if wei.is_zero() {
        return "free".into();
    }
    format!("{} ETH", format_ether(wei))
}
