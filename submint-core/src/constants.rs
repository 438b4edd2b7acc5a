//! Constants shared across SUBMINT crates.
//!
//! Timings mirror the interaction model of the search and mint flows;
//! addresses are the canonical mainnet deployments.

use std::time::Duration;

use alloy::primitives::{address, Address};

// ═══════════════════════════════════════════════════════════════════════════════
// SEARCH FLOW
// ═══════════════════════════════════════════════════════════════════════════════

/// Quiet period after the last keystroke before a search term is considered stable.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// How long a read error must persist for the same term before
/// "proceed anyway" is offered.
pub const PROCEED_ANYWAY_DELAY: Duration = Duration::from_secs(5);

/// Maximum characters of a read error shown in the search status line.
pub const SEARCH_ERROR_DISPLAY_LEN: usize = 50;

// ═══════════════════════════════════════════════════════════════════════════════
// MINT FLOW
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum characters of a transaction error shown to the user.
pub const MINT_ERROR_DISPLAY_LEN: usize = 160;

/// Interval between `eth_getTransactionReceipt` polls.
pub const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Give up waiting for a receipt after this long.
pub const RECEIPT_TIMEOUT: Duration = Duration::from_secs(600);

// ═══════════════════════════════════════════════════════════════════════════════
// WALLET DISPLAY
// ═══════════════════════════════════════════════════════════════════════════════

/// Leading characters kept when shortening an address (includes `0x`).
pub const SHORT_ADDRESS_PREFIX: usize = 6;

/// Trailing characters kept when shortening an address.
pub const SHORT_ADDRESS_SUFFIX: usize = 4;

// ═══════════════════════════════════════════════════════════════════════════════
// CHAIN & RPC
// ═══════════════════════════════════════════════════════════════════════════════

/// The one chain the client mints on unless configured otherwise (Ethereum mainnet).
pub const DEFAULT_CHAIN_ID: u64 = 1;

/// Public mainnet RPC endpoints, in order of preference.
///
/// The first entry is the default when `ETH_RPC_URL` is unset.
pub const PUBLIC_RPC_URLS: &[&str] = &[
    "https://eth.llamarpc.com",
    "https://ethereum.blockpi.network/v1/rpc/public",
    "https://rpc.ankr.com/eth",
    "https://eth-mainnet.public.blastapi.io",
    "https://cloudflare-eth.com",
];

/// Default endpoint of a remote signer (Frame listens here).
pub const DEFAULT_SIGNER_URL: &str = "http://127.0.0.1:1248";

// ═══════════════════════════════════════════════════════════════════════════════
// ENS CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// ENS registry (same address on mainnet and the public testnets).
pub const ENS_REGISTRY_ADDRESS: Address = address!("00000000000C2E074eC69A0dFb2997BA6C7d2e1e");

/// Parent of every reverse record.
pub const ENS_REVERSE_SUFFIX: &str = "addr.reverse";

/// Text record key holding an avatar URL.
pub const ENS_AVATAR_KEY: &str = "avatar";

/// Human-readable name of a chain id, used in "Switch to ..." prompts.
pub fn chain_name(chain_id: u64) -> String {
    match chain_id {
        1 => "Ethereum".into(),
        11_155_111 => "Sepolia".into(),
        17_000 => "Holesky".into(),
        other => format!("chain {}", other),
    }
}
