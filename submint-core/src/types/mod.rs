//! Domain types for SUBMINT.
//!
//! - [`SearchResult`]: Outcome of a subdomain availability search
//! - [`WalletSession`]: Read-only view of the connected wallet
//! - [`Identity`]: Resolved display name and avatar of an address
//! - [`MintRequest`] / [`PriceInputs`]: Inputs of the paid mint transaction

mod mint;
mod search;
mod session;

pub use mint::*;
pub use search::*;
pub use session::*;
