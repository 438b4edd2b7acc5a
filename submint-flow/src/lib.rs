//! # SUBMINT Flow
//!
//! Event-driven state machines behind the subdomain page.
//!
//! - [`search`]: sanitize, debounce, existence read, proceed-anyway unlock
//! - [`mint`]: price resolution and the transaction lifecycle
//! - [`wallet`]: connect, disconnect, switch network, identity display
//! - [`network`]: target-chain check
//! - [`page`]: the active result and its card
//! - [`runtime`]: tokio drivers that perform the reads and writes
//!
//! The machines themselves never await; they take the current time and
//! the outcomes of external calls as inputs, which keeps every transition
//! testable without a chain.
//!
//! ## Example
//!
//! ```rust,ignore
//! let (search, _task) = spawn_search(reader.clone(), "example.eth");
//! let snapshot = search.search("alice").await?;
//! if let Some(result) = search.submit().await? {
//!     page.show_result(result);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod mint;
pub mod network;
pub mod page;
pub mod runtime;
pub mod search;
pub mod wallet;

pub use mint::{MintEvent, MintFlow, MintPhase};
pub use network::NetworkStatus;
pub use page::{CardAction, Page, ResultCard};
pub use runtime::{drive_search, refresh_price, run_mint, spawn_search, SearchCommand, SearchHandle, SearchSnapshot};
pub use search::{sanitize, Query, SearchFlow, SearchPhase, SearchStatus};
pub use wallet::{PrimaryAction, WalletController, WalletView};
