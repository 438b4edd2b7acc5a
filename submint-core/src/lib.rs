//! # SUBMINT Core
//!
//! Core types, errors, and traits for the SUBMINT subdomain minting client.
//!
//! This crate provides the foundational building blocks used by all other SUBMINT crates:
//!
//! - **Types**: Search results, wallet sessions, mint requests and identities
//! - **Errors**: One error enum with classification helpers
//! - **Constants**: Timings, display limits and well-known addresses
//! - **Config**: Environment-driven application configuration
//! - **Traits**: Seams for contract reads/writes, wallet connectors and identity lookup
//!
//! ## Example
//!
//! ```rust
//! use submint_core::{AppConfig, SearchResult};
//! use alloy::primitives::{B256, U256};
//!
//! let config = AppConfig::default();
//! let result = SearchResult::resolved("alice", "alice.example.eth", B256::ZERO, U256::ZERO);
//! assert!(!result.exists);
//! # let _ = config;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod config;
pub mod constants;
pub mod error;
pub mod format;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use config::AppConfig;
pub use constants::*;
pub use error::{Result, SubmintError};
pub use traits::*;
pub use types::*;
