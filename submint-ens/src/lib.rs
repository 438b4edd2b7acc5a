//! # SUBMINT ENS Integration
//!
//! Label hashing for registry lookups, plus display-name and avatar
//! resolution for the connected wallet.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod cache;
pub mod hash;
mod identity;

pub use hash::{label_id, labelhash, namehash, reverse_node};
pub use identity::{AvatarProbe, EnsIdentityResolver, IdentityConfig};
