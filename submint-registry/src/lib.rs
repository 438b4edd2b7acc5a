//! # SUBMINT Registry
//!
//! Access to the subdomain registry contract and the wallets that sign for it.
//!
//! This crate provides:
//!
//! - **Chain**: alloy-backed reader/writer for the deployed contracts
//! - **Memory**: In-memory registry for development and testing
//! - **Connectors**: Injected (local key) and remote-pairing wallet connectors
//!
//! ## Example
//!
//! ```rust,ignore
//! use submint_registry::{ChainRegistry, ContractAddresses};
//!
//! let provider = ProviderBuilder::new().on_builtin("https://eth.llamarpc.com").await?;
//! let registry = ChainRegistry::new(provider, ContractAddresses::from_config(&config));
//! let token_id = registry.hash_to_id(namehash("alice.example.eth")).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod chain;
mod connector;
mod memory;

pub use chain::{ChainRegistry, ContractAddresses};
pub use connector::{connector_for, InjectedConnector, RemotePairingConnector};
pub use memory::{Faults, MemoryConnector, MemoryRegistry, MemoryWriter};

// Re-export the traits from core
pub use submint_core::traits::{RegistryReader, RegistryWriter, WalletConnector};
