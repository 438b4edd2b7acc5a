//! Application configuration.
//!
//! Every option is optional: a missing or malformed value degrades to an
//! empty/zero default and is reported with `warn!` instead of failing.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use alloy::primitives::{Address, TxHash};
use tracing::warn;
use url::Url;
use zeroize::Zeroizing;

use crate::constants::{DEFAULT_CHAIN_ID, DEFAULT_SIGNER_URL, PUBLIC_RPC_URLS};
use crate::error::Result;

/// Environment variable names.
pub mod keys {
    /// Project identifier presented when pairing with a remote signer.
    pub const PAIRING_PROJECT_ID: &str = "PAIRING_PROJECT_ID";
    /// Parent domain subdomains are minted under (e.g. `example.eth`).
    pub const PARENT_DOMAIN: &str = "PARENT_DOMAIN";
    /// Subdomain registry contract.
    pub const REGISTRY_ADDRESS: &str = "REGISTRY_ADDRESS";
    /// Token contract holding the parent domain.
    pub const PARENT_TOKEN_ADDRESS: &str = "PARENT_TOKEN_ADDRESS";
    /// Block-explorer base URL.
    pub const EXPLORER_URL: &str = "EXPLORER_URL";
    /// RPC endpoint for reads.
    pub const ETH_RPC_URL: &str = "ETH_RPC_URL";
    /// Target chain id.
    pub const CHAIN_ID: &str = "CHAIN_ID";
    /// Remote signer endpoint.
    pub const SIGNER_URL: &str = "SIGNER_URL";
    /// Hex private key of the injected connector.
    pub const PRIVATE_KEY: &str = "PRIVATE_KEY";
}

/// SUBMINT configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Pairing project identifier (remote connector)
    pub pairing_project_id: String,
    /// Parent domain, e.g. `example.eth`
    pub parent_domain: String,
    /// Subdomain registry contract
    pub registry_address: Address,
    /// Parent token contract
    pub parent_token_address: Address,
    /// Block-explorer base URL (no trailing slash)
    pub explorer_url: String,
    /// RPC endpoint used for reads
    pub rpc_url: String,
    /// The one chain minting is allowed on
    pub chain_id: u64,
    /// Remote signer endpoint
    pub signer_url: String,
    /// Private key for the injected connector
    pub private_key: Option<Zeroizing<String>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pairing_project_id: String::new(),
            parent_domain: String::new(),
            registry_address: Address::ZERO,
            parent_token_address: Address::ZERO,
            explorer_url: String::new(),
            rpc_url: PUBLIC_RPC_URLS[0].into(),
            chain_id: DEFAULT_CHAIN_ID,
            signer_url: DEFAULT_SIGNER_URL.into(),
            private_key: None,
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("pairing_project_id", &self.pairing_project_id)
            .field("parent_domain", &self.parent_domain)
            .field("registry_address", &self.registry_address)
            .field("parent_token_address", &self.parent_token_address)
            .field("explorer_url", &self.explorer_url)
            .field("rpc_url", &self.rpc_url)
            .field("chain_id", &self.chain_id)
            .field("signer_url", &self.signer_url)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AppConfig {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads a specific dotenv file; process variables fill the gaps.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut values = HashMap::new();
        for item in dotenvy::from_path_iter(path.as_ref())
            .map_err(|e| crate::SubmintError::ConfigError(e.to_string()))?
        {
            let (key, value) = item.map_err(|e| crate::SubmintError::ConfigError(e.to_string()))?;
            values.insert(key, value);
        }
        Ok(Self::from_lookup(|key| {
            values.get(key).cloned().or_else(|| std::env::var(key).ok())
        }))
    }

    /// Builds a configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let address = |key: &str| match get(key) {
            Some(raw) => raw.parse::<Address>().unwrap_or_else(|e| {
                warn!(key, error = %e, "Invalid address, using zero address");
                Address::ZERO
            }),
            None => {
                warn!(key, "Not configured, using zero address");
                Address::ZERO
            }
        };

        let chain_id = match get(keys::CHAIN_ID) {
            Some(raw) => raw.parse::<u64>().unwrap_or_else(|e| {
                warn!(key = keys::CHAIN_ID, error = %e, "Invalid chain id, using default");
                DEFAULT_CHAIN_ID
            }),
            None => DEFAULT_CHAIN_ID,
        };

        let explorer_url = match get(keys::EXPLORER_URL) {
            Some(raw) if Url::parse(&raw).is_ok() => raw.trim_end_matches('/').to_string(),
            Some(raw) => {
                warn!(key = keys::EXPLORER_URL, value = %raw, "Invalid URL, explorer links disabled");
                String::new()
            }
            None => String::new(),
        };

        let parent_domain = get(keys::PARENT_DOMAIN)
            .map(|d| d.to_lowercase())
            .unwrap_or_else(|| {
                warn!(key = keys::PARENT_DOMAIN, "Not configured, searches use an empty parent domain");
                String::new()
            });

        Self {
            pairing_project_id: get(keys::PAIRING_PROJECT_ID).unwrap_or_default(),
            parent_domain,
            registry_address: address(keys::REGISTRY_ADDRESS),
            parent_token_address: address(keys::PARENT_TOKEN_ADDRESS),
            explorer_url,
            rpc_url: get(keys::ETH_RPC_URL).unwrap_or(defaults.rpc_url),
            chain_id,
            signer_url: get(keys::SIGNER_URL).unwrap_or(defaults.signer_url),
            private_key: get(keys::PRIVATE_KEY).map(Zeroizing::new),
        }
    }

    /// Creates a configuration for the given parent domain and contracts.
    pub fn new(parent_domain: impl Into<String>, registry_address: Address, parent_token_address: Address) -> Self {
        Self {
            parent_domain: parent_domain.into(),
            registry_address,
            parent_token_address,
            ..Default::default()
        }
    }

    /// Overrides the RPC endpoint.
    pub fn with_rpc(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }

    /// `term.parent_domain`.
    pub fn full_domain(&self, term: &str) -> String {
        format!("{}.{}", term, self.parent_domain)
    }

    /// Explorer link for a transaction, if an explorer is configured.
    pub fn explorer_tx_url(&self, tx: &TxHash) -> Option<String> {
        if self.explorer_url.is_empty() {
            None
        } else {
            Some(format!("{}/tx/{}", self.explorer_url, tx))
        }
    }

    /// Names of the options that are missing and will degrade behaviour.
    pub fn missing_options(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.pairing_project_id.is_empty() {
            missing.push(keys::PAIRING_PROJECT_ID);
        }
        if self.parent_domain.is_empty() {
            missing.push(keys::PARENT_DOMAIN);
        }
        if self.registry_address.is_zero() {
            missing.push(keys::REGISTRY_ADDRESS);
        }
        if self.parent_token_address.is_zero() {
            missing.push(keys::PARENT_TOKEN_ADDRESS);
        }
        if self.explorer_url.is_empty() {
            missing.push(keys::EXPLORER_URL);
        }
        missing
    }
}
