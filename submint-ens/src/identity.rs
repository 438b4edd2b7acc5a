//! ENS identity lookup for the connected wallet.
//!
//! Resolves the primary name of an address through its reverse record,
//! checks that the name resolves back to the same address, then reads the
//! `avatar` text record and keeps it only if the URL actually answers.

use std::marker::PhantomData;
use std::time::Duration;

use alloy::primitives::{Address, B256};
use alloy::providers::Provider;
use alloy::sol;
use alloy::transports::Transport;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use submint_core::constants::{ENS_AVATAR_KEY, ENS_REGISTRY_ADDRESS};
use submint_core::error::{Result, SubmintError};
use submint_core::traits::IdentityResolver;
use submint_core::types::Identity;

use crate::cache::IdentityCache;
use crate::hash::{namehash, reverse_node};

sol! {
    #[sol(rpc)]
    interface IEnsRegistry {
        function resolver(bytes32 node) external view returns (address);
    }

    #[sol(rpc)]
    interface IEnsResolver {
        function addr(bytes32 node) external view returns (address);
        function name(bytes32 node) external view returns (string);
        function text(bytes32 node, string key) external view returns (string);
    }
}

/// Default gateway used to turn `ipfs://` avatars into fetchable URLs.
const DEFAULT_IPFS_GATEWAY: &str = "https://ipfs.io/ipfs/";

/// Identity lookup configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// ENS registry contract
    pub registry: Address,
    /// Timeout for the avatar reachability check
    pub avatar_timeout_seconds: u64,
    /// Gateway prefix for `ipfs://` avatars
    pub ipfs_gateway: String,
    /// How long a resolved identity is reused; zero disables caching
    pub cache_ttl_seconds: u64,
    /// Maximum number of cached identities
    pub cache_capacity: usize,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            registry: ENS_REGISTRY_ADDRESS,
            avatar_timeout_seconds: 5,
            ipfs_gateway: DEFAULT_IPFS_GATEWAY.into(),
            cache_ttl_seconds: 600,
            cache_capacity: 64,
        }
    }
}

/// Checks that an avatar URL can actually be loaded.
#[derive(Clone, Debug)]
pub struct AvatarProbe {
    http: reqwest::Client,
    ipfs_gateway: String,
}

impl AvatarProbe {
    /// Creates a probe with the given request timeout and IPFS gateway.
    pub fn new(timeout: Duration, ipfs_gateway: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            http,
            ipfs_gateway: ipfs_gateway.into(),
        }
    }

    /// Turns an avatar record into a fetchable URL.
    ///
    /// HTTP(S) URLs pass through, `ipfs://` goes through the gateway;
    /// NFT references (`eip155:`) and anything else are not supported.
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        if raw.starts_with("https://") || raw.starts_with("http://") {
            Some(raw.to_string())
        } else if let Some(cid) = raw.strip_prefix("ipfs://") {
            let cid = cid.trim_start_matches("ipfs/");
            Some(format!("{}{}", self.ipfs_gateway, cid))
        } else {
            None
        }
    }

    /// Returns the normalized URL if a `HEAD` request to it succeeds.
    #[instrument(skip(self))]
    pub async fn resolve(&self, raw: &str) -> Option<String> {
        let url = self.normalize(raw)?;

        match self.http.head(&url).send().await {
            Ok(response) if response.status().is_success() => Some(url),
            Ok(response) => {
                debug!(url, status = %response.status(), "Avatar not reachable");
                None
            }
            Err(e) => {
                debug!(url, error = %e, "Avatar request failed");
                None
            }
        }
    }
}

impl Default for AvatarProbe {
    fn default() -> Self {
        let config = IdentityConfig::default();
        Self::new(Duration::from_secs(config.avatar_timeout_seconds), config.ipfs_gateway)
    }
}

/// ENS-backed [`IdentityResolver`].
pub struct EnsIdentityResolver<T, P> {
    provider: P,
    registry: Address,
    probe: AvatarProbe,
    cache: Option<IdentityCache>,
    _transport: PhantomData<fn() -> T>,
}

impl<T, P> EnsIdentityResolver<T, P>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    /// Creates a resolver with default configuration.
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, IdentityConfig::default())
    }

    /// Creates a resolver with custom configuration.
    pub fn with_config(provider: P, config: IdentityConfig) -> Self {
        let cache = (config.cache_ttl_seconds > 0).then(|| {
            IdentityCache::new(Duration::from_secs(config.cache_ttl_seconds), config.cache_capacity)
        });

        Self {
            provider,
            registry: config.registry,
            probe: AvatarProbe::new(
                Duration::from_secs(config.avatar_timeout_seconds),
                config.ipfs_gateway,
            ),
            cache,
            _transport: PhantomData,
        }
    }

    async fn resolver_of(&self, node: B256) -> Result<Option<Address>> {
        let registry = IEnsRegistry::new(self.registry, &self.provider);
        let resolver = registry
            .resolver(node)
            .call()
            .await
            .map_err(|e| read_failed("resolver", e))?
            ._0;

        Ok((!resolver.is_zero()).then_some(resolver))
    }

    async fn primary_name(&self, address: Address) -> Result<Option<String>> {
        let node = reverse_node(&address);
        let Some(resolver) = self.resolver_of(node).await? else {
            return Ok(None);
        };

        let name = IEnsResolver::new(resolver, &self.provider)
            .name(node)
            .call()
            .await
            .map_err(|e| read_failed("name", e))?
            ._0;

        Ok((!name.is_empty()).then_some(name))
    }

    async fn forward_record(&self, name: &str) -> Result<Option<(Address, B256)>> {
        let node = namehash(name);
        let Some(resolver) = self.resolver_of(node).await? else {
            return Ok(None);
        };
        Ok(Some((resolver, node)))
    }

    async fn resolve_identity(&self, address: Address) -> Result<Identity> {
        let Some(name) = self.primary_name(address).await? else {
            debug!(%address, "No reverse record");
            return Ok(Identity::default());
        };

        let Some((resolver, node)) = self.forward_record(&name).await? else {
            warn!(%address, name, "Primary name has no resolver");
            return Ok(Identity::default());
        };

        let resolver = IEnsResolver::new(resolver, &self.provider);

        let forward = resolver
            .addr(node)
            .call()
            .await
            .map_err(|e| read_failed("addr", e))?
            ._0;
        if forward != address {
            warn!(%address, name, %forward, "Primary name does not resolve back to address");
            return Ok(Identity::default());
        }

        let avatar_record = resolver
            .text(node, ENS_AVATAR_KEY.to_string())
            .call()
            .await
            .map_err(|e| read_failed("text", e))?
            ._0;

        let avatar = if avatar_record.is_empty() {
            None
        } else {
            self.probe.resolve(&avatar_record).await
        };

        Ok(Identity {
            name: Some(name),
            avatar,
        })
    }
}

#[async_trait]
impl<T, P> IdentityResolver for EnsIdentityResolver<T, P>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    #[instrument(skip(self))]
    async fn lookup(&self, address: Address) -> Result<Identity> {
        if let Some(cache) = &self.cache {
            if let Some(identity) = cache.get(&address) {
                debug!(%address, "Cache hit");
                return Ok(identity);
            }
        }

        let identity = self.resolve_identity(address).await?;

        if let Some(cache) = &self.cache {
            cache.insert(address, identity.clone());
        }

        Ok(identity)
    }
}

fn read_failed(call: &'static str, err: impl std::fmt::Display) -> SubmintError {
    SubmintError::ReadFailed {
        call,
        reason: err.to_string(),
    }
}
