//! Wiring of configuration, registry reader and wallet.

use std::path::Path;
use std::sync::Arc;

use alloy::primitives::{address, Address, U256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::transports::BoxTransport;
use anyhow::{Context, Result};
use tracing::{info, warn};

use submint_core::config::AppConfig;
use submint_core::traits::{RegistryReader, WalletConnector};
use submint_core::types::ConnectorKind;
use submint_ens::EnsIdentityResolver;
use submint_flow::WalletController;
use submint_registry::{connector_for, ChainRegistry, ContractAddresses, MemoryConnector, MemoryRegistry};

/// Parent domain used when running offline without `PARENT_DOMAIN`.
const OFFLINE_PARENT: &str = "example.eth";

/// Account the offline wallet signs as (anvil's first dev account).
const OFFLINE_ACCOUNT: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

/// Owner of the offline parent token.
const OFFLINE_OWNER: Address = address!("00000000000000000000000000000000000000aa");

/// Default price of the offline registry: 0.01 ETH.
const OFFLINE_PRICE_WEI: u64 = 10_000_000_000_000_000;

/// Names registered up front in the offline registry.
const OFFLINE_TAKEN: &[&str] = &["alice", "vitalik"];

/// Options shared by every command.
pub struct Options<'a> {
    pub env_file: Option<&'a Path>,
    pub rpc_url: Option<&'a str>,
    pub parent_domain: Option<&'a str>,
    pub offline: bool,
}

/// Everything a command needs.
pub struct App {
    pub config: AppConfig,
    pub reader: Arc<dyn RegistryReader>,
    pub wallet: WalletController,
    pub provider: Option<RootProvider<BoxTransport>>,
}

impl App {
    pub async fn build(options: Options<'_>) -> Result<Self> {
        let mut config = match options.env_file {
            Some(path) => AppConfig::from_env_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => AppConfig::from_env(),
        };
        if let Some(url) = options.rpc_url {
            config = config.with_rpc(url);
        }
        if let Some(domain) = options.parent_domain {
            config.parent_domain = domain.trim().to_lowercase();
        }

        if options.offline {
            return Ok(Self::offline(config));
        }

        for key in config.missing_options() {
            warn!(key, "Configuration option missing");
        }

        let provider = ProviderBuilder::new()
            .on_builtin(&config.rpc_url)
            .await
            .with_context(|| format!("Failed to reach RPC at {}", config.rpc_url))?;

        let reader = ChainRegistry::new(provider.clone(), ContractAddresses::from_config(&config));
        let connectors: Vec<Arc<dyn WalletConnector>> = ConnectorKind::ALL
            .into_iter()
            .map(|kind| connector_for(kind, &config))
            .collect();
        let wallet = WalletController::new(connectors, config.chain_id)
            .with_identity(Arc::new(EnsIdentityResolver::new(provider.clone())));

        info!(rpc = %config.rpc_url, parent = %config.parent_domain, "Connected to registry");

        Ok(Self {
            config,
            reader: Arc::new(reader),
            wallet,
            provider: Some(provider),
        })
    }

    /// In-memory registry with a couple of names already taken.
    fn offline(mut config: AppConfig) -> Self {
        if config.parent_domain.is_empty() {
            config.parent_domain = OFFLINE_PARENT.into();
        }

        let registry = Arc::new(
            MemoryRegistry::new(config.parent_domain.clone())
                .with_parent(OFFLINE_OWNER, U256::from(OFFLINE_PRICE_WEI)),
        );
        for label in OFFLINE_TAKEN {
            registry.register(label);
        }

        let connectors: Vec<Arc<dyn WalletConnector>> = ConnectorKind::ALL
            .into_iter()
            .map(|kind| {
                Arc::new(
                    MemoryConnector::new(Arc::clone(&registry), OFFLINE_ACCOUNT)
                        .with_chain(config.chain_id)
                        .with_kind(kind),
                ) as Arc<dyn WalletConnector>
            })
            .collect();
        let wallet = WalletController::new(connectors, config.chain_id);

        info!(parent = %config.parent_domain, "Running against the offline registry");

        Self {
            config,
            reader: registry,
            wallet,
            provider: None,
        }
    }

    /// Chain id reported by the RPC endpoint, when online.
    pub async fn rpc_chain_id(&self) -> Option<u64> {
        let provider = self.provider.as_ref()?;
        match provider.get_chain_id().await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "Failed to read chain id");
                None
            }
        }
    }
}
