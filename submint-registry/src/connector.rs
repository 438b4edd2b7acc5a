//! Wallet connectors.
//!
//! Two ways of obtaining a signing session, mirroring the wallet menu:
//!
//! | Connector        | Signs with                                   |
//! |------------------|----------------------------------------------|
//! | Injected         | A private key held by this process           |
//! | Remote pairing   | A remote signer's `eth_sendTransaction`      |
//!
//! Both hand back a [`Connection`] whose writer talks to the registry
//! contract through the connector's own provider.

use std::sync::Arc;

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::json;
use tracing::{debug, info, instrument, warn};
use zeroize::Zeroizing;

use submint_core::config::{keys, AppConfig};
use submint_core::error::{Result, SubmintError};
use submint_core::traits::{Connection, WalletConnector};
use submint_core::types::{ConnectorKind, WalletSession};

use crate::chain::{ChainRegistry, ContractAddresses};

/// Builds the connector for `kind` from the application config.
pub fn connector_for(kind: ConnectorKind, config: &AppConfig) -> Arc<dyn WalletConnector> {
    match kind {
        ConnectorKind::Injected => Arc::new(InjectedConnector::from_config(config)),
        ConnectorKind::RemotePairing => Arc::new(RemotePairingConnector::from_config(config)),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// INJECTED
// ═══════════════════════════════════════════════════════════════════════════════

/// Connector for a locally held private key.
///
/// The key never leaves the process; transactions are signed locally and
/// broadcast through `wallet_rpc`. Switching networks re-points the wallet
/// at the configured target RPC.
pub struct InjectedConnector {
    private_key: Option<Zeroizing<String>>,
    wallet_rpc: RwLock<String>,
    target_rpc: String,
    contracts: ContractAddresses,
}

impl InjectedConnector {
    /// Creates a connector for `private_key`, signing against `rpc_url`.
    pub fn new(
        private_key: Option<Zeroizing<String>>,
        rpc_url: impl Into<String>,
        contracts: ContractAddresses,
    ) -> Self {
        let rpc_url = rpc_url.into();
        Self {
            private_key,
            wallet_rpc: RwLock::new(rpc_url.clone()),
            target_rpc: rpc_url,
            contracts,
        }
    }

    /// Creates a connector from the application config.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.private_key.clone(),
            config.rpc_url.clone(),
            ContractAddresses::from_config(config),
        )
    }

    /// Starts the wallet on a different RPC than the target one.
    pub fn with_wallet_rpc(self, rpc_url: impl Into<String>) -> Self {
        *self.wallet_rpc.write() = rpc_url.into();
        self
    }

    fn signer(&self) -> Result<PrivateKeySigner> {
        let key = self.private_key.as_ref().ok_or_else(|| {
            SubmintError::ConnectorUnavailable(format!("{} is not set", keys::PRIVATE_KEY))
        })?;

        key.trim()
            .parse::<PrivateKeySigner>()
            .map_err(|e| SubmintError::ConnectorUnavailable(format!("invalid private key: {e}")))
    }

    async fn open(&self) -> Result<Connection> {
        let signer = self.signer()?;
        let account = signer.address();
        let url = self.wallet_rpc.read().clone();

        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::from(signer))
            .on_builtin(&url)
            .await
            .map_err(|e| SubmintError::RpcError(e.to_string()))?;

        let chain_id = provider
            .get_chain_id()
            .await
            .map_err(|e| SubmintError::RpcError(e.to_string()))?;

        info!(%account, chain_id, "Injected wallet connected");

        let writer = ChainRegistry::new(provider, self.contracts).with_account(account);
        Ok(Connection {
            session: WalletSession::connected(ConnectorKind::Injected, account, chain_id),
            writer: Arc::new(writer),
        })
    }
}

#[async_trait]
impl WalletConnector for InjectedConnector {
    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Injected
    }

    #[instrument(skip(self))]
    async fn connect(&self) -> Result<Connection> {
        self.open().await
    }

    #[instrument(skip(self))]
    async fn switch_chain(&self, chain_id: u64) -> Result<Connection> {
        *self.wallet_rpc.write() = self.target_rpc.clone();
        let connection = self.open().await?;

        match connection.session.chain_id {
            Some(actual) if actual != chain_id => Err(SubmintError::WrongNetwork {
                expected: chain_id,
                actual,
            }),
            _ => Ok(connection),
        }
    }

    async fn disconnect(&self) -> Result<()> {
        debug!("Injected wallet disconnected");
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REMOTE PAIRING
// ═══════════════════════════════════════════════════════════════════════════════

/// Connector for a remote signer reached over JSON-RPC.
///
/// The signer owns the keys and the network selection: accounts come from
/// `eth_accounts`, network switches go through `wallet_switchEthereumChain`
/// and transactions through `eth_sendTransaction`. Pairing requires a
/// project identifier; without one the connector refuses to connect.
pub struct RemotePairingConnector {
    signer_url: String,
    project_id: String,
    contracts: ContractAddresses,
}

impl RemotePairingConnector {
    /// Creates a connector for the signer at `signer_url`.
    pub fn new(
        signer_url: impl Into<String>,
        project_id: impl Into<String>,
        contracts: ContractAddresses,
    ) -> Self {
        Self {
            signer_url: signer_url.into(),
            project_id: project_id.into(),
            contracts,
        }
    }

    /// Creates a connector from the application config.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.signer_url.clone(),
            config.pairing_project_id.clone(),
            ContractAddresses::from_config(config),
        )
    }

    fn ensure_paired(&self) -> Result<()> {
        if self.project_id.trim().is_empty() {
            warn!("Remote pairing requested without {}", keys::PAIRING_PROJECT_ID);
            return Err(SubmintError::ConnectorUnavailable(format!(
                "{} is not configured",
                keys::PAIRING_PROJECT_ID
            )));
        }
        Ok(())
    }

    async fn open(&self) -> Result<Connection> {
        self.ensure_paired()?;

        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .on_builtin(&self.signer_url)
            .await
            .map_err(|e| SubmintError::ConnectorUnavailable(format!("{}: {e}", self.signer_url)))?;

        let accounts = provider
            .get_accounts()
            .await
            .map_err(|e| SubmintError::WalletError(e.to_string()))?;
        let account: Address = accounts
            .first()
            .copied()
            .ok_or_else(|| SubmintError::WalletError("remote signer exposes no accounts".into()))?;

        let chain_id = provider
            .get_chain_id()
            .await
            .map_err(|e| SubmintError::WalletError(e.to_string()))?;

        info!(%account, chain_id, project = %self.project_id, "Remote signer paired");

        let writer = ChainRegistry::new(provider, self.contracts).with_account(account);
        Ok(Connection {
            session: WalletSession::connected(ConnectorKind::RemotePairing, account, chain_id),
            writer: Arc::new(writer),
        })
    }
}

#[async_trait]
impl WalletConnector for RemotePairingConnector {
    fn kind(&self) -> ConnectorKind {
        ConnectorKind::RemotePairing
    }

    #[instrument(skip(self))]
    async fn connect(&self) -> Result<Connection> {
        self.open().await
    }

    #[instrument(skip(self))]
    async fn switch_chain(&self, chain_id: u64) -> Result<Connection> {
        self.ensure_paired()?;

        let provider = ProviderBuilder::new()
            .on_builtin(&self.signer_url)
            .await
            .map_err(|e| SubmintError::ConnectorUnavailable(format!("{}: {e}", self.signer_url)))?;

        provider
            .raw_request::<_, serde_json::Value>(
                "wallet_switchEthereumChain".into(),
                (json!({ "chainId": format!("{chain_id:#x}") }),),
            )
            .await
            .map_err(|e| SubmintError::WalletError(e.to_string()))?;

        let connection = self.open().await?;
        match connection.session.chain_id {
            Some(actual) if actual != chain_id => Err(SubmintError::WrongNetwork {
                expected: chain_id,
                actual,
            }),
            _ => Ok(connection),
        }
    }

    async fn disconnect(&self) -> Result<()> {
        debug!(signer = %self.signer_url, "Remote signer released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use submint_core::constants::DEFAULT_SIGNER_URL;
    use test_case::test_case;

    // anvil's first dev account
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn contracts() -> ContractAddresses {
        ContractAddresses {
            registry: Address::repeat_byte(1),
            parent_token: Address::repeat_byte(2),
        }
    }

    #[test]
    fn test_injected_signer_from_key() {
        let connector = InjectedConnector::new(
            Some(Zeroizing::new(DEV_KEY.into())),
            "http://127.0.0.1:8545",
            contracts(),
        );
        let signer = connector.signer().unwrap();
        assert_eq!(
            signer.address(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse::<Address>().unwrap()
        );
    }

    #[tokio::test]
    async fn test_injected_without_key_is_unavailable() {
        let connector = InjectedConnector::new(None, "http://127.0.0.1:8545", contracts());
        let err = connector.connect().await.unwrap_err();
        assert!(matches!(err, SubmintError::ConnectorUnavailable(msg) if msg.contains("PRIVATE_KEY")));
    }

    #[tokio::test]
    async fn test_injected_with_bad_key_is_unavailable() {
        let connector = InjectedConnector::new(
            Some(Zeroizing::new("not-a-key".into())),
            "http://127.0.0.1:8545",
            contracts(),
        );
        assert!(connector.connect().await.is_err());
    }

    #[tokio::test]
    async fn test_remote_pairing_requires_project_id() {
        let connector = RemotePairingConnector::new(DEFAULT_SIGNER_URL, "", contracts());

        let err = connector.connect().await.unwrap_err();
        assert!(matches!(err, SubmintError::ConnectorUnavailable(msg) if msg.contains("PAIRING_PROJECT_ID")));

        assert!(connector.switch_chain(1).await.is_err());
    }

    #[test_case(ConnectorKind::Injected ; "injected")]
    #[test_case(ConnectorKind::RemotePairing ; "remote pairing")]
    fn test_connector_for_kind(kind: ConnectorKind) {
        let config = AppConfig::default();
        assert_eq!(connector_for(kind, &config).kind(), kind);
    }
}
