//! Wallet connect flow.
//!
//! Owns the live [`Connection`] and publishes the read-only
//! [`WalletSession`] on a watch channel. Every action is fire-and-forget:
//! failures are logged and the session falls back to a consistent state,
//! nothing is returned to the caller.

use std::sync::Arc;

use alloy::primitives::Address;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use submint_core::traits::{Connection, IdentityResolver, WalletConnector};
use submint_core::types::{ConnectionStatus, ConnectorKind, Identity, WalletSession};

use crate::network::NetworkStatus;

/// What the wallet button does when pressed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "label", rename_all = "snake_case")]
pub enum PrimaryAction {
    /// Open the connector menu.
    Connect,
    /// End the session.
    Disconnect,
    /// Move the wallet to the target chain.
    SwitchNetwork(String),
}

impl PrimaryAction {
    /// Button text.
    pub fn label(&self) -> String {
        match self {
            PrimaryAction::Connect => "Connect Wallet".into(),
            PrimaryAction::Disconnect => "Disconnect".into(),
            PrimaryAction::SwitchNetwork(label) => label.clone(),
        }
    }
}

/// Rendered state of the wallet button.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletView {
    /// Action bound to the button
    pub action: PrimaryAction,
    /// Name or shortened address of the connected account
    pub display: Option<String>,
    /// Reachable avatar URL
    pub avatar: Option<String>,
    /// Whether a placeholder swatch stands in for the avatar
    pub placeholder: bool,
    /// True while a connect request is outstanding
    pub connecting: bool,
}

/// Wallet controller.
pub struct WalletController {
    connectors: Vec<Arc<dyn WalletConnector>>,
    identity: Option<Arc<dyn IdentityResolver>>,
    target_chain_id: u64,
    connection: RwLock<Option<Connection>>,
    resolved: RwLock<Identity>,
    session: watch::Sender<WalletSession>,
}

impl WalletController {
    /// Creates a controller offering `connectors`, minting on `target_chain_id`.
    pub fn new(connectors: Vec<Arc<dyn WalletConnector>>, target_chain_id: u64) -> Self {
        let (session, _) = watch::channel(WalletSession::disconnected());
        Self {
            connectors,
            identity: None,
            target_chain_id,
            connection: RwLock::new(None),
            resolved: RwLock::new(Identity::default()),
            session,
        }
    }

    /// Resolves display names and avatars for connected accounts.
    pub fn with_identity(mut self, resolver: Arc<dyn IdentityResolver>) -> Self {
        self.identity = Some(resolver);
        self
    }

    /// Connector kinds on offer, in menu order.
    pub fn menu(&self) -> Vec<ConnectorKind> {
        self.connectors.iter().map(|c| c.kind()).collect()
    }

    /// Subscribes to session changes.
    pub fn subscribe(&self) -> watch::Receiver<WalletSession> {
        self.session.subscribe()
    }

    /// Current session.
    pub fn session(&self) -> WalletSession {
        self.session.borrow().clone()
    }

    /// Live connection, if any.
    pub fn connection(&self) -> Option<Connection> {
        self.connection.read().clone()
    }

    /// Identity of the connected account.
    pub fn identity(&self) -> Identity {
        self.resolved.read().clone()
    }

    /// Network status of the current session.
    pub fn network(&self) -> NetworkStatus {
        NetworkStatus::new(self.target_chain_id, &self.session.borrow())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ACTIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Connects through the connector of `kind`.
    #[instrument(skip(self))]
    pub async fn connect(&self, kind: ConnectorKind) {
        let Some(connector) = self.connector(kind) else {
            error!(%kind, "Connector not offered");
            return;
        };

        self.session.send_replace(WalletSession::connecting(kind));

        match connector.connect().await {
            Ok(connection) => self.install(connection).await,
            Err(e) => {
                error!(%kind, error = %e, "Connection error");
                self.reset();
            }
        }
    }

    /// Ends the session.
    #[instrument(skip(self))]
    pub async fn disconnect(&self) {
        let kind = self.session.borrow().connector;
        if let Some(connector) = kind.and_then(|k| self.connector(k)) {
            if let Err(e) = connector.disconnect().await {
                error!(error = %e, "Disconnect error");
            }
        }
        self.reset();
        info!("Wallet disconnected");
    }

    /// Asks the wallet to move to the target chain.
    #[instrument(skip(self))]
    pub async fn switch_network(&self) {
        let Some(connector) = self.session.borrow().connector.and_then(|k| self.connector(k)) else {
            warn!("Switch requested without a connected wallet");
            return;
        };

        match connector.switch_chain(self.target_chain_id).await {
            Ok(connection) => self.install(connection).await,
            Err(e) => error!(chain_id = self.target_chain_id, error = %e, "Network switch error"),
        }
    }

    /// Runs the button's current action. `Connect` needs a menu choice and
    /// is a no-op here.
    pub async fn primary_action(&self) {
        match self.view().action {
            PrimaryAction::Connect => debug!("Connect needs a connector choice"),
            PrimaryAction::Disconnect => self.disconnect().await,
            PrimaryAction::SwitchNetwork(_) => self.switch_network().await,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // VIEW
    // ═══════════════════════════════════════════════════════════════════════════

    /// Renders the wallet button.
    pub fn view(&self) -> WalletView {
        let session = self.session();
        let network = self.network();

        let Some(address) = session.address.filter(|_| session.is_connected()) else {
            return WalletView {
                action: PrimaryAction::Connect,
                display: None,
                avatar: None,
                placeholder: true,
                connecting: session.status == ConnectionStatus::Connecting,
            };
        };

        if !network.is_correct_network() {
            return WalletView {
                action: PrimaryAction::SwitchNetwork(network.switch_label()),
                display: None,
                avatar: None,
                placeholder: true,
                connecting: false,
            };
        }

        let identity = self.identity();
        WalletView {
            action: PrimaryAction::Disconnect,
            display: Some(identity.display_label(&address)),
            placeholder: identity.uses_placeholder(),
            avatar: identity.avatar,
            connecting: false,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNALS
    // ═══════════════════════════════════════════════════════════════════════════

    fn connector(&self, kind: ConnectorKind) -> Option<Arc<dyn WalletConnector>> {
        self.connectors.iter().find(|c| c.kind() == kind).cloned()
    }

    async fn install(&self, connection: Connection) {
        let session = connection.session.clone();
        *self.connection.write() = Some(connection);

        if let Some(address) = session.address {
            let identity = self.lookup(address).await;
            *self.resolved.write() = identity;
        }

        info!(address = ?session.address, chain_id = ?session.chain_id, "Wallet session updated");
        self.session.send_replace(session);
    }

    async fn lookup(&self, address: Address) -> Identity {
        let Some(resolver) = &self.identity else {
            return Identity::default();
        };

        match resolver.lookup(address).await {
            Ok(identity) => identity,
            Err(e) => {
                warn!(%address, error = %e, "Identity lookup failed");
                Identity::default()
            }
        }
    }

    fn reset(&self) {
        *self.connection.write() = None;
        *self.resolved.write() = Identity::default();
        self.session.send_replace(WalletSession::disconnected());
    }
}
