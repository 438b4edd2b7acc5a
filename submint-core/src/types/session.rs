//! Wallet session and identity types.

use std::fmt;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::format::shorten_address;

/// The two ways of obtaining a signing session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectorKind {
    /// A key held by this process, the terminal analogue of a browser-injected wallet.
    Injected,
    /// A remote signer reached over JSON-RPC after pairing.
    RemotePairing,
}

impl ConnectorKind {
    /// All connector kinds, in menu order.
    pub const ALL: [ConnectorKind; 2] = [ConnectorKind::Injected, ConnectorKind::RemotePairing];

    /// Menu label for this connector.
    pub fn label(&self) -> &'static str {
        match self {
            ConnectorKind::Injected => "MetaMask (injected key)",
            ConnectorKind::RemotePairing => "WalletConnect (remote signer)",
        }
    }
}

impl fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectorKind::Injected => "injected",
            ConnectorKind::RemotePairing => "remote-pairing",
        })
    }
}

/// Connection status of the wallet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// No wallet connected.
    #[default]
    Disconnected,
    /// A connect request is outstanding.
    Connecting,
    /// A signing session is available.
    Connected,
}

/// Read-only view of the wallet session.
///
/// Owned by the connector; flows only read it and react to changes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSession {
    /// Connected account
    pub address: Option<Address>,
    /// Chain the wallet is currently on
    pub chain_id: Option<u64>,
    /// Connection status
    pub status: ConnectionStatus,
    /// Connector that produced the session
    pub connector: Option<ConnectorKind>,
}

impl WalletSession {
    /// A session with nothing connected.
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// A session that is waiting on `connector`.
    pub fn connecting(connector: ConnectorKind) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            connector: Some(connector),
            ..Default::default()
        }
    }

    /// A connected session.
    pub fn connected(connector: ConnectorKind, address: Address, chain_id: u64) -> Self {
        Self {
            address: Some(address),
            chain_id: Some(chain_id),
            status: ConnectionStatus::Connected,
            connector: Some(connector),
        }
    }

    /// Returns true if a signing session is available.
    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected && self.address.is_some()
    }
}

/// Display identity resolved for an address.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Primary ENS name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Reachable avatar URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl Identity {
    /// Name when known, otherwise the shortened address.
    pub fn display_label(&self, address: &Address) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => shorten_address(address),
        }
    }

    /// Returns true when no avatar resolved and a placeholder swatch is shown.
    pub fn uses_placeholder(&self) -> bool {
        self.avatar.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const VITALIK: Address = address!("d8dA6BF26964aF9D7eEd9e03E53415D37aA96045");

    #[test]
    fn test_session_lifecycle() {
        let session = WalletSession::disconnected();
        assert!(!session.is_connected());

        let session = WalletSession::connecting(ConnectorKind::Injected);
        assert_eq!(session.status, ConnectionStatus::Connecting);
        assert!(!session.is_connected());

        let session = WalletSession::connected(ConnectorKind::Injected, VITALIK, 1);
        assert!(session.is_connected());
        assert_eq!(session.chain_id, Some(1));
    }

    #[test]
    fn test_display_label_falls_back_to_short_address() {
        let identity = Identity::default();
        assert_eq!(identity.display_label(&VITALIK), "0xd8dA...6045");
        assert!(identity.uses_placeholder());

        let identity = Identity {
            name: Some("vitalik.eth".into()),
            avatar: Some("https://example.com/a.png".into()),
        };
        assert_eq!(identity.display_label(&VITALIK), "vitalik.eth");
        assert!(!identity.uses_placeholder());
    }

    #[test]
    fn test_empty_name_is_ignored() {
        let identity = Identity {
            name: Some(String::new()),
            avatar: None,
        };
        assert_eq!(identity.display_label(&VITALIK), "0xd8dA...6045");
    }

    #[test]
    fn test_connector_display() {
        assert_eq!(ConnectorKind::Injected.to_string(), "injected");
        assert_eq!(ConnectorKind::RemotePairing.to_string(), "remote-pairing");
        assert_eq!(ConnectorKind::ALL.len(), 2);
    }
}
