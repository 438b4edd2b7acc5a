//! Network-status check.

use serde::{Deserialize, Serialize};

use submint_core::constants::chain_name;
use submint_core::types::WalletSession;

/// Whether the wallet sits on the one chain minting is allowed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStatus {
    /// Chain the client mints on
    pub target_chain_id: u64,
    /// Chain the wallet reports, if connected
    pub connected_chain_id: Option<u64>,
}

impl NetworkStatus {
    /// Derives the status from the wallet session.
    pub fn new(target_chain_id: u64, session: &WalletSession) -> Self {
        Self {
            target_chain_id,
            connected_chain_id: session.chain_id,
        }
    }

    /// True only when connected to the target chain.
    pub fn is_correct_network(&self) -> bool {
        self.connected_chain_id == Some(self.target_chain_id)
    }

    /// Label of the switch action, e.g. `Switch to Ethereum`.
    pub fn switch_label(&self) -> String {
        format!("Switch to {}", chain_name(self.target_chain_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;
    use submint_core::types::ConnectorKind;
    use test_case::test_case;

    #[test_case(Some(1), true ; "on target")]
    #[test_case(Some(11_155_111), false ; "on sepolia")]
    #[test_case(None, false ; "disconnected")]
    fn test_is_correct_network(chain: Option<u64>, expected: bool) {
        let session = match chain {
            Some(id) => WalletSession::connected(ConnectorKind::Injected, Address::ZERO, id),
            None => WalletSession::disconnected(),
        };
        assert_eq!(NetworkStatus::new(1, &session).is_correct_network(), expected);
    }

    #[test]
    fn test_switch_label_names_target_chain() {
        let status = NetworkStatus::new(1, &WalletSession::disconnected());
        assert_eq!(status.switch_label(), "Switch to Ethereum");
    }
}
