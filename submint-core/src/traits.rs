//! Common traits for SUBMINT.
//!
//! These traits define the seams between the flows and the outside world
//! (contracts, wallets, ENS), enabling in-memory implementations for tests.

use std::fmt;
use std::sync::Arc;

use alloy::primitives::{Address, TxHash, B256, U256};
use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ConnectorKind, Identity, MintRequest, PriceInputs, WalletSession};

// ═══════════════════════════════════════════════════════════════════════════════
// REGISTRY TRAITS
// ═══════════════════════════════════════════════════════════════════════════════

/// Read-only access to the subdomain registry and parent token.
#[async_trait]
pub trait RegistryReader: Send + Sync {
    /// `HashToIdMap(identifier)`: zero when the name is unregistered.
    async fn hash_to_id(&self, identifier: B256) -> Result<U256>;

    /// `ownerOf(token_id)` on the parent token contract.
    async fn owner_of(&self, token_id: U256) -> Result<Address>;

    /// `DefaultMintPrice(token_id)` on the registry.
    async fn default_mint_price(&self, token_id: U256) -> Result<U256>;

    /// Reads owner and default price together.
    ///
    /// Both reads must succeed; a failure of either fails the whole batch.
    async fn price_inputs(&self, parent_id: U256) -> Result<PriceInputs> {
        let (owner, default_price) = tokio::try_join!(
            self.owner_of(parent_id),
            self.default_mint_price(parent_id),
        )?;
        Ok(PriceInputs { owner, default_price })
    }
}

/// The single state-mutating call, bound to a signing account.
#[async_trait]
pub trait RegistryWriter: Send + Sync {
    /// Account that signs the transaction.
    fn account(&self) -> Address;

    /// Signs and broadcasts `registerSubdomain`; returns once the wallet
    /// has handed back a transaction hash.
    async fn register_subdomain(&self, request: &MintRequest) -> Result<TxHash>;

    /// Waits until `tx` is included. A reverted transaction is an error.
    async fn wait_for_receipt(&self, tx: TxHash) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// WALLET CONNECTOR TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// A live signing session: who is connected and how to write as them.
#[derive(Clone)]
pub struct Connection {
    /// Read-only session view
    pub session: WalletSession,
    /// Writer bound to the session account
    pub writer: Arc<dyn RegistryWriter>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("session", &self.session)
            .field("account", &self.writer.account())
            .finish()
    }
}

/// Interface for obtaining a signing session.
#[async_trait]
pub trait WalletConnector: Send + Sync {
    /// Which kind of connector this is.
    fn kind(&self) -> ConnectorKind;

    /// Establishes a session.
    async fn connect(&self) -> Result<Connection>;

    /// Asks the wallet to move to `chain_id` and returns the refreshed session.
    async fn switch_chain(&self, chain_id: u64) -> Result<Connection>;

    /// Ends the session.
    async fn disconnect(&self) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTITY TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface for display-name and avatar lookup.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolves the identity of `address`. Unknown addresses yield an empty identity.
    async fn lookup(&self, address: Address) -> Result<Identity>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SubmintError;
    use alloy::primitives::address;

    struct FixedReader {
        owner: Option<Address>,
        price: Option<U256>,
    }

    #[async_trait]
    impl RegistryReader for FixedReader {
        async fn hash_to_id(&self, _identifier: B256) -> Result<U256> {
            Ok(U256::ZERO)
        }

        async fn owner_of(&self, _token_id: U256) -> Result<Address> {
            self.owner.ok_or(SubmintError::ReadFailed {
                call: "ownerOf",
                reason: "reverted".into(),
            })
        }

        async fn default_mint_price(&self, _token_id: U256) -> Result<U256> {
            self.price.ok_or(SubmintError::ReadFailed {
                call: "DefaultMintPrice",
                reason: "reverted".into(),
            })
        }
    }

    #[tokio::test]
    async fn test_price_inputs_batches_both_reads() {
        let owner = address!("0000000000000000000000000000000000000abc");
        let reader = FixedReader {
            owner: Some(owner),
            price: Some(U256::from(42u64)),
        };

        let inputs = reader.price_inputs(U256::from(1u64)).await.unwrap();
        assert_eq!(inputs.owner, owner);
        assert_eq!(inputs.default_price, U256::from(42u64));
    }

    #[tokio::test]
    async fn test_price_inputs_fails_when_either_read_fails() {
        let reader = FixedReader {
            owner: Some(Address::ZERO),
            price: None,
        };
        assert!(reader.price_inputs(U256::ZERO).await.is_err());

        let reader = FixedReader {
            owner: None,
            price: Some(U256::from(1u64)),
        };
        assert!(reader.price_inputs(U256::ZERO).await.is_err());
    }
}
