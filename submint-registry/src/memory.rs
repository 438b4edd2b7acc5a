//! In-memory subdomain registry.
//!
//! Behaves like the deployed contracts closely enough to drive the search
//! and mint flows offline: names map to token ids, the parent token has an
//! owner and a default price, and `registerSubdomain` charges that price
//! unless the caller owns the parent.
//!
//! Faults can be injected to exercise the error paths of the flows.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{keccak256, Address, TxHash, B256, U256};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, info, instrument};

use submint_core::constants::DEFAULT_CHAIN_ID;
use submint_core::error::{Result, SubmintError};
use submint_core::traits::{Connection, RegistryReader, RegistryWriter, WalletConnector};
use submint_core::types::{ConnectorKind, MintRequest, WalletSession};
use submint_ens::{label_id, namehash};

/// Failures to inject into a [`MemoryRegistry`].
#[derive(Clone, Debug, Default)]
pub struct Faults {
    /// `HashToIdMap` fails
    pub fail_lookups: bool,
    /// `ownerOf` and `DefaultMintPrice` fail
    pub fail_price_reads: bool,
    /// The wallet refuses to sign
    pub reject_signature: bool,
    /// Submitted transactions revert
    pub revert_transactions: bool,
    /// Latency added to every read
    pub read_delay: Option<Duration>,
}

/// In-memory registry for a single parent domain.
///
/// # Thread Safety
///
/// All operations are thread-safe and can be called concurrently.
#[derive(Debug)]
pub struct MemoryRegistry {
    /// Parent domain, e.g. `example.eth`
    parent_domain: String,
    /// Token id of the parent domain
    parent_id: U256,
    /// Namehash of a full domain → token id
    domains: DashMap<B256, U256>,
    /// Parent token id → owner
    owners: DashMap<U256, Address>,
    /// Parent token id → default price
    prices: DashMap<U256, U256>,
    /// Transaction hash → whether execution succeeded
    receipts: DashMap<TxHash, bool>,
    /// Next token id for registered names
    next_token: AtomicU64,
    /// Number of `HashToIdMap` reads served
    lookups: AtomicU64,
    /// Injected failures
    faults: RwLock<Faults>,
}

impl MemoryRegistry {
    /// Creates an empty registry for `parent_domain`.
    ///
    /// The parent starts out owned by the zero address with a zero price.
    pub fn new(parent_domain: impl Into<String>) -> Self {
        let parent_domain = parent_domain.into().to_lowercase();
        let parent_id = label_id(&parent_domain);

        Self {
            parent_domain,
            parent_id,
            domains: DashMap::new(),
            owners: DashMap::new(),
            prices: DashMap::new(),
            receipts: DashMap::new(),
            next_token: AtomicU64::new(1),
            lookups: AtomicU64::new(0),
            faults: RwLock::new(Faults::default()),
        }
    }

    /// Sets the owner and default price of the parent token.
    pub fn with_parent(self, owner: Address, default_price: U256) -> Self {
        self.owners.insert(self.parent_id, owner);
        self.prices.insert(self.parent_id, default_price);
        self
    }

    /// Token id of the parent domain.
    pub fn parent_id(&self) -> U256 {
        self.parent_id
    }

    /// Parent domain this registry serves.
    pub fn parent_domain(&self) -> &str {
        &self.parent_domain
    }

    /// Registers `label` directly, bypassing payment. Returns its token id.
    pub fn register(&self, label: &str) -> U256 {
        let token_id = U256::from(self.next_token.fetch_add(1, Ordering::SeqCst));
        self.domains.insert(self.node_of(label), token_id);
        token_id
    }

    /// Returns true if `label` has been registered.
    pub fn is_registered(&self, label: &str) -> bool {
        self.domains.contains_key(&self.node_of(label))
    }

    /// Number of registered names.
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Number of `HashToIdMap` reads served so far.
    pub fn lookup_count(&self) -> u64 {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Replaces the injected faults.
    pub fn set_faults(&self, faults: Faults) {
        *self.faults.write() = faults;
    }

    /// Clears all injected faults.
    pub fn clear_faults(&self) {
        self.set_faults(Faults::default());
    }

    /// Returns a writer that signs as `account`.
    pub fn writer(self: &Arc<Self>, account: Address) -> MemoryWriter {
        MemoryWriter {
            registry: Arc::clone(self),
            account,
        }
    }

    fn node_of(&self, label: &str) -> B256 {
        namehash(&format!("{}.{}", label, self.parent_domain))
    }

    async fn read_latency(&self) {
        let delay = self.faults.read().read_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn price_reads_fail(&self, call: &'static str) -> Result<()> {
        if self.faults.read().fail_price_reads {
            return Err(SubmintError::ReadFailed {
                call,
                reason: "injected failure".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RegistryReader for MemoryRegistry {
    #[instrument(skip(self))]
    async fn hash_to_id(&self, identifier: B256) -> Result<U256> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.read_latency().await;

        if self.faults.read().fail_lookups {
            return Err(SubmintError::ReadFailed {
                call: "HashToIdMap",
                reason: "injected failure".into(),
            });
        }

        Ok(self.domains.get(&identifier).map(|id| *id).unwrap_or_default())
    }

    async fn owner_of(&self, token_id: U256) -> Result<Address> {
        self.read_latency().await;
        self.price_reads_fail("ownerOf")?;

        self.owners
            .get(&token_id)
            .map(|owner| *owner)
            .ok_or_else(|| SubmintError::ReadFailed {
                call: "ownerOf",
                reason: "ERC721: invalid token ID".into(),
            })
    }

    async fn default_mint_price(&self, token_id: U256) -> Result<U256> {
        self.read_latency().await;
        self.price_reads_fail("DefaultMintPrice")?;

        Ok(self.prices.get(&token_id).map(|price| *price).unwrap_or_default())
    }
}

/// [`RegistryWriter`] bound to one account of a [`MemoryRegistry`].
#[derive(Clone, Debug)]
pub struct MemoryWriter {
    registry: Arc<MemoryRegistry>,
    account: Address,
}

#[async_trait]
impl RegistryWriter for MemoryWriter {
    fn account(&self) -> Address {
        self.account
    }

    #[instrument(skip(self, request), fields(label = %request.label))]
    async fn register_subdomain(&self, request: &MintRequest) -> Result<TxHash> {
        let registry = &self.registry;
        let faults = registry.faults.read().clone();

        if faults.reject_signature {
            return Err(SubmintError::WalletError("User rejected the request.".into()));
        }
        if request.parent_id != registry.parent_id {
            return Err(SubmintError::SubmissionFailed("unknown parent id".into()));
        }
        if request.label.is_empty() {
            return Err(SubmintError::SubmissionFailed("empty label".into()));
        }

        let owner = registry.owners.get(&registry.parent_id).map(|o| *o).unwrap_or_default();
        let price = registry.prices.get(&registry.parent_id).map(|p| *p).unwrap_or_default();
        let required = if owner == self.account { U256::ZERO } else { price };

        let nonce = registry.receipts.len() as u64;
        let tx = keccak256(
            [
                self.account.as_slice(),
                request.label.as_bytes(),
                &nonce.to_be_bytes(),
            ]
            .concat(),
        );

        // Execution failures still produce a transaction; they surface on the receipt.
        let succeeded = !faults.revert_transactions
            && request.value >= required
            && !registry.is_registered(&request.label);

        if succeeded {
            let token_id = registry.register(&request.label);
            info!(%tx, %token_id, "Registered subdomain");
        } else {
            debug!(%tx, "Transaction will revert");
        }

        registry.receipts.insert(tx, succeeded);
        Ok(tx)
    }

    async fn wait_for_receipt(&self, tx: TxHash) -> Result<()> {
        match self.registry.receipts.get(&tx).map(|ok| *ok) {
            Some(true) => Ok(()),
            Some(false) => Err(SubmintError::TransactionReverted(tx)),
            None => Err(SubmintError::ReceiptTimeout { tx, seconds: 0 }),
        }
    }
}

/// Wallet connector backed by a [`MemoryRegistry`].
///
/// Used for the offline mode of the CLI and for flow tests.
#[derive(Debug)]
pub struct MemoryConnector {
    registry: Arc<MemoryRegistry>,
    kind: ConnectorKind,
    account: Address,
    chain_id: RwLock<u64>,
    available: bool,
}

impl MemoryConnector {
    /// Creates a connector for `account` on the default chain.
    pub fn new(registry: Arc<MemoryRegistry>, account: Address) -> Self {
        Self {
            registry,
            kind: ConnectorKind::Injected,
            account,
            chain_id: RwLock::new(DEFAULT_CHAIN_ID),
            available: true,
        }
    }

    /// Starts the wallet on another chain.
    pub fn with_chain(self, chain_id: u64) -> Self {
        *self.chain_id.write() = chain_id;
        self
    }

    /// Reports itself as the given connector kind.
    pub fn with_kind(mut self, kind: ConnectorKind) -> Self {
        self.kind = kind;
        self
    }

    /// Makes every connect attempt fail.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    fn connection(&self) -> Connection {
        let chain_id = *self.chain_id.read();
        Connection {
            session: WalletSession::connected(self.kind, self.account, chain_id),
            writer: Arc::new(self.registry.writer(self.account)),
        }
    }
}

#[async_trait]
impl WalletConnector for MemoryConnector {
    fn kind(&self) -> ConnectorKind {
        self.kind
    }

    async fn connect(&self) -> Result<Connection> {
        if !self.available {
            return Err(SubmintError::ConnectorUnavailable(format!("{} is not available", self.kind)));
        }
        Ok(self.connection())
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<Connection> {
        *self.chain_id.write() = chain_id;
        Ok(self.connection())
    }

    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRICE: u64 = 10_000_000_000_000_000;

    fn owner() -> Address {
        Address::repeat_byte(0xaa)
    }

    fn buyer() -> Address {
        Address::repeat_byte(0xbb)
    }

    fn registry() -> Arc<MemoryRegistry> {
        Arc::new(MemoryRegistry::new("example.eth").with_parent(owner(), U256::from(PRICE)))
    }

    #[tokio::test]
    async fn test_lookup_registered_and_free_names() {
        let registry = registry();
        let token_id = registry.register("alice");

        let taken = registry.hash_to_id(namehash("alice.example.eth")).await.unwrap();
        let free = registry.hash_to_id(namehash("bob.example.eth")).await.unwrap();

        assert_eq!(taken, token_id);
        assert!(free.is_zero());
        assert_eq!(registry.lookup_count(), 2);
    }

    #[tokio::test]
    async fn test_price_inputs_for_parent() {
        let registry = registry();
        let inputs = registry.price_inputs(registry.parent_id()).await.unwrap();

        assert_eq!(inputs.owner, owner());
        assert_eq!(inputs.price_for(owner()), U256::ZERO);
        assert_eq!(inputs.price_for(buyer()), U256::from(PRICE));
    }

    #[tokio::test]
    async fn test_paid_mint_registers_name() {
        let registry = registry();
        let writer = registry.writer(buyer());
        let request = MintRequest::new(registry.parent_id(), "bob", U256::from(PRICE));

        let tx = writer.register_subdomain(&request).await.unwrap();
        writer.wait_for_receipt(tx).await.unwrap();

        assert!(registry.is_registered("bob"));
    }

    #[tokio::test]
    async fn test_owner_mints_for_free() {
        let registry = registry();
        let writer = registry.writer(owner());
        let request = MintRequest::new(registry.parent_id(), "carol", U256::ZERO);

        let tx = writer.register_subdomain(&request).await.unwrap();
        assert!(writer.wait_for_receipt(tx).await.is_ok());
    }

    #[tokio::test]
    async fn test_underpaid_mint_reverts() {
        let registry = registry();
        let writer = registry.writer(buyer());
        let request = MintRequest::new(registry.parent_id(), "dave", U256::ZERO);

        let tx = writer.register_subdomain(&request).await.unwrap();
        let err = writer.wait_for_receipt(tx).await.unwrap_err();

        assert!(matches!(err, SubmintError::TransactionReverted(hash) if hash == tx));
        assert!(!registry.is_registered("dave"));
    }

    #[tokio::test]
    async fn test_minting_taken_name_reverts() {
        let registry = registry();
        registry.register("alice");
        let writer = registry.writer(owner());

        let tx = writer
            .register_subdomain(&MintRequest::new(registry.parent_id(), "alice", U256::ZERO))
            .await
            .unwrap();

        assert!(writer.wait_for_receipt(tx).await.is_err());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_injected_faults() {
        let registry = registry();
        registry.set_faults(Faults {
            fail_lookups: true,
            fail_price_reads: true,
            reject_signature: true,
            ..Default::default()
        });

        assert!(registry.hash_to_id(B256::ZERO).await.is_err());
        assert!(registry.price_inputs(registry.parent_id()).await.is_err());

        let err = registry
            .writer(owner())
            .register_subdomain(&MintRequest::new(registry.parent_id(), "x", U256::ZERO))
            .await
            .unwrap_err();
        assert!(err.is_wallet_error());

        registry.clear_faults();
        assert!(registry.hash_to_id(B256::ZERO).await.is_ok());
    }

    #[tokio::test]
    async fn test_connector_switches_chain() {
        let registry = registry();
        let connector = MemoryConnector::new(Arc::clone(&registry), buyer()).with_chain(11_155_111);

        let connection = connector.connect().await.unwrap();
        assert_eq!(connection.session.chain_id, Some(11_155_111));
        assert_eq!(connection.writer.account(), buyer());

        let switched = connector.switch_chain(DEFAULT_CHAIN_ID).await.unwrap();
        assert_eq!(switched.session.chain_id, Some(DEFAULT_CHAIN_ID));
    }

    #[tokio::test]
    async fn test_unavailable_connector() {
        let connector = MemoryConnector::new(registry(), buyer()).unavailable();
        let err = connector.connect().await.unwrap_err();
        assert!(matches!(err, SubmintError::ConnectorUnavailable(_)));
    }
}
