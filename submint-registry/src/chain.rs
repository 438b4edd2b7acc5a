//! On-chain registry client.

use std::marker::PhantomData;
use std::time::Duration;

use alloy::primitives::{Address, TxHash, B256, U256};
use alloy::providers::Provider;
use alloy::sol;
use alloy::transports::Transport;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use submint_core::config::AppConfig;
use submint_core::constants::{RECEIPT_POLL_INTERVAL, RECEIPT_TIMEOUT};
use submint_core::error::{Result, SubmintError};
use submint_core::traits::{RegistryReader, RegistryWriter};
use submint_core::types::MintRequest;

sol! {
    #[sol(rpc)]
    interface ISubdomainRegistry {
        function HashToIdMap(bytes32 domainHash) external view returns (uint256);
        function DefaultMintPrice(uint256 id) external view returns (uint256);
        function registerSubdomain(uint256 parentId, string label, bytes[] extraData) external payable;
    }

    #[sol(rpc)]
    interface IParentToken {
        function ownerOf(uint256 tokenId) external view returns (address);
    }
}

/// Addresses of the two contracts the client talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    /// Subdomain registry
    pub registry: Address,
    /// Token contract owning the parent domain
    pub parent_token: Address,
}

impl ContractAddresses {
    /// Takes the contract addresses from the application config.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            registry: config.registry_address,
            parent_token: config.parent_token_address,
        }
    }
}

/// Registry client over an alloy provider.
///
/// Reads work with any provider. Writes go through whatever signing the
/// provider carries: a wallet filler for a local key, or the node's own
/// `eth_sendTransaction` for a remote signer.
pub struct ChainRegistry<T, P> {
    provider: P,
    contracts: ContractAddresses,
    account: Address,
    poll_interval: Duration,
    receipt_timeout: Duration,
    _transport: PhantomData<fn() -> T>,
}

impl<T, P> ChainRegistry<T, P>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    /// Creates a read-only client.
    pub fn new(provider: P, contracts: ContractAddresses) -> Self {
        Self {
            provider,
            contracts,
            account: Address::ZERO,
            poll_interval: RECEIPT_POLL_INTERVAL,
            receipt_timeout: RECEIPT_TIMEOUT,
            _transport: PhantomData,
        }
    }

    /// Binds the client to the account that signs writes.
    pub fn with_account(mut self, account: Address) -> Self {
        self.account = account;
        self
    }

    /// Overrides receipt polling.
    pub fn with_receipt_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.receipt_timeout = timeout;
        self
    }

    /// Returns the configured contract addresses.
    pub fn contracts(&self) -> &ContractAddresses {
        &self.contracts
    }
}

#[async_trait]
impl<T, P> RegistryReader for ChainRegistry<T, P>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    #[instrument(skip(self))]
    async fn hash_to_id(&self, identifier: B256) -> Result<U256> {
        let registry = ISubdomainRegistry::new(self.contracts.registry, &self.provider);
        let id = registry
            .HashToIdMap(identifier)
            .call()
            .await
            .map_err(|e| read_failed("HashToIdMap", e))?
            ._0;

        debug!(%identifier, %id, "HashToIdMap");
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn owner_of(&self, token_id: U256) -> Result<Address> {
        let token = IParentToken::new(self.contracts.parent_token, &self.provider);
        let owner = token
            .ownerOf(token_id)
            .call()
            .await
            .map_err(|e| read_failed("ownerOf", e))?
            ._0;

        Ok(owner)
    }

    #[instrument(skip(self))]
    async fn default_mint_price(&self, token_id: U256) -> Result<U256> {
        let registry = ISubdomainRegistry::new(self.contracts.registry, &self.provider);
        let price = registry
            .DefaultMintPrice(token_id)
            .call()
            .await
            .map_err(|e| read_failed("DefaultMintPrice", e))?
            ._0;

        Ok(price)
    }
}

#[async_trait]
impl<T, P> RegistryWriter for ChainRegistry<T, P>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    fn account(&self) -> Address {
        self.account
    }

    #[instrument(skip(self, request), fields(label = %request.label, value = %request.value))]
    async fn register_subdomain(&self, request: &MintRequest) -> Result<TxHash> {
        if self.account.is_zero() {
            return Err(SubmintError::NotConnected);
        }

        let registry = ISubdomainRegistry::new(self.contracts.registry, &self.provider);
        let call = registry
            .registerSubdomain(request.parent_id, request.label.clone(), request.extra_data.clone())
            .from(self.account)
            .value(request.value);
        let pending = call
            .send()
            .await
            .map_err(|e| SubmintError::SubmissionFailed(e.to_string()))?;

        let tx = *pending.tx_hash();
        info!(%tx, "Mint transaction submitted");
        Ok(tx)
    }

    #[instrument(skip(self))]
    async fn wait_for_receipt(&self, tx: TxHash) -> Result<()> {
        let deadline = Instant::now() + self.receipt_timeout;

        loop {
            match self.provider.get_transaction_receipt(tx).await {
                Ok(Some(receipt)) => {
                    return if receipt.status() {
                        info!(%tx, "Mint transaction confirmed");
                        Ok(())
                    } else {
                        warn!(%tx, "Mint transaction reverted");
                        Err(SubmintError::TransactionReverted(tx))
                    };
                }
                Ok(None) => debug!(%tx, "Receipt not available yet"),
                Err(e) => debug!(%tx, error = %e, "Receipt poll failed"),
            }

            if Instant::now() >= deadline {
                return Err(SubmintError::ReceiptTimeout {
                    tx,
                    seconds: self.receipt_timeout.as_secs(),
                });
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

fn read_failed(call: &'static str, err: impl std::fmt::Display) -> SubmintError {
    SubmintError::ReadFailed {
        call,
        reason: err.to_string(),
    }
}
