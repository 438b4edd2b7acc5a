//! Mint request and price types.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use serde::{Deserialize, Serialize};

/// The two batched reads that determine the mint price.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceInputs {
    /// Current owner of the parent token
    pub owner: Address,
    /// The registry's default price for the parent
    pub default_price: U256,
}

impl PriceInputs {
    /// Price `account` pays: zero when it owns the parent token.
    ///
    /// Addresses compare by value, so checksum casing never matters.
    pub fn price_for(&self, account: Address) -> U256 {
        if account == self.owner {
            U256::ZERO
        } else {
            self.default_price
        }
    }
}

/// Arguments of one `registerSubdomain` call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintRequest {
    /// Token id of the parent domain
    pub parent_id: U256,
    /// Subdomain label to register
    pub label: String,
    /// Extra resolver data; always empty
    pub extra_data: Vec<Bytes>,
    /// Value attached to the call (the resolved price)
    pub value: U256,
}

impl MintRequest {
    /// Creates a request with an empty extra-data payload.
    pub fn new(parent_id: U256, label: impl Into<String>, value: U256) -> Self {
        Self {
            parent_id,
            label: label.into(),
            extra_data: Vec::new(),
            value,
        }
    }
}

/// Lifecycle of one mint transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "detail", rename_all = "lowercase")]
pub enum TxLifecycle {
    /// No attempt in progress.
    #[default]
    Idle,
    /// Signature requested from the wallet.
    Pending,
    /// Submitted, waiting for inclusion.
    Confirming(TxHash),
    /// Included successfully.
    Confirmed(TxHash),
    /// Signing, submission or execution failed.
    Failed(String),
}

impl TxLifecycle {
    /// True while the attempt still needs the wallet or the chain.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, TxLifecycle::Pending | TxLifecycle::Confirming(_))
    }

    /// Transaction hash, once one exists.
    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            TxLifecycle::Confirming(tx) | TxLifecycle::Confirmed(tx) => Some(*tx),
            _ => None,
        }
    }
}
