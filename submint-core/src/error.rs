//! Error types for SUBMINT.
//!
//! This module provides the error hierarchy using `thiserror`.
//! Every error resolves back to an interactive state; nothing here is fatal.

use alloy::primitives::TxHash;
use thiserror::Error;

/// Result type alias using `SubmintError`.
pub type Result<T> = std::result::Result<T, SubmintError>;

/// Main error type for all SUBMINT operations.
#[derive(Debug, Error)]
pub enum SubmintError {
    // ═══════════════════════════════════════════════════════════════════════════
    // CONTRACT READ ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// A read-only contract call failed.
    #[error("Contract read {call} failed: {reason}")]
    ReadFailed { call: &'static str, reason: String },

    /// The mint price has not been resolved yet.
    #[error("Mint price is not available")]
    PriceUnavailable,

    // ═══════════════════════════════════════════════════════════════════════════
    // WALLET ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// No wallet is connected.
    #[error("Wallet is not connected")]
    NotConnected,

    /// Connected to a chain other than the target chain.
    #[error("Wrong network: expected chain {expected}, connected to {actual}")]
    WrongNetwork { expected: u64, actual: u64 },

    /// The selected connector cannot be used with the current configuration.
    #[error("Connector unavailable: {0}")]
    ConnectorUnavailable(String),

    /// The wallet rejected or failed a request.
    #[error("Wallet error: {0}")]
    WalletError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // TRANSACTION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Signing or broadcasting the mint transaction failed.
    #[error("Transaction submission failed: {0}")]
    SubmissionFailed(String),

    /// The transaction was mined but reverted.
    #[error("Transaction {0} reverted")]
    TransactionReverted(TxHash),

    /// No receipt arrived in time.
    #[error("Timed out after {seconds}s waiting for transaction {tx}")]
    ReceiptTimeout { tx: TxHash, seconds: u64 },

    /// A mint was requested while the flow does not allow it.
    #[error("Mint unavailable: {0}")]
    MintUnavailable(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // NETWORK ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// RPC call failed.
    #[error("RPC call failed: {0}")]
    RpcError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal invariant violation (should never happen).
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl SubmintError {
    /// Returns true if this error came from the wallet or its connection.
    pub fn is_wallet_error(&self) -> bool {
        matches!(
            self,
            SubmintError::NotConnected
                | SubmintError::WrongNetwork { .. }
                | SubmintError::ConnectorUnavailable(_)
                | SubmintError::WalletError(_)
        )
    }
}
