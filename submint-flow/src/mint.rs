//! Mint state machine.
//!
//! ```text
//! Idle ──result──▶ PriceResolving ──both reads ok──▶ ReadyToSubmit
//!                                                        │ submit
//!                                                        ▼
//!          ReadyToSubmit ◀──sign/send failed── AwaitingSignature
//!                                                        │ tx hash
//!                                                        ▼
//!                    Errored ◀──reverted── AwaitingConfirmation ──mined──▶ Confirmed
//! ```
//!
//! Like the search flow this is pure: the runtime performs the reads and
//! the write and feeds their outcomes back in.

use alloy::primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use submint_core::constants::MINT_ERROR_DISPLAY_LEN;
use submint_core::error::{Result, SubmintError};
use submint_core::format::truncate_chars;
use submint_core::types::{MintRequest, PriceInputs, SearchResult, TxLifecycle, WalletSession};

/// Observable phase of the mint flow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "detail", rename_all = "snake_case")]
pub enum MintPhase {
    /// No result to mint.
    Idle,
    /// Owner and default price not known yet (or their read failed).
    PriceResolving,
    /// Everything needed to submit is known.
    ReadyToSubmit,
    /// Waiting for the wallet to sign.
    AwaitingSignature,
    /// Submitted, waiting for inclusion.
    AwaitingConfirmation(TxHash),
    /// Mined successfully.
    Confirmed(TxHash),
    /// Mined but reverted, or the receipt never arrived.
    Errored(String),
}

/// Notification fired when an attempt ends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MintEvent {
    /// The transaction was confirmed.
    Success(TxHash),
    /// Signing, submission or execution failed.
    Failed(String),
}

#[derive(Clone, Debug, Default)]
enum PriceState {
    #[default]
    Unknown,
    Resolving,
    Ready(PriceInputs),
    Failed(String),
}

/// Mint flow for the active search result.
#[derive(Clone, Debug)]
pub struct MintFlow {
    parent_id: U256,
    target_chain_id: u64,
    target: Option<SearchResult>,
    account: Option<Address>,
    chain_id: Option<u64>,
    price: PriceState,
    lifecycle: TxLifecycle,
    last_tx: Option<TxHash>,
    error: Option<String>,
}

impl MintFlow {
    /// Creates a flow minting under `parent_id` on `target_chain_id`.
    pub fn new(parent_id: U256, target_chain_id: u64) -> Self {
        Self {
            parent_id,
            target_chain_id,
            target: None,
            account: None,
            chain_id: None,
            price: PriceState::Unknown,
            lifecycle: TxLifecycle::Idle,
            last_tx: None,
            error: None,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INPUTS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Replaces the result being minted. Ignored while an attempt is in flight.
    pub fn set_target(&mut self, target: Option<SearchResult>) {
        if self.lifecycle.is_in_flight() {
            warn!("Ignoring new search result while a mint is in flight");
            return;
        }

        self.target = target;
        self.lifecycle = TxLifecycle::Idle;
        self.last_tx = None;
        self.error = None;
    }

    /// Tracks the wallet session; the price follows the connected account.
    pub fn session_changed(&mut self, session: &WalletSession) {
        let account = if session.is_connected() { session.address } else { None };
        if account != self.account {
            debug!(?account, "Mint account changed");
        }
        self.account = account;
        self.chain_id = session.chain_id;
    }

    /// Returns the parent id to read price inputs for, if they are needed.
    pub fn begin_price_resolution(&mut self) -> Option<U256> {
        if self.target.is_none() || matches!(self.price, PriceState::Ready(_) | PriceState::Resolving) {
            return None;
        }
        self.price = PriceState::Resolving;
        Some(self.parent_id)
    }

    /// Records the outcome of the batched owner/price read.
    pub fn price_resolved(&mut self, outcome: std::result::Result<PriceInputs, String>) {
        self.price = match outcome {
            Ok(inputs) => PriceState::Ready(inputs),
            Err(message) => {
                warn!(error = %message, "Price inputs unavailable");
                PriceState::Failed(message)
            }
        };
    }

    /// Forces the next [`begin_price_resolution`](Self::begin_price_resolution) to read again.
    pub fn invalidate_price(&mut self) {
        if !matches!(self.price, PriceState::Resolving) {
            self.price = PriceState::Unknown;
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TRANSACTION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Starts a new attempt and returns the call to sign.
    pub fn submit(&mut self) -> Result<MintRequest> {
        let target = self
            .target
            .as_ref()
            .ok_or_else(|| SubmintError::MintUnavailable("no search result".into()))?;
        if target.exists {
            return Err(SubmintError::MintUnavailable(format!("{} is taken", target.full_domain)));
        }
        if self.lifecycle.is_in_flight() {
            return Err(SubmintError::MintUnavailable("a mint is already in flight".into()));
        }

        let account = self.account.ok_or(SubmintError::NotConnected)?;
        if self.chain_id != Some(self.target_chain_id) {
            return Err(SubmintError::WrongNetwork {
                expected: self.target_chain_id,
                actual: self.chain_id.unwrap_or_default(),
            });
        }
        let value = match &self.price {
            PriceState::Ready(inputs) => inputs.price_for(account),
            _ => return Err(SubmintError::PriceUnavailable),
        };

        let request = MintRequest::new(self.parent_id, target.term.clone(), value);
        self.lifecycle = TxLifecycle::Pending;
        self.last_tx = None;
        self.error = None;

        info!(label = %request.label, %value, "Requesting mint signature");
        Ok(request)
    }

    /// The wallet returned a transaction hash.
    pub fn submitted(&mut self, tx: TxHash) {
        if self.lifecycle == TxLifecycle::Pending {
            self.lifecycle = TxLifecycle::Confirming(tx);
            self.last_tx = Some(tx);
        }
    }

    /// Signing or broadcasting failed; the attempt is abandoned.
    pub fn submission_failed(&mut self, message: &str) -> Option<MintEvent> {
        if self.lifecycle != TxLifecycle::Pending {
            return None;
        }

        let shown = truncate_chars(message, MINT_ERROR_DISPLAY_LEN);
        warn!(error = %shown, "Mint submission failed");
        self.lifecycle = TxLifecycle::Idle;
        self.error = Some(shown.clone());
        Some(MintEvent::Failed(shown))
    }

    /// The receipt for `tx` arrived with success status.
    pub fn confirmed(&mut self, tx: TxHash) -> Option<MintEvent> {
        if self.lifecycle != TxLifecycle::Confirming(tx) {
            return None;
        }

        info!(%tx, "Mint confirmed");
        self.lifecycle = TxLifecycle::Confirmed(tx);
        Some(MintEvent::Success(tx))
    }

    /// The receipt for `tx` reverted or never arrived.
    pub fn receipt_failed(&mut self, tx: TxHash, message: &str) -> Option<MintEvent> {
        if self.lifecycle != TxLifecycle::Confirming(tx) {
            return None;
        }

        let shown = truncate_chars(message, MINT_ERROR_DISPLAY_LEN);
        warn!(%tx, error = %shown, "Mint transaction failed");
        self.lifecycle = TxLifecycle::Failed(shown.clone());
        self.error = Some(shown.clone());
        Some(MintEvent::Failed(shown))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // VIEW
    // ═══════════════════════════════════════════════════════════════════════════

    /// Current phase.
    pub fn phase(&self) -> MintPhase {
        match &self.lifecycle {
            TxLifecycle::Pending => return MintPhase::AwaitingSignature,
            TxLifecycle::Confirming(tx) => return MintPhase::AwaitingConfirmation(*tx),
            TxLifecycle::Confirmed(tx) => return MintPhase::Confirmed(*tx),
            TxLifecycle::Failed(message) => return MintPhase::Errored(message.clone()),
            TxLifecycle::Idle => {}
        }

        match (&self.target, &self.price) {
            (None, _) => MintPhase::Idle,
            (Some(_), PriceState::Ready(_)) => MintPhase::ReadyToSubmit,
            (Some(_), _) => MintPhase::PriceResolving,
        }
    }

    /// Price the connected account would pay, once known.
    pub fn price(&self) -> Option<U256> {
        match (&self.price, self.account) {
            (PriceState::Ready(inputs), Some(account)) => Some(inputs.price_for(account)),
            _ => None,
        }
    }

    /// Why the price is unknown, if its read failed.
    pub fn price_error(&self) -> Option<&str> {
        match &self.price {
            PriceState::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Result being minted.
    pub fn target(&self) -> Option<&SearchResult> {
        self.target.as_ref()
    }

    /// Transaction lifecycle of the current attempt.
    pub fn lifecycle(&self) -> &TxLifecycle {
        &self.lifecycle
    }

    /// Hash of the most recent submitted transaction.
    pub fn last_tx(&self) -> Option<TxHash> {
        self.last_tx
    }

    /// Whether the mint button is enabled.
    pub fn can_submit(&self) -> bool {
        let Some(target) = &self.target else {
            return false;
        };
        !target.exists
            && !self.lifecycle.is_in_flight()
            && self.account.is_some()
            && self.chain_id == Some(self.target_chain_id)
            && matches!(self.price, PriceState::Ready(_))
    }

    /// True while the button shows a spinner.
    pub fn shows_spinner(&self) -> bool {
        self.lifecycle.is_in_flight()
    }

    /// Button text.
    pub fn button_label(&self) -> &'static str {
        match self.lifecycle {
            TxLifecycle::Pending => "Waiting for transaction...",
            TxLifecycle::Confirming(_) => "Confirming...",
            _ => "Mint Domain",
        }
    }

    /// Banner shown once a transaction hash exists.
    pub fn tx_banner(&self) -> Option<&'static str> {
        self.last_tx?;
        Some(match self.lifecycle {
            TxLifecycle::Confirming(_) => "Transaction is being confirmed...",
            TxLifecycle::Confirmed(_) => "Transaction confirmed!",
            _ => "Transaction submitted",
        })
    }

    /// Error box text, if the last attempt failed.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|message| {
            if message.is_empty() {
                "Error: Failed to mint domain".to_string()
            } else {
                format!("Error: {message}")
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::B256;
    use submint_core::types::ConnectorKind;

    const PRICE: u64 = 5_000_000_000_000_000;

    fn owner() -> Address {
        Address::repeat_byte(0xaa)
    }

    fn buyer() -> Address {
        Address::repeat_byte(0xbb)
    }

    fn available() -> SearchResult {
        SearchResult::resolved("alice", "alice.example.eth", B256::repeat_byte(1), U256::ZERO)
    }

    fn ready_flow(account: Address) -> MintFlow {
        let mut flow = MintFlow::new(U256::from(9u64), 1);
        flow.session_changed(&WalletSession::connected(ConnectorKind::Injected, account, 1));
        flow.set_target(Some(available()));
        assert_eq!(flow.begin_price_resolution(), Some(U256::from(9u64)));
        flow.price_resolved(Ok(PriceInputs {
            owner: owner(),
            default_price: U256::from(PRICE),
        }));
        flow
    }

    #[test]
    fn test_phases_before_submission() {
        let mut flow = MintFlow::new(U256::from(9u64), 1);
        assert_eq!(flow.phase(), MintPhase::Idle);

        flow.set_target(Some(available()));
        assert_eq!(flow.phase(), MintPhase::PriceResolving);
        flow.begin_price_resolution();
        assert!(flow.begin_price_resolution().is_none());

        flow.price_resolved(Ok(PriceInputs {
            owner: owner(),
            default_price: U256::from(PRICE),
        }));
        assert_eq!(flow.phase(), MintPhase::ReadyToSubmit);
    }

    #[test]
    fn test_price_follows_account() {
        let mut flow = ready_flow(buyer());
        assert_eq!(flow.price(), Some(U256::from(PRICE)));

        flow.session_changed(&WalletSession::connected(ConnectorKind::Injected, owner(), 1));
        assert_eq!(flow.price(), Some(U256::ZERO));

        flow.session_changed(&WalletSession::disconnected());
        assert_eq!(flow.price(), None);
        assert!(!flow.can_submit());
    }

    #[test]
    fn test_submit_builds_paid_request() {
        let mut flow = ready_flow(buyer());
        let request = flow.submit().unwrap();

        assert_eq!(request.parent_id, U256::from(9u64));
        assert_eq!(request.label, "alice");
        assert!(request.extra_data.is_empty());
        assert_eq!(request.value, U256::from(PRICE));
        assert_eq!(flow.phase(), MintPhase::AwaitingSignature);
        assert_eq!(flow.button_label(), "Waiting for transaction...");
        assert!(flow.shows_spinner());
        assert!(!flow.can_submit());
    }

    #[test]
    fn test_owner_mints_for_free() {
        let mut flow = ready_flow(owner());
        assert_eq!(flow.submit().unwrap().value, U256::ZERO);
    }

    #[test]
    fn test_confirmation_path() {
        let mut flow = ready_flow(buyer());
        flow.submit().unwrap();

        let tx = TxHash::repeat_byte(7);
        flow.submitted(tx);
        assert_eq!(flow.phase(), MintPhase::AwaitingConfirmation(tx));
        assert_eq!(flow.button_label(), "Confirming...");
        assert_eq!(flow.tx_banner(), Some("Transaction is being confirmed..."));

        assert_eq!(flow.confirmed(TxHash::repeat_byte(8)), None);
        assert_eq!(flow.confirmed(tx), Some(MintEvent::Success(tx)));
        assert_eq!(flow.phase(), MintPhase::Confirmed(tx));
        assert_eq!(flow.tx_banner(), Some("Transaction confirmed!"));
    }

    #[test]
    fn test_rejected_signature_returns_to_ready() {
        let mut flow = ready_flow(buyer());
        flow.submit().unwrap();

        let event = flow.submission_failed("User rejected the request.").unwrap();
        assert_eq!(event, MintEvent::Failed("User rejected the request.".into()));
        assert_eq!(flow.phase(), MintPhase::ReadyToSubmit);
        assert_eq!(flow.error_message().as_deref(), Some("Error: User rejected the request."));
        assert!(flow.can_submit());

        flow.submit().unwrap();
        assert!(flow.error_message().is_none());
    }

    #[test]
    fn test_reverted_receipt_errors_then_allows_retry() {
        let mut flow = ready_flow(buyer());
        flow.submit().unwrap();
        let tx = TxHash::repeat_byte(7);
        flow.submitted(tx);

        assert!(flow.receipt_failed(tx, "reverted").is_some());
        assert_eq!(flow.phase(), MintPhase::Errored("reverted".into()));
        assert_eq!(flow.tx_banner(), Some("Transaction submitted"));

        assert!(flow.submit().is_ok());
        assert_eq!(flow.phase(), MintPhase::AwaitingSignature);
    }

    #[test]
    fn test_long_errors_are_truncated() {
        let mut flow = ready_flow(buyer());
        flow.submit().unwrap();
        match flow.submission_failed(&"e".repeat(500)) {
            Some(MintEvent::Failed(message)) => {
                assert_eq!(message.chars().count(), MINT_ERROR_DISPLAY_LEN)
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_wrong_chain_blocks_submission() {
        let mut flow = ready_flow(buyer());
        flow.session_changed(&WalletSession::connected(ConnectorKind::Injected, buyer(), 5));

        assert!(!flow.can_submit());
        assert!(matches!(
            flow.submit(),
            Err(SubmintError::WrongNetwork { expected: 1, actual: 5 })
        ));
    }

    #[test]
    fn test_taken_or_missing_result_blocks_submission() {
        let mut flow = ready_flow(buyer());
        flow.set_target(Some(SearchResult::resolved(
            "bob",
            "bob.example.eth",
            B256::repeat_byte(2),
            U256::from(3u64),
        )));
        assert!(matches!(flow.submit(), Err(SubmintError::MintUnavailable(_))));

        flow.set_target(None);
        assert!(!flow.can_submit());
        assert_eq!(flow.phase(), MintPhase::Idle);
    }

    #[test]
    fn test_failed_price_read_blocks_submission() {
        let mut flow = MintFlow::new(U256::from(9u64), 1);
        flow.session_changed(&WalletSession::connected(ConnectorKind::Injected, buyer(), 1));
        flow.set_target(Some(available()));
        flow.begin_price_resolution();
        flow.price_resolved(Err("ownerOf reverted".into()));

        assert_eq!(flow.phase(), MintPhase::PriceResolving);
        assert_eq!(flow.price_error(), Some("ownerOf reverted"));
        assert!(matches!(flow.submit(), Err(SubmintError::PriceUnavailable)));

        assert_eq!(flow.begin_price_resolution(), Some(U256::from(9u64)));
    }
}
