//! Async drivers for the flows.
//!
//! The search flow runs as a single task that multiplexes three sources
//! with `tokio::select!`: commands from the front end, the flow's next
//! timer deadline, and completed existence reads. Reads are never
//! cancelled; the flow discards answers that arrive for an abandoned term.

use std::sync::Arc;

use alloy::primitives::{B256, U256};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, instrument, warn};

use submint_core::error::{Result, SubmintError};
use submint_core::traits::{RegistryReader, RegistryWriter};
use submint_core::types::SearchResult;

use crate::mint::{MintEvent, MintFlow};
use crate::search::{sanitize, SearchFlow, SearchPhase, SearchStatus};

const COMMAND_BUFFER: usize = 64;

// ═══════════════════════════════════════════════════════════════════════════════
// SEARCH DRIVER
// ═══════════════════════════════════════════════════════════════════════════════

/// Commands accepted by the search task.
#[derive(Debug)]
pub enum SearchCommand {
    /// The box now contains this text.
    Input(String),
    /// Search button pressed.
    Submit(oneshot::Sender<Option<SearchResult>>),
    /// "Proceed with Mint Anyway" pressed.
    ProceedAnyway(oneshot::Sender<Option<SearchResult>>),
    /// Clear button pressed.
    Clear,
}

/// Point-in-time view of the search flow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SearchSnapshot {
    /// Sanitized term in the box
    pub term: String,
    /// Current phase
    pub phase: SearchPhase,
    /// Status line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SearchStatus>,
    /// Whether the search button is enabled
    pub can_submit: bool,
    /// Whether proceed-anyway is offered
    pub can_proceed: bool,
}

impl SearchSnapshot {
    /// Captures the view of `flow`.
    pub fn of(flow: &SearchFlow) -> Self {
        Self {
            term: flow.term().to_string(),
            phase: flow.phase(),
            status: flow.status(),
            can_submit: flow.can_submit(),
            can_proceed: flow.can_proceed(),
        }
    }
}

/// Front-end handle to a running search task.
#[derive(Clone, Debug)]
pub struct SearchHandle {
    commands: mpsc::Sender<SearchCommand>,
    snapshots: watch::Receiver<SearchSnapshot>,
}

impl SearchHandle {
    /// Sends a keystroke.
    pub async fn input(&self, raw: impl Into<String>) -> Result<()> {
        self.send(SearchCommand::Input(raw.into())).await
    }

    /// Presses the search button.
    pub async fn submit(&self) -> Result<Option<SearchResult>> {
        let (tx, rx) = oneshot::channel();
        self.send(SearchCommand::Submit(tx)).await?;
        rx.await.map_err(|_| stopped())
    }

    /// Presses "proceed anyway".
    pub async fn proceed_anyway(&self) -> Result<Option<SearchResult>> {
        let (tx, rx) = oneshot::channel();
        self.send(SearchCommand::ProceedAnyway(tx)).await?;
        rx.await.map_err(|_| stopped())
    }

    /// Presses the clear button.
    pub async fn clear(&self) -> Result<()> {
        self.send(SearchCommand::Clear).await
    }

    /// Latest snapshot.
    pub fn snapshot(&self) -> SearchSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Subscribes to snapshots.
    pub fn subscribe(&self) -> watch::Receiver<SearchSnapshot> {
        self.snapshots.clone()
    }

    /// Waits for the first snapshot satisfying `predicate`.
    pub async fn wait_for(&self, predicate: impl FnMut(&SearchSnapshot) -> bool) -> Result<SearchSnapshot> {
        let mut rx = self.snapshots.clone();
        let snapshot = rx.wait_for(predicate).await.map_err(|_| stopped())?;
        Ok(snapshot.clone())
    }

    /// Types `raw` and waits until its answer (or error) is in.
    pub async fn search(&self, raw: &str) -> Result<SearchSnapshot> {
        let term = sanitize(raw);
        self.input(raw).await?;
        self.wait_for(|s| s.term == term && !s.phase.is_busy()).await
    }

    async fn send(&self, command: SearchCommand) -> Result<()> {
        self.commands.send(command).await.map_err(|_| stopped())
    }
}

fn stopped() -> SubmintError {
    SubmintError::InternalError("search task stopped".into())
}

/// Starts the search task for `parent_domain`.
pub fn spawn_search(
    reader: Arc<dyn RegistryReader>,
    parent_domain: impl Into<String>,
) -> (SearchHandle, JoinHandle<()>) {
    let flow = SearchFlow::new(parent_domain);
    let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
    let (snapshots_tx, snapshots_rx) = watch::channel(SearchSnapshot::of(&flow));

    let task = tokio::spawn(drive_search(flow, reader, commands_rx, snapshots_tx));
    let handle = SearchHandle {
        commands: commands_tx,
        snapshots: snapshots_rx,
    };
    (handle, task)
}

/// Runs the search flow until every command sender is dropped.
#[instrument(skip_all, fields(parent = %flow.parent_domain()))]
pub async fn drive_search(
    mut flow: SearchFlow,
    reader: Arc<dyn RegistryReader>,
    mut commands: mpsc::Receiver<SearchCommand>,
    snapshots: watch::Sender<SearchSnapshot>,
) {
    let mut reads: JoinSet<(B256, std::result::Result<U256, String>)> = JoinSet::new();

    loop {
        let deadline = flow.next_deadline();

        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                match command {
                    SearchCommand::Input(raw) => {
                        flow.input(&raw, Instant::now());
                    }
                    SearchCommand::Submit(reply) => {
                        let _ = reply.send(flow.submit());
                    }
                    SearchCommand::ProceedAnyway(reply) => {
                        let _ = reply.send(flow.proceed_anyway());
                    }
                    SearchCommand::Clear => flow.clear(),
                }
            }
            _ = sleep_until_deadline(deadline) => {
                if let Some(query) = flow.tick(Instant::now()) {
                    let reader = Arc::clone(&reader);
                    let identifier = query.identifier;
                    reads.spawn(async move {
                        let outcome = reader.hash_to_id(identifier).await.map_err(|e| e.to_string());
                        (identifier, outcome)
                    });
                    flow.query_started(identifier);
                    debug!(full_domain = %query.full_domain, "Existence read issued");
                }
            }
            Some(joined) = reads.join_next() => {
                match joined {
                    Ok((identifier, outcome)) => {
                        flow.query_settled(identifier, outcome, Instant::now());
                    }
                    Err(e) => warn!(error = %e, "Existence read task failed"),
                }
            }
        }

        snapshots.send_replace(SearchSnapshot::of(&flow));
    }

    debug!("Search task stopped");
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MINT DRIVER
// ═══════════════════════════════════════════════════════════════════════════════

/// Reads the price inputs if the mint flow needs them.
pub async fn refresh_price(mint: &mut MintFlow, reader: &dyn RegistryReader) {
    if let Some(parent_id) = mint.begin_price_resolution() {
        let outcome = reader.price_inputs(parent_id).await.map_err(|e| e.to_string());
        mint.price_resolved(outcome);
    }
}

/// Runs one mint attempt to completion.
///
/// `observe` is called after every transition so the caller can render
/// the spinner text. Returns `Err` only when the flow refuses to start.
pub async fn run_mint(
    mint: &mut MintFlow,
    writer: &dyn RegistryWriter,
    mut observe: impl FnMut(&MintFlow),
) -> Result<MintEvent> {
    let request = mint.submit()?;
    observe(mint);

    let tx = match writer.register_subdomain(&request).await {
        Ok(tx) => tx,
        Err(e) => {
            let message = e.to_string();
            let event = mint
                .submission_failed(&message)
                .unwrap_or(MintEvent::Failed(message));
            observe(mint);
            return Ok(event);
        }
    };

    mint.submitted(tx);
    observe(mint);

    let event = match writer.wait_for_receipt(tx).await {
        Ok(()) => mint.confirmed(tx).unwrap_or(MintEvent::Success(tx)),
        Err(e) => {
            let message = e.to_string();
            mint.receipt_failed(tx, &message)
                .unwrap_or(MintEvent::Failed(message))
        }
    };
    observe(mint);

    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use alloy::primitives::Address;
    use submint_core::constants::{PROCEED_ANYWAY_DELAY, SEARCH_DEBOUNCE};
    use submint_core::types::{Availability, ConnectorKind, WalletSession};
    use submint_ens::namehash;
    use submint_registry::{Faults, MemoryRegistry};

    use crate::mint::MintPhase;

    const PRICE: u64 = 1_000_000_000_000_000;

    fn owner() -> Address {
        Address::repeat_byte(0xaa)
    }

    fn buyer() -> Address {
        Address::repeat_byte(0xbb)
    }

    fn registry() -> Arc<MemoryRegistry> {
        Arc::new(MemoryRegistry::new("example.eth").with_parent(owner(), U256::from(PRICE)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_taken_name_is_reported() {
        let registry = registry();
        registry.register("alice");
        let (search, _task) = spawn_search(registry.clone(), "example.eth");

        let snapshot = search.search("alice").await.unwrap();

        assert_eq!(snapshot.phase, SearchPhase::Resolved(Availability::Taken));
        assert_eq!(snapshot.status, Some(SearchStatus::Taken));
        assert!(!snapshot.can_submit);
        assert_eq!(search.submit().await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_available_name_is_submitted() {
        let registry = registry();
        let (search, _task) = spawn_search(registry.clone(), "example.eth");

        let snapshot = search.search("Alice").await.unwrap();
        assert_eq!(snapshot.phase, SearchPhase::Resolved(Availability::Available));

        let result = search.submit().await.unwrap().unwrap();
        assert_eq!(result.full_domain, "alice.example.eth");
        assert_eq!(result.identifier, namehash("alice.example.eth"));
        assert!(!result.exists);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_edits_issues_one_read() {
        let registry = registry();
        let (search, _task) = spawn_search(registry.clone(), "example.eth");

        for prefix in ["a", "al", "ali", "alic", "alice"] {
            search.input(prefix).await.unwrap();
            tokio::time::sleep(SEARCH_DEBOUNCE / 5).await;
        }
        search.search("alice").await.unwrap();

        assert_eq!(registry.lookup_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_error_unlocks_proceed_after_five_seconds() {
        let registry = registry();
        registry.set_faults(Faults {
            fail_lookups: true,
            ..Default::default()
        });
        let (search, _task) = spawn_search(registry.clone(), "example.eth");

        let snapshot = search.search("alice").await.unwrap();
        assert_eq!(snapshot.phase, SearchPhase::QueryError);
        assert!(matches!(snapshot.status, Some(SearchStatus::Error(_))));
        assert_eq!(search.proceed_anyway().await.unwrap(), None);

        tokio::time::sleep(PROCEED_ANYWAY_DELAY - Duration::from_millis(100)).await;
        assert!(!search.snapshot().can_proceed);

        let snapshot = search.wait_for(|s| s.can_proceed).await.unwrap();
        assert_eq!(snapshot.status, Some(SearchStatus::Unverifiable));

        let result = search.proceed_anyway().await.unwrap().unwrap();
        assert!(!result.exists);
        assert!(result.raw_contract_value.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_read_for_old_term_is_discarded() {
        let registry = registry();
        registry.register("alice");
        registry.set_faults(Faults {
            read_delay: Some(Duration::from_secs(2)),
            ..Default::default()
        });
        let (search, _task) = spawn_search(registry.clone(), "example.eth");

        search.input("alice").await.unwrap();
        search.wait_for(|s| s.phase == SearchPhase::Querying).await.unwrap();
        search.input("bob").await.unwrap();

        let snapshot = search.search("bob").await.unwrap();
        assert_eq!(snapshot.phase, SearchPhase::Resolved(Availability::Available));

        // The alice read lands after bob's answer and must not flip it.
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(search.snapshot().phase, SearchPhase::Resolved(Availability::Available));
        assert_eq!(search.snapshot().term, "bob");
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_away_and_back_during_read_settles() {
        let registry = registry();
        registry.set_faults(Faults {
            read_delay: Some(Duration::from_secs(2)),
            ..Default::default()
        });
        let (search, _task) = spawn_search(registry.clone(), "example.eth");

        search.input("alice").await.unwrap();
        search.wait_for(|s| s.phase == SearchPhase::Querying).await.unwrap();

        // The answer lands while the box holds a different term.
        tokio::time::sleep(Duration::from_millis(1900)).await;
        search.input("alicex").await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        search.input("alice").await.unwrap();

        let snapshot = tokio::time::timeout(Duration::from_secs(10), search.search("alice"))
            .await
            .expect("search settles")
            .unwrap();
        assert_eq!(snapshot.phase, SearchPhase::Resolved(Availability::Available));
        assert!(snapshot.can_submit);
        assert_eq!(registry.lookup_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_returns_to_empty() {
        let (search, _task) = spawn_search(registry(), "example.eth");
        search.search("alice").await.unwrap();

        search.clear().await.unwrap();
        let snapshot = search.wait_for(|s| s.phase == SearchPhase::Empty).await.unwrap();
        assert!(snapshot.status.is_none());
        assert!(!snapshot.can_submit);
    }

    async fn ready_mint(registry: &Arc<MemoryRegistry>, account: Address) -> MintFlow {
        let mut mint = MintFlow::new(registry.parent_id(), 1);
        mint.session_changed(&WalletSession::connected(ConnectorKind::Injected, account, 1));
        mint.set_target(Some(SearchResult::resolved(
            "alice",
            "alice.example.eth",
            namehash("alice.example.eth"),
            U256::ZERO,
        )));
        refresh_price(&mut mint, registry.as_ref()).await;
        mint
    }

    #[tokio::test]
    async fn test_mint_end_to_end() {
        let registry = registry();
        let mut mint = ready_mint(&registry, buyer()).await;
        assert_eq!(mint.price(), Some(U256::from(PRICE)));

        let writer = registry.writer(buyer());
        let mut seen = Vec::new();
        let event = run_mint(&mut mint, &writer, |m| seen.push(m.phase())).await.unwrap();

        let MintEvent::Success(tx) = event else {
            panic!("expected success, got {event:?}");
        };
        assert!(matches!(seen[0], MintPhase::AwaitingSignature));
        assert_eq!(seen[1], MintPhase::AwaitingConfirmation(tx));
        assert_eq!(seen[2], MintPhase::Confirmed(tx));
        assert!(registry.is_registered("alice"));
    }

    #[tokio::test]
    async fn test_rejected_signature_fires_error_event() {
        let registry = registry();
        let mut mint = ready_mint(&registry, buyer()).await;
        registry.set_faults(Faults {
            reject_signature: true,
            ..Default::default()
        });

        let event = run_mint(&mut mint, &registry.writer(buyer()), |_| {}).await.unwrap();

        assert!(matches!(event, MintEvent::Failed(ref m) if m.contains("User rejected")));
        assert_eq!(mint.phase(), MintPhase::ReadyToSubmit);
        assert!(!registry.is_registered("alice"));
    }

    #[tokio::test]
    async fn test_reverted_mint_ends_errored() {
        let registry = registry();
        let mut mint = ready_mint(&registry, buyer()).await;
        registry.set_faults(Faults {
            revert_transactions: true,
            ..Default::default()
        });

        let event = run_mint(&mut mint, &registry.writer(buyer()), |_| {}).await.unwrap();

        assert!(matches!(event, MintEvent::Failed(_)));
        assert!(matches!(mint.phase(), MintPhase::Errored(_)));
    }

    #[tokio::test]
    async fn test_price_read_failure_blocks_mint() {
        let registry = registry();
        registry.set_faults(Faults {
            fail_price_reads: true,
            ..Default::default()
        });
        let mut mint = ready_mint(&registry, owner()).await;

        assert!(mint.price_error().is_some());
        let err = run_mint(&mut mint, &registry.writer(owner()), |_| {}).await.unwrap_err();
        assert!(matches!(err, SubmintError::PriceUnavailable));
    }
}
