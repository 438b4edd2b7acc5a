//! Subdomain search state machine.
//!
//! ```text
//! Empty ──input──▶ Typing ──500ms quiet──▶ Debounced ──read issued──▶ Querying
//!                    ▲                                                  │
//!                    └────────────── any edit ◀─────────────────────────┤
//!                                                                       ▼
//!                                     Resolved(available | taken)  or  QueryError
//!                                                                       │ 5s, same term
//!                                                                       ▼
//!                                                                 ProceedAnyway
//! ```
//!
//! The machine is pure: time is passed in and the async read is performed
//! by the caller (see [`crate::runtime::drive_search`]). Read results are
//! matched against the identifier of the current stable term, so a late
//! answer for an abandoned term can never overwrite the current one.

use std::fmt;

use alloy::primitives::{B256, U256};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use submint_core::constants::{PROCEED_ANYWAY_DELAY, SEARCH_DEBOUNCE, SEARCH_ERROR_DISPLAY_LEN};
use submint_core::format::truncate_chars;
use submint_core::types::{Availability, SearchResult};
use submint_ens::namehash;

/// Lower-cases `raw` and strips everything outside `[a-z0-9-]`.
pub fn sanitize(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

/// Observable phase of the search flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "availability", rename_all = "snake_case")]
pub enum SearchPhase {
    /// Nothing typed.
    Empty,
    /// Term changed within the debounce window.
    Typing,
    /// Term is stable; the read has not been issued yet.
    Debounced,
    /// Existence read in flight.
    Querying,
    /// Read answered.
    Resolved(Availability),
    /// Read failed; waiting out the unlock delay.
    QueryError,
    /// Read failed long enough that minting unverified is offered.
    ProceedAnyway,
}

impl SearchPhase {
    /// True while an answer for the current term is still pending.
    pub fn is_busy(&self) -> bool {
        matches!(self, SearchPhase::Typing | SearchPhase::Debounced | SearchPhase::Querying)
    }
}

/// Status line shown under the search box.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum SearchStatus {
    /// The name is registered.
    Taken,
    /// The existence read is in flight.
    Checking,
    /// The read failed; the message is already truncated.
    Error(String),
    /// The read kept failing; proceed-anyway is available.
    Unverifiable,
}

impl fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchStatus::Taken => f.write_str("This domain is already taken"),
            SearchStatus::Checking => f.write_str("Checking domain availability..."),
            SearchStatus::Error(message) => write!(
                f,
                "Error checking domain: {message}... Waiting to enable mint option..."
            ),
            SearchStatus::Unverifiable => f.write_str(
                "Unable to verify domain availability due to RPC issues. You can try minting anyway.",
            ),
        }
    }
}

/// An existence read the caller must perform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    /// Key passed to `HashToIdMap`
    pub identifier: B256,
    /// Domain the identifier was derived from
    pub full_domain: String,
}

/// The debounced term and its derived lookup key.
#[derive(Clone, Debug)]
struct StableTerm {
    term: String,
    full_domain: String,
    identifier: B256,
}

#[derive(Clone, Debug)]
enum QueryState {
    Idle,
    Queued,
    Loading,
    Value(U256),
    Failed(String),
}

/// Search flow for one parent domain.
#[derive(Clone, Debug)]
pub struct SearchFlow {
    parent_domain: String,
    term: String,
    stable: Option<StableTerm>,
    query: QueryState,
    debounce_at: Option<Instant>,
    unlock_at: Option<Instant>,
    can_proceed: bool,
}

impl SearchFlow {
    /// Creates an empty flow searching under `parent_domain`.
    pub fn new(parent_domain: impl Into<String>) -> Self {
        Self {
            parent_domain: parent_domain.into(),
            term: String::new(),
            stable: None,
            query: QueryState::Idle,
            debounce_at: None,
            unlock_at: None,
            can_proceed: false,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EVENTS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Applies a keystroke: the box now contains `raw`.
    ///
    /// Returns false if sanitization left the term unchanged.
    pub fn input(&mut self, raw: &str, now: Instant) -> bool {
        let term = sanitize(raw);
        if term == self.term {
            return false;
        }

        self.term = term;
        self.debounce_at = Some(now + SEARCH_DEBOUNCE);
        self.unlock_at = None;
        self.can_proceed = false;
        true
    }

    /// Fires expired timers. Returns the read to issue when the debounce
    /// window closes on a new term.
    pub fn tick(&mut self, now: Instant) -> Option<Query> {
        if self.unlock_at.is_some_and(|at| at <= now) {
            self.unlock_at = None;
            if matches!(self.query, QueryState::Failed(_)) && self.is_current() {
                debug!(term = %self.term, "Proceed anyway unlocked");
                self.can_proceed = true;
            }
        }

        match self.debounce_at {
            Some(at) if at <= now => {
                self.debounce_at = None;
                self.settle(now)
            }
            _ => None,
        }
    }

    /// Marks the read for `identifier` as sent.
    pub fn query_started(&mut self, identifier: B256) {
        if self.current_identifier() == Some(identifier) && matches!(self.query, QueryState::Queued) {
            self.query = QueryState::Loading;
        }
    }

    /// Records the answer of a read. Answers for anything but the last
    /// settled term are dropped; returns whether this one was applied.
    ///
    /// The box may have moved on since the read was sent. The answer is
    /// still kept for the settled term so that editing back to it reuses
    /// the answer instead of waiting on a read that will never come.
    pub fn query_settled(
        &mut self,
        identifier: B256,
        outcome: std::result::Result<U256, String>,
        now: Instant,
    ) -> bool {
        if self.stable.as_ref().map(|s| s.identifier) != Some(identifier)
            || !matches!(self.query, QueryState::Queued | QueryState::Loading)
        {
            debug!(%identifier, "Discarding stale lookup result");
            return false;
        }

        match outcome {
            Ok(value) => {
                self.query = QueryState::Value(value);
                self.unlock_at = None;
            }
            Err(message) => {
                self.query = QueryState::Failed(message);
                self.arm_unlock(now);
            }
        }
        true
    }

    /// Builds the result to hand to the page, if submission is allowed.
    ///
    /// A verified result carries the contract value; an unverified one is
    /// only produced when the proceed-anyway affordance is unlocked.
    pub fn submit(&self) -> Option<SearchResult> {
        if !self.can_submit() {
            return None;
        }

        let stable = self.stable.as_ref()?;
        match self.query {
            QueryState::Value(value) => Some(SearchResult::resolved(
                stable.term.clone(),
                stable.full_domain.clone(),
                stable.identifier,
                value,
            )),
            _ => self.proceed_anyway(),
        }
    }

    /// Synthesizes an unverified "available" result after a persistent read error.
    pub fn proceed_anyway(&self) -> Option<SearchResult> {
        if !self.can_proceed || !self.is_current() {
            return None;
        }

        let stable = self.stable.as_ref()?;
        Some(SearchResult::unverified(
            stable.term.clone(),
            stable.full_domain.clone(),
            stable.identifier,
        ))
    }

    /// Empties the box and cancels every pending timer.
    pub fn clear(&mut self) {
        self.term.clear();
        self.stable = None;
        self.query = QueryState::Idle;
        self.debounce_at = None;
        self.unlock_at = None;
        self.can_proceed = false;
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // VIEW
    // ═══════════════════════════════════════════════════════════════════════════

    /// Current sanitized term.
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Parent domain searched under.
    pub fn parent_domain(&self) -> &str {
        &self.parent_domain
    }

    /// Earliest pending timer, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.debounce_at, self.unlock_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> SearchPhase {
        if self.term.is_empty() {
            return SearchPhase::Empty;
        }
        if self.debounce_at.is_some() || !self.is_current() {
            return SearchPhase::Typing;
        }

        match &self.query {
            QueryState::Idle | QueryState::Queued => SearchPhase::Debounced,
            QueryState::Loading => SearchPhase::Querying,
            QueryState::Value(value) => SearchPhase::Resolved(if value.is_zero() {
                Availability::Available
            } else {
                Availability::Taken
            }),
            QueryState::Failed(_) if self.can_proceed => SearchPhase::ProceedAnyway,
            QueryState::Failed(_) => SearchPhase::QueryError,
        }
    }

    /// True while a read for the current term is queued or in flight.
    pub fn is_loading(&self) -> bool {
        self.is_current() && matches!(self.query, QueryState::Queued | QueryState::Loading)
    }

    /// True when the current term has a successful read.
    pub fn is_valid(&self) -> bool {
        self.is_current() && matches!(self.query, QueryState::Value(_))
    }

    /// True when the current term is registered.
    pub fn domain_exists(&self) -> bool {
        self.is_current() && matches!(self.query, QueryState::Value(v) if !v.is_zero())
    }

    /// True once proceed-anyway is unlocked for the current term.
    pub fn can_proceed(&self) -> bool {
        self.can_proceed && self.is_current()
    }

    /// Whether the search button is enabled.
    pub fn can_submit(&self) -> bool {
        !self.term.is_empty()
            && self.debounce_at.is_none()
            && !self.is_loading()
            && !self.domain_exists()
            && (self.is_valid() || self.can_proceed())
    }

    /// Status line for the current state.
    pub fn status(&self) -> Option<SearchStatus> {
        if self.term.is_empty() {
            return None;
        }
        if self.domain_exists() {
            return Some(SearchStatus::Taken);
        }
        if self.is_loading() {
            return Some(SearchStatus::Checking);
        }

        match &self.query {
            QueryState::Failed(_) if self.can_proceed() => Some(SearchStatus::Unverifiable),
            QueryState::Failed(message) if self.is_current() => {
                let shown = if message.is_empty() {
                    "Unknown error".to_string()
                } else {
                    truncate_chars(message, SEARCH_ERROR_DISPLAY_LEN)
                };
                Some(SearchStatus::Error(shown))
            }
            _ => None,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNALS
    // ═══════════════════════════════════════════════════════════════════════════

    fn is_current(&self) -> bool {
        self.stable.as_ref().is_some_and(|s| s.term == self.term)
    }

    fn current_identifier(&self) -> Option<B256> {
        self.stable.as_ref().filter(|s| s.term == self.term).map(|s| s.identifier)
    }

    fn arm_unlock(&mut self, now: Instant) {
        self.can_proceed = false;
        self.unlock_at = Some(now + PROCEED_ANYWAY_DELAY);
    }

    /// The debounce window closed on `self.term`.
    fn settle(&mut self, now: Instant) -> Option<Query> {
        if self.term.is_empty() {
            self.stable = None;
            self.query = QueryState::Idle;
            return None;
        }

        if self.is_current() {
            // Same term came back: keep the answer, restart the unlock clock on errors.
            if matches!(self.query, QueryState::Failed(_)) {
                self.arm_unlock(now);
            }
            return None;
        }

        let full_domain = format!("{}.{}", self.term, self.parent_domain);
        let identifier = namehash(&full_domain);
        self.stable = Some(StableTerm {
            term: self.term.clone(),
            full_domain: full_domain.clone(),
            identifier,
        });
        self.query = QueryState::Queued;

        debug!(%full_domain, %identifier, "Search term settled");
        Some(Query {
            identifier,
            full_domain,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;
    use test_case::test_case;

    fn settled(flow: &mut SearchFlow, raw: &str, now: Instant) -> Option<Query> {
        flow.input(raw, now);
        let query = flow.tick(now + SEARCH_DEBOUNCE);
        if let Some(q) = &query {
            flow.query_started(q.identifier);
        }
        query
    }

    #[test_case("Alice", "alice" ; "lowercases")]
    #[test_case("al ice!", "alice" ; "strips punctuation")]
    #[test_case("my-name-42", "my-name-42" ; "keeps hyphens and digits")]
    #[test_case("émile", "mile" ; "drops non ascii")]
    #[test_case("", "" ; "empty")]
    fn test_sanitize(raw: &str, expected: &str) {
        assert_eq!(sanitize(raw), expected);
    }

    proptest! {
        #[test]
        fn prop_sanitize_output_is_restricted(raw in any::<String>()) {
            let clean = sanitize(&raw);
            prop_assert!(clean.chars().all(|c| matches!(c, 'a'..='z' | '0'..='9' | '-')));
        }

        #[test]
        fn prop_sanitize_is_idempotent(raw in any::<String>()) {
            let once = sanitize(&raw);
            prop_assert_eq!(sanitize(&once), once);
        }
    }

    #[test]
    fn test_debounce_restarts_on_each_keystroke() {
        let start = Instant::now();
        let mut flow = SearchFlow::new("example.eth");

        flow.input("a", start);
        flow.input("al", start + Duration::from_millis(300));
        assert!(flow.tick(start + Duration::from_millis(600)).is_none());
        assert_eq!(flow.phase(), SearchPhase::Typing);

        let query = flow.tick(start + Duration::from_millis(800)).unwrap();
        assert_eq!(query.full_domain, "al.example.eth");
        assert_eq!(query.identifier, namehash("al.example.eth"));
        assert_eq!(flow.phase(), SearchPhase::Debounced);
    }

    #[test]
    fn test_taken_domain_blocks_submission() {
        let now = Instant::now();
        let mut flow = SearchFlow::new("example.eth");
        let query = settled(&mut flow, "alice", now).unwrap();
        assert_eq!(flow.phase(), SearchPhase::Querying);
        assert_eq!(flow.status(), Some(SearchStatus::Checking));

        flow.query_settled(query.identifier, Ok(U256::from(42u64)), now);

        assert_eq!(flow.phase(), SearchPhase::Resolved(Availability::Taken));
        assert_eq!(flow.status().unwrap().to_string(), "This domain is already taken");
        assert!(!flow.can_submit());
        assert!(flow.submit().is_none());
    }

    #[test]
    fn test_available_domain_submits_verified_result() {
        let now = Instant::now();
        let mut flow = SearchFlow::new("example.eth");
        let query = settled(&mut flow, "alice", now).unwrap();
        flow.query_settled(query.identifier, Ok(U256::ZERO), now);

        let result = flow.submit().unwrap();
        assert_eq!(result.full_domain, "alice.example.eth");
        assert!(!result.exists);
        assert_eq!(result.raw_contract_value, Some(U256::ZERO));
        assert_eq!(flow.status(), None);
    }

    #[test]
    fn test_error_unlocks_proceed_after_delay() {
        let now = Instant::now();
        let mut flow = SearchFlow::new("example.eth");
        let query = settled(&mut flow, "alice", now).unwrap();
        flow.query_settled(query.identifier, Err("HTTP request failed: connection refused by peer at upstream".into()), now);

        assert_eq!(flow.phase(), SearchPhase::QueryError);
        assert!(!flow.can_submit());
        let status = flow.status().unwrap().to_string();
        assert!(status.starts_with("Error checking domain: HTTP request failed"));
        assert!(status.ends_with("... Waiting to enable mint option..."));

        flow.tick(now + PROCEED_ANYWAY_DELAY - Duration::from_millis(1));
        assert!(!flow.can_proceed());

        flow.tick(now + PROCEED_ANYWAY_DELAY);
        assert_eq!(flow.phase(), SearchPhase::ProceedAnyway);
        assert_eq!(flow.status(), Some(SearchStatus::Unverifiable));

        let result = flow.proceed_anyway().unwrap();
        assert!(!result.exists);
        assert!(result.raw_contract_value.is_none());
        assert_eq!(flow.submit(), Some(result));
    }

    #[test]
    fn test_error_message_truncated_to_fifty_chars() {
        let now = Instant::now();
        let mut flow = SearchFlow::new("example.eth");
        let query = settled(&mut flow, "alice", now).unwrap();
        flow.query_settled(query.identifier, Err("x".repeat(200)), now);

        match flow.status() {
            Some(SearchStatus::Error(message)) => assert_eq!(message.chars().count(), 50),
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn test_edit_cancels_unlock() {
        let now = Instant::now();
        let mut flow = SearchFlow::new("example.eth");
        let query = settled(&mut flow, "alice", now).unwrap();
        flow.query_settled(query.identifier, Err("boom".into()), now);

        flow.input("alic", now + Duration::from_secs(4));
        flow.tick(now + PROCEED_ANYWAY_DELAY);
        assert!(!flow.can_proceed());
        assert!(flow.proceed_anyway().is_none());
    }

    #[test]
    fn test_stale_result_is_ignored() {
        let now = Instant::now();
        let mut flow = SearchFlow::new("example.eth");
        let old = settled(&mut flow, "alice", now).unwrap();
        let new = settled(&mut flow, "bob", now + Duration::from_secs(1)).unwrap();

        assert!(!flow.query_settled(old.identifier, Ok(U256::from(1u64)), now));
        assert_eq!(flow.phase(), SearchPhase::Querying);

        assert!(flow.query_settled(new.identifier, Ok(U256::ZERO), now));
        assert_eq!(flow.phase(), SearchPhase::Resolved(Availability::Available));
    }

    #[test]
    fn test_returning_to_same_term_reuses_answer() {
        let now = Instant::now();
        let mut flow = SearchFlow::new("example.eth");
        let query = settled(&mut flow, "alice", now).unwrap();
        flow.query_settled(query.identifier, Ok(U256::ZERO), now);

        flow.input("alic", now);
        flow.input("alice", now);
        assert_eq!(flow.phase(), SearchPhase::Typing);
        assert!(!flow.can_submit());

        assert!(flow.tick(now + SEARCH_DEBOUNCE).is_none());
        assert!(flow.can_submit());
    }

    #[test]
    fn test_answer_arriving_after_edit_is_kept_for_the_settled_term() {
        let now = Instant::now();
        let mut flow = SearchFlow::new("example.eth");
        let query = settled(&mut flow, "alice", now).unwrap();

        flow.input("alicex", now);
        assert!(flow.query_settled(query.identifier, Ok(U256::ZERO), now));
        assert_eq!(flow.phase(), SearchPhase::Typing);
        assert_eq!(flow.status(), None);

        flow.input("alice", now);
        assert!(flow.tick(now + SEARCH_DEBOUNCE).is_none());
        assert_eq!(flow.phase(), SearchPhase::Resolved(Availability::Available));
        assert!(!flow.is_loading());
        assert!(flow.can_submit());
    }

    #[test]
    fn test_error_arriving_after_edit_rearms_unlock_on_return() {
        let now = Instant::now();
        let mut flow = SearchFlow::new("example.eth");
        let query = settled(&mut flow, "alice", now).unwrap();

        flow.input("alicex", now);
        flow.query_settled(query.identifier, Err("rpc down".into()), now);

        let back = now + Duration::from_secs(1);
        flow.input("alice", back);
        assert!(flow.tick(back + SEARCH_DEBOUNCE).is_none());
        assert_eq!(flow.phase(), SearchPhase::QueryError);

        flow.tick(back + SEARCH_DEBOUNCE + PROCEED_ANYWAY_DELAY);
        assert!(flow.can_proceed());
        assert!(flow.proceed_anyway().is_some());
    }

    #[test]
    fn test_clear_resets_everything() {
        let now = Instant::now();
        let mut flow = SearchFlow::new("example.eth");
        let query = settled(&mut flow, "alice", now).unwrap();
        flow.query_settled(query.identifier, Err("boom".into()), now);

        flow.clear();
        assert_eq!(flow.phase(), SearchPhase::Empty);
        assert_eq!(flow.next_deadline(), None);
        assert_eq!(flow.status(), None);
        assert!(!flow.can_submit());
    }

    #[test]
    fn test_input_that_sanitizes_to_same_term_is_ignored() {
        let now = Instant::now();
        let mut flow = SearchFlow::new("example.eth");
        assert!(flow.input("alice", now));
        assert!(!flow.input("ALICE!", now));
    }
}
