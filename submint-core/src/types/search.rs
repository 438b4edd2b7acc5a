//! Search result type.

use alloy::primitives::{B256, U256};
use serde::{Deserialize, Serialize};

/// Availability of a searched subdomain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    /// Nobody holds the subdomain (or its existence could not be verified).
    Available,
    /// The registry already maps the subdomain to a token.
    Taken,
}

impl Availability {
    /// Badge text shown next to a result.
    pub fn label(&self) -> &'static str {
        match self {
            Availability::Available => "Available",
            Availability::Taken => "Taken",
        }
    }
}

/// The outcome of a submitted search.
///
/// # Invariants
/// - `identifier` is the namehash of `full_domain`.
/// - `exists` is true iff `raw_contract_value` is present and non-zero.
///
/// Use [`SearchResult::resolved`] or [`SearchResult::unverified`]; both
/// derive `exists` from the raw value. Other crates cannot build one field
/// by field:
///
/// ```compile_fail
/// use alloy::primitives::B256;
/// use submint_core::types::SearchResult;
///
/// let forged = SearchResult {
///     term: "alice".into(),
///     exists: false,
///     full_domain: "alice.example.eth".into(),
///     identifier: B256::ZERO,
///     raw_contract_value: Some(alloy::primitives::U256::from(1u64)),
/// };
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct SearchResult {
    /// Sanitized label the user searched for
    pub term: String,
    /// Whether the subdomain is already registered
    pub exists: bool,
    /// `term.parent_domain`
    pub full_domain: String,
    /// Registry lookup key derived from `full_domain`
    pub identifier: B256,
    /// Value returned by `HashToIdMap`, if the read succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_contract_value: Option<U256>,
}

impl SearchResult {
    /// Builds a result from a successful existence read.
    pub fn resolved(
        term: impl Into<String>,
        full_domain: impl Into<String>,
        identifier: B256,
        raw: U256,
    ) -> Self {
        Self::from_raw(term, full_domain, identifier, Some(raw))
    }

    /// Builds the "proceed anyway" result: existence is assumed false and
    /// the raw value is left undefined.
    pub fn unverified(term: impl Into<String>, full_domain: impl Into<String>, identifier: B256) -> Self {
        Self::from_raw(term, full_domain, identifier, None)
    }

    fn from_raw(
        term: impl Into<String>,
        full_domain: impl Into<String>,
        identifier: B256,
        raw_contract_value: Option<U256>,
    ) -> Self {
        Self {
            term: term.into(),
            exists: raw_contract_value.is_some_and(|v| !v.is_zero()),
            full_domain: full_domain.into(),
            identifier,
            raw_contract_value,
        }
    }

    /// Availability badge for this result.
    pub fn availability(&self) -> Availability {
        if self.exists {
            Availability::Taken
        } else {
            Availability::Available
        }
    }

    /// True when existence was actually read from the registry.
    pub fn is_verified(&self) -> bool {
        self.raw_contract_value.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(U256::ZERO, false ; "zero is available")]
    #[test_case(U256::from(1), true ; "one is taken")]
    #[test_case(U256::MAX, true ; "max is taken")]
    fn test_exists_follows_raw_value(raw: U256, exists: bool) {
        let result = SearchResult::resolved("alice", "alice.example.eth", B256::ZERO, raw);
        assert_eq!(result.exists, exists);
        assert!(result.is_verified());
    }

    #[test]
    fn test_unverified_is_available() {
        let result = SearchResult::unverified("alice", "alice.example.eth", B256::ZERO);
        assert!(!result.exists);
        assert_eq!(result.raw_contract_value, None);
        assert_eq!(result.availability(), Availability::Available);
        assert!(!result.is_verified());
    }

    #[test]
    fn test_availability_label() {
        let taken = SearchResult::resolved("bob", "bob.example.eth", B256::ZERO, U256::from(7));
        assert_eq!(taken.availability().label(), "Taken");
    }

    #[test]
    fn test_json_skips_missing_raw_value() {
        let result = SearchResult::unverified("alice", "alice.example.eth", B256::ZERO);
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("raw_contract_value").is_none());
        assert_eq!(json["full_domain"], "alice.example.eth");
    }
}
