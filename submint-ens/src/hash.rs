//! ENS hashing.
//!
//! ```text
//! labelhash(label) = keccak256(label)
//! namehash("")     = 0x00..00
//! namehash(l.rest) = keccak256(namehash(rest) || labelhash(l))
//! ```
//!
//! The registry keys subdomains by the namehash of the full domain and the
//! parent token by the integer value of the parent's first label hash.

use alloy::primitives::{Address, B256, U256};
use sha3::{Digest, Keccak256};

use submint_core::constants::ENS_REVERSE_SUFFIX;

/// keccak-256 of a single label's UTF-8 bytes.
pub fn labelhash(label: &str) -> B256 {
    B256::from(<[u8; 32]>::from(Keccak256::digest(label.as_bytes())))
}

/// Token id of a domain: the label hash of its first label, as an integer.
///
/// `"example.eth"` hashes `"example"`; a string without dots hashes whole;
/// an empty string hashes the empty label.
pub fn label_id(domain: &str) -> U256 {
    let first = domain.split('.').next().unwrap_or_default();
    U256::from_be_bytes(labelhash(first).0)
}

/// EIP-137 namehash of a dotted name. Empty labels are skipped.
pub fn namehash(name: &str) -> B256 {
    let mut node = [0u8; 32];

    for label in name.rsplit('.') {
        if label.is_empty() {
            continue;
        }

        let mut hasher = Keccak256::new();
        hasher.update(node);
        hasher.update(labelhash(label));
        node = hasher.finalize().into();
    }

    B256::from(node)
}

/// Node of the reverse record for `address` (`<hex>.addr.reverse`).
pub fn reverse_node(address: &Address) -> B256 {
    namehash(&format!("{}.{}", hex::encode(address.as_slice()), ENS_REVERSE_SUFFIX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, b256};
    use test_case::test_case;

    #[test]
    fn test_namehash_empty_is_zero() {
        assert_eq!(namehash(""), B256::ZERO);
    }

    #[test_case("eth", b256!("93cdeb708b7545dc668eb9280176169d1c33cfd8ed6f04690a0bcc88a93fc4ae") ; "eth")]
    #[test_case("foo.eth", b256!("de9b09fd7c5f901e23a3f19fecc54828e9c848539801e86591bd9801b019f84f") ; "foo dot eth")]
    fn test_namehash_known_vectors(name: &str, expected: B256) {
        assert_eq!(namehash(name), expected);
    }

    #[test]
    fn test_labelhash_known_vectors() {
        assert_eq!(
            labelhash("eth"),
            b256!("4f5b812789fc606be1b3b16908db13fc7a9adf7ca72641f84d75b47069d3d7f0")
        );
        assert_eq!(
            labelhash(""),
            b256!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470")
        );
    }

    #[test]
    fn test_label_id_uses_first_label() {
        assert_eq!(label_id("example.eth"), label_id("example"));
        assert_eq!(label_id("example.eth"), U256::from_be_bytes(labelhash("example").0));
        assert_ne!(label_id("example.eth"), label_id("eth"));
    }

    #[test]
    fn test_label_id_is_deterministic() {
        let first = label_id("alice.example.eth");
        for _ in 0..10 {
            assert_eq!(label_id("alice.example.eth"), first);
        }
    }

    #[test]
    fn test_label_id_of_malformed_input_hashes_empty_label() {
        let empty = U256::from_be_bytes(labelhash("").0);
        assert_eq!(label_id(""), empty);
        assert_eq!(label_id(".eth"), empty);
    }

    #[test]
    fn test_namehash_ignores_trailing_dot() {
        assert_eq!(namehash("foo.eth."), namehash("foo.eth"));
    }

    #[test]
    fn test_reverse_node_is_lowercase_hex() {
        let addr = address!("d8dA6BF26964aF9D7eEd9e03E53415D37aA96045");
        let expected = namehash("d8da6bf26964af9d7eed9e03e53415d37aa96045.addr.reverse");
        assert_eq!(reverse_node(&addr), expected);
    }
}
