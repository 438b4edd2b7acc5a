//! Short-lived memo of resolved identities.
//!
//! Reconnecting the same wallet should not repeat three contract reads and
//! an HTTP probe. Entries expire after a fixed TTL; when the map is full the
//! stalest entry makes room.

use std::collections::HashMap;
use std::time::Duration;

use alloy::primitives::Address;
use parking_lot::RwLock;
use tokio::time::Instant;

use submint_core::types::Identity;

pub(crate) struct IdentityCache {
    ttl: Duration,
    capacity: usize,
    entries: RwLock<HashMap<Address, (Identity, Instant)>>,
}

impl IdentityCache {
    pub(crate) fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Identity stored for `address`, unless it has expired.
    pub(crate) fn get(&self, address: &Address) -> Option<Identity> {
        let entries = self.entries.read();
        let (identity, stored_at) = entries.get(address)?;
        (stored_at.elapsed() < self.ttl).then(|| identity.clone())
    }

    pub(crate) fn insert(&self, address: Address, identity: Identity) {
        let now = Instant::now();
        let mut entries = self.entries.write();

        if !entries.contains_key(&address) && entries.len() >= self.capacity {
            entries.retain(|_, (_, stored_at)| now.duration_since(*stored_at) < self.ttl);

            if entries.len() >= self.capacity {
                let stalest = entries.iter().min_by_key(|(_, (_, at))| *at).map(|(a, _)| *a);
                if let Some(stalest) = stalest {
                    entries.remove(&stalest);
                }
            }
        }

        entries.insert(address, (identity, now));
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> Identity {
        Identity {
            name: Some(name.into()),
            avatar: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_until_ttl_passes() {
        let cache = IdentityCache::new(Duration::from_secs(60), 8);
        cache.insert(Address::repeat_byte(1), named("alice.eth"));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(
            cache.get(&Address::repeat_byte(1)).and_then(|i| i.name).as_deref(),
            Some("alice.eth")
        );
        assert!(cache.get(&Address::repeat_byte(2)).is_none());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get(&Address::repeat_byte(1)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_cache_drops_stalest() {
        let cache = IdentityCache::new(Duration::from_secs(60), 2);
        cache.insert(Address::repeat_byte(1), named("one.eth"));
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.insert(Address::repeat_byte(2), named("two.eth"));
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.insert(Address::repeat_byte(3), named("three.eth"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&Address::repeat_byte(1)).is_none());
        assert!(cache.get(&Address::repeat_byte(2)).is_some());
        assert!(cache.get(&Address::repeat_byte(3)).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refreshing_an_entry_does_not_evict() {
        let cache = IdentityCache::new(Duration::from_secs(60), 1);
        cache.insert(Address::repeat_byte(1), named("old.eth"));
        cache.insert(Address::repeat_byte(1), named("new.eth"));

        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.get(&Address::repeat_byte(1)).and_then(|i| i.name).as_deref(),
            Some("new.eth")
        );
    }
}
