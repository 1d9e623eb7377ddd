//! Account State Cache (spec.md §4.F) — TTL-bounded read-through caches for
//! balance and open positions.
//!
//! Grounded on the teacher's `tax::price_oracle::PriceCache`: a
//! `std::sync::RwLock`-guarded payload plus an `Instant` freshness check,
//! refreshed lazily on a stale read. The guard is held only around the
//! cache slot itself — never across the network call (spec.md §5): a miss
//! releases the read guard, fetches, then takes the write guard to install
//! the result. Overlapping misses are not coalesced; the spec accepts
//! duplicated concurrent fetches as the price of skipping a single-flight
//! primitive.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::normalize::{NormalizedBalance, NormalizedPosition};

struct Entry<T> {
    payload: T,
    fetched_at: Instant,
}

/// A single TTL-bounded cache slot holding one payload type.
pub struct TtlCache<T: Clone> {
    slot: RwLock<Option<Entry<T>>>,
    ttl: Duration,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self { slot: RwLock::new(None), ttl }
    }

    /// Returns a cached payload if present and within TTL.
    pub fn get_fresh(&self) -> Option<T> {
        let guard = self.slot.read().expect("cache lock poisoned");
        guard.as_ref().and_then(|entry| {
            if entry.fetched_at.elapsed() < self.ttl {
                Some(entry.payload.clone())
            } else {
                None
            }
        })
    }

    /// Installs a freshly-fetched payload, stamped with the current time.
    pub fn store(&self, payload: T) {
        let mut guard = self.slot.write().expect("cache lock poisoned");
        *guard = Some(Entry { payload, fetched_at: Instant::now() });
    }
}

/// The client's two volatile-state caches, both under the same TTL.
pub struct AccountStateCache {
    pub balance: TtlCache<NormalizedBalance>,
    pub positions: TtlCache<Vec<NormalizedPosition>>,
}

impl AccountStateCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            balance: TtlCache::new(ttl),
            positions: TtlCache::new(ttl),
        }
    }
}
