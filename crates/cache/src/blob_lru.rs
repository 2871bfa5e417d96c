//! A small, independent entry-count LRU for opaque precomputed artifacts.
//!
//! Unrelated to [`SecurityMetricCache`](crate::SecurityMetricCache): capacity
//! is measured in entries, not bytes, and there is no interval algebra here,
//! just least-recently-used eviction over a fixed slot count, with an
//! optional time-to-live.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

struct Entry {
    value: Vec<u8>,
    inserted_at: Instant,
}

struct BlobState {
    /// Front = least recently used, back = most recently used.
    order: VecDeque<String>,
    entries: HashMap<String, Entry>,
}

/// A fixed-capacity, entry-count-based LRU cache for opaque byte blobs.
///
/// Used by upper layers to cache serialized artifacts such as precomputed
/// performance blobs; it shares no state and no invariants with
/// [`SecurityMetricCache`](crate::SecurityMetricCache).
pub struct BlobLru {
    capacity: usize,
    ttl: Option<Duration>,
    state: Mutex<BlobState>,
}

impl BlobLru {
    /// Creates a blob LRU with room for `capacity` entries and an optional
    /// time-to-live after which an entry is treated as a miss.
    #[must_use]
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            capacity,
            ttl,
            state: Mutex::new(BlobState {
                order: VecDeque::with_capacity(capacity),
                entries: HashMap::with_capacity(capacity),
            }),
        }
    }

    /// Looks up `key`, marking it most-recently-used on a hit. Returns `None`
    /// on a miss or if the entry has outlived its TTL, pruning the expired
    /// entry as a side effect.
    pub async fn get_lru(&self, key: &str) -> Option<Vec<u8>> {
        let mut state = self.state.lock().await;

        if let Some(ttl) = self.ttl {
            if let Some(entry) = state.entries.get(key) {
                if entry.inserted_at.elapsed() > ttl {
                    state.entries.remove(key);
                    state.order.retain(|k| k != key);
                    return None;
                }
            }
        }

        let value = state.entries.get(key).map(|e| e.value.clone())?;
        state.order.retain(|k| k != key);
        state.order.push_back(key.to_string());
        Some(value)
    }

    /// Inserts or updates `key`, marking it most-recently-used. Evicts the
    /// least-recently-used entry if this insert would exceed capacity.
    pub async fn set_lru(&self, key: impl Into<String>, value: Vec<u8>) {
        let key = key.into();
        let mut state = self.state.lock().await;

        if state.entries.contains_key(&key) {
            state.order.retain(|k| k != &key);
        } else if state.entries.len() >= self.capacity {
            if let Some(oldest) = state.order.pop_front() {
                state.entries.remove(&oldest);
            }
        }

        state.entries.insert(
            key.clone(),
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
        state.order.push_back(key);
    }

    /// Number of live entries (including any not yet pruned past their TTL).
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    /// True if the LRU holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
