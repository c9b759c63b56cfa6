//! Keyed result cache with in-flight request sharing
//!
//! `CacheStore::get_or_fetch` returns a fresh cached value when one exists,
//! otherwise joins a pending fetch for the same key, otherwise starts one.
//! At most one producer runs per key at a time and every waiter observes
//! the same result. Errors are delivered to all waiters but never cached.
//!
//! Ages are measured with `tokio::time::Instant`, so tests can pause and
//! advance the clock.

use crate::error::{Error, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

type SharedResult<V> = std::result::Result<V, Arc<Error>>;
type PendingFetch<V> = Shared<BoxFuture<'static, SharedResult<V>>>;

/// A stored value and when it was stored
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
    /// TTL the entry was stored under, used when sweeping
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.stored_at)
    }
}

struct State<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    pending: HashMap<K, PendingFetch<V>>,
}

/// Counters and sizes for one store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub name: String,
    pub entries: usize,
    pub pending: usize,
    pub hits: u64,
    pub misses: u64,
    pub coalesced: u64,
}

/// Generic TTL cache with request coalescing
pub struct CacheStore<K, V> {
    name: &'static str,
    max_entries: usize,
    state: Mutex<State<K, V>>,
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
}

impl<K, V> std::fmt::Debug for CacheStore<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("name", &self.name)
            .field("max_entries", &self.max_entries)
            .finish_non_exhaustive()
    }
}

impl<K, V> CacheStore<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty store holding at most `max_entries` values
    pub fn new(name: &'static str, max_entries: usize) -> Self {
        Self {
            name,
            max_entries: max_entries.max(1),
            state: Mutex::new(State {
                entries: HashMap::new(),
                pending: HashMap::new(),
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            coalesced: AtomicU64::new(0),
        }
    }

    /// Return the cached value for `key`, or run `producer` to obtain it
    ///
    /// `producer` is only called when there is neither a fresh entry nor a
    /// pending fetch for `key`. The key must fully determine the producer's
    /// inputs.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, ttl: Duration, producer: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let pending = {
            let mut state = self.state.lock();

            if let Some(entry) = state.entries.get(&key) {
                if entry.age(Instant::now()) < ttl {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(entry.value.clone());
                }
            }

            match state.pending.get(&key) {
                Some(pending) => {
                    self.coalesced.fetch_add(1, Ordering::Relaxed);
                    debug!(cache = self.name, ?key, "joining in-flight fetch");
                    pending.clone()
                }
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    let fetch = producer()
                        .map(|result| result.map_err(Arc::new))
                        .boxed()
                        .shared();
                    state.pending.insert(key.clone(), fetch.clone());
                    fetch
                }
            }
        };

        let outcome = pending.clone().await;
        self.settle(&key, &pending, &outcome, ttl);
        outcome.map_err(Error::Shared)
    }

    /// Store the outcome and clear the pending slot, once per fetch
    fn settle(&self, key: &K, fetch: &PendingFetch<V>, outcome: &SharedResult<V>, ttl: Duration) {
        let mut state = self.state.lock();

        let is_current = state
            .pending
            .get(key)
            .is_some_and(|pending| pending.ptr_eq(fetch));
        if !is_current {
            return;
        }
        state.pending.remove(key);

        match outcome {
            Ok(value) => {
                state.entries.insert(
                    key.clone(),
                    CacheEntry {
                        value: value.clone(),
                        stored_at: Instant::now(),
                        ttl,
                    },
                );
                self.enforce_bound(&mut state);
                debug!(cache = self.name, ?key, size = state.entries.len(), "stored entry");
            }
            Err(e) => {
                debug!(cache = self.name, ?key, error = %e, "fetch failed, nothing stored");
            }
        }
    }

    fn enforce_bound(&self, state: &mut State<K, V>) {
        if state.entries.len() <= self.max_entries {
            return;
        }

        let removed = remove_expired(state, Instant::now());
        if removed > 0 {
            debug!(cache = self.name, removed, size = state.entries.len(), "swept expired entries");
        }

        let overflow = state.entries.len().saturating_sub(self.max_entries);
        if overflow == 0 {
            return;
        }

        let mut by_age: Vec<(K, Instant)> = state
            .entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.stored_at))
            .collect();
        by_age.sort_by_key(|(_, stored_at)| *stored_at);

        for (key, _) in by_age.into_iter().take(overflow) {
            state.entries.remove(&key);
        }
        warn!(
            cache = self.name,
            evicted = overflow,
            limit = self.max_entries,
            "cache full, evicted oldest entries"
        );
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            name: self.name.to_string(),
            entries: state.entries.len(),
            pending: state.pending.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
        }
    }
}

/// Drop every entry older than the TTL it was stored under
fn remove_expired<K: Eq + Hash, V>(state: &mut State<K, V>, now: Instant) -> usize {
    let before = state.entries.len();
    state.entries.retain(|_, entry| entry.age(now) < entry.ttl);
    before - state.entries.len()
}
