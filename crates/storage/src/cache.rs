//! Signed URL cache with request de-duplication and proactive refresh.
//!
//! [`SignedResourceCache`] maps resource keys to short-lived signed URLs.
//! Lookups go through [`resolve`](SignedResourceCache::resolve), which:
//!
//! - joins an already pending upstream fetch for a key instead of starting
//!   a second one (at most one fetch per key is in flight);
//! - batches every remaining key that is missing, expired, or close to
//!   expiry into a single signing request;
//! - records failures as short-lived `None` entries so a broken backend is
//!   retried on a bounded schedule.
//!
//! Entries that expired more than one positive TTL ago are pruned during
//! lookups, so keys that are never requested again do not accumulate.
//!
//! Upstream fetches run as spawned tasks that always clear their in-flight
//! entries when they settle, so a caller that stops waiting never leaves a
//! key stuck behind a dead fetch. Every write carries a sequence number taken
//! when the write began; a write older than the stored entry is dropped.

use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use clubroom_core::types::Timestamp;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::signer::ResourceSigner;

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// Cached signing state of one resource key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    /// Last signed URL, or `None` after a failed or empty signing attempt.
    pub url: Option<String>,
    /// `None` means no TTL has been established; the key is resolved on
    /// every lookup.
    pub expires_at: Option<Timestamp>,
    pub updated_at: Timestamp,
    /// Sequence number of the write that produced this entry.
    pub seq: u64,
}

impl CacheEntry {
    /// Whether the entry is past its expiry (entries without TTL count as
    /// expired).
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.map_or(true, |expires_at| expires_at <= now)
    }
}

/// Whether `entry` must be re-fetched at `now`.
///
/// Entries with a URL refresh once they are within `refresh_threshold` of
/// expiry, so a displayed URL is replaced before it stops working. Negative
/// entries refresh only once expired; the threshold does not apply to them.
pub fn should_refresh(
    entry: Option<&CacheEntry>,
    now: Timestamp,
    refresh_threshold: chrono::Duration,
) -> bool {
    let Some(entry) = entry else {
        return true;
    };
    let Some(expires_at) = entry.expires_at else {
        return true;
    };
    match entry.url {
        Some(_) => expires_at - now <= refresh_threshold,
        None => expires_at <= now,
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Completion signal of a spawned upstream fetch.
type FetchDone = Shared<BoxFuture<'static, ()>>;

#[derive(Clone)]
struct PendingFetch {
    batch_id: u64,
    done: FetchDone,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    in_flight: HashMap<String, PendingFetch>,
    pruned_at: Option<Timestamp>,
}

impl CacheState {
    /// Replace the entry for `key` unless a newer write already landed.
    fn write(
        &mut self,
        key: &str,
        url: Option<String>,
        ttl: chrono::Duration,
        seq: u64,
        now: Timestamp,
    ) -> bool {
        if let Some(existing) = self.entries.get(key) {
            if existing.seq > seq {
                tracing::debug!(
                    key,
                    stored_seq = existing.seq,
                    write_seq = seq,
                    "Dropping out-of-order signed URL write",
                );
                return false;
            }
        }

        self.entries.insert(
            key.to_string(),
            CacheEntry {
                url,
                expires_at: Some(now + ttl),
                updated_at: now,
                seq,
            },
        );
        true
    }

    /// Drop entries that expired at least `retention` before `now`. Runs at
    /// most once per `retention`; keys with a pending fetch are kept.
    fn prune(&mut self, now: Timestamp, retention: chrono::Duration) -> usize {
        if self.pruned_at.is_some_and(|at| now - at < retention) {
            return 0;
        }
        self.pruned_at = Some(now);

        let cutoff = now - retention;
        let before = self.entries.len();
        let in_flight = &self.in_flight;
        self.entries.retain(|key, entry| {
            in_flight.contains_key(key) || entry.expires_at.map_or(true, |at| at > cutoff)
        });
        before - self.entries.len()
    }
}

struct Inner {
    state: Mutex<CacheState>,
    signer: Arc<dyn ResourceSigner>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    next_seq: AtomicU64,
    next_batch: AtomicU64,
}

impl Inner {
    fn next_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn ttl_for(&self, url: &Option<String>) -> chrono::Duration {
        if url.is_some() {
            self.config.positive_ttl
        } else {
            self.config.negative_ttl
        }
    }

    /// Body of a spawned upstream fetch. Never panics past the signer call,
    /// so the in-flight entries are always cleared.
    async fn run_fetch(self: Arc<Self>, batch_id: u64, seq: u64, keys: Vec<String>) {
        tracing::debug!(batch_id, count = keys.len(), "Requesting signed URLs");

        let outcome = AssertUnwindSafe(self.signer.sign_resource_keys(&keys))
            .catch_unwind()
            .await;

        let now = self.clock.now();
        let mut state = self.state.lock().await;

        match outcome {
            Ok(Ok(mut urls)) => {
                let mut missing = 0usize;
                for key in &keys {
                    let url = urls.remove(key).filter(|u| !u.is_empty());
                    if url.is_none() {
                        missing += 1;
                    }
                    let ttl = self.ttl_for(&url);
                    state.write(key, url, ttl, seq, now);
                }
                if missing > 0 {
                    tracing::warn!(batch_id, missing, "Signing backend omitted keys");
                }
            }
            Ok(Err(error)) => {
                tracing::warn!(batch_id, count = keys.len(), %error, "Signing batch failed");
                for key in &keys {
                    state.write(key, None, self.config.negative_ttl, seq, now);
                }
            }
            Err(_) => {
                tracing::error!(batch_id, count = keys.len(), "Signing backend panicked");
                for key in &keys {
                    state.write(key, None, self.config.negative_ttl, seq, now);
                }
            }
        }

        for key in &keys {
            if state
                .in_flight
                .get(key)
                .is_some_and(|pending| pending.batch_id == batch_id)
            {
                state.in_flight.remove(key);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// SignedResourceCache
// ---------------------------------------------------------------------------

/// Process-wide signed URL cache. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SignedResourceCache {
    inner: Arc<Inner>,
}

impl SignedResourceCache {
    /// Create a cache over `signer` using wall-clock time.
    pub fn new(signer: Arc<dyn ResourceSigner>, config: CacheConfig) -> Self {
        Self::with_clock(signer, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        signer: Arc<dyn ResourceSigner>,
        config: CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(CacheState::default()),
                signer,
                clock,
                config,
                next_seq: AtomicU64::new(0),
                next_batch: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Snapshot of the entry for `key`.
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        self.inner.state.lock().await.entries.get(key).cloned()
    }

    /// URL for `key` if its entry holds one and is not yet due for refresh.
    pub async fn get_fresh(&self, key: &str) -> Option<String> {
        let now = self.inner.clock.now();
        let state = self.inner.state.lock().await;
        let entry = state.entries.get(key)?;
        if self.should_refresh(Some(entry), now) {
            return None;
        }
        entry.url.clone()
    }

    /// Point `alias` at the current URL of `source`, sharing its expiry.
    ///
    /// Returns the linked URL, or `None` (leaving `alias` untouched) when
    /// `source` has no unexpired URL.
    pub async fn alias(&self, alias: &str, source: &str) -> Option<String> {
        let now = self.inner.clock.now();
        let seq = self.inner.next_seq();
        let mut state = self.inner.state.lock().await;

        let entry = state.entries.get(source)?;
        if entry.is_expired(now) {
            return None;
        }
        let url = entry.url.clone()?;
        let expires_at = entry.expires_at?;

        state.entries.insert(
            alias.to_string(),
            CacheEntry {
                url: Some(url.clone()),
                expires_at: Some(expires_at),
                updated_at: now,
                seq,
            },
        );
        Some(url)
    }

    /// Replace the entry for `key`.
    ///
    /// Without an explicit `ttl`, entries with a URL get the positive TTL
    /// and `None` entries the negative TTL.
    pub async fn set(&self, key: &str, url: Option<String>, ttl: Option<chrono::Duration>) {
        let ttl = ttl.unwrap_or_else(|| self.inner.ttl_for(&url));
        let seq = self.inner.next_seq();
        let now = self.inner.clock.now();
        self.inner.state.lock().await.write(key, url, ttl, seq, now);
    }

    /// Force the entry for `key` to be refreshed on the next lookup while
    /// keeping its last URL readable. No-op for unknown keys.
    pub async fn mark_stale(&self, key: &str) {
        let now = self.inner.clock.now();
        let mut state = self.inner.state.lock().await;
        if let Some(entry) = state.entries.get_mut(key) {
            entry.expires_at = Some(now - chrono::Duration::milliseconds(1));
            entry.updated_at = now;
        }
    }

    /// Remove the entry for `key`.
    pub async fn clear(&self, key: &str) -> bool {
        self.inner.state.lock().await.entries.remove(key).is_some()
    }

    /// Whether `entry` is due for refresh at `now` under this cache's
    /// threshold.
    pub fn should_refresh(&self, entry: Option<&CacheEntry>, now: Timestamp) -> bool {
        should_refresh(entry, now, self.inner.config.refresh_threshold)
    }

    /// Number of keys with a pending upstream fetch.
    pub async fn pending_count(&self) -> usize {
        self.inner.state.lock().await.in_flight.len()
    }

    /// Number of cached entries.
    pub async fn len(&self) -> usize {
        self.inner.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Resolve `keys` to their best known signed URLs.
    ///
    /// Never fails: keys that cannot be signed map to `None`. Duplicate keys
    /// are collapsed. The returned map holds every requested key.
    pub async fn resolve(&self, keys: &[String]) -> HashMap<String, Option<String>> {
        let mut seen = HashSet::with_capacity(keys.len());
        let requested: Vec<&String> = keys.iter().filter(|k| seen.insert(k.as_str())).collect();
        if requested.is_empty() {
            return HashMap::new();
        }

        let mut waits: Vec<FetchDone> = Vec::new();
        {
            let mut state = self.inner.state.lock().await;
            let now = self.inner.clock.now();

            let pruned = state.prune(now, self.inner.config.positive_ttl);
            if pruned > 0 {
                tracing::debug!(pruned, "Pruned expired signed URL entries");
            }

            let mut joined_batches = HashSet::new();
            let mut to_fetch = Vec::new();
            for key in &requested {
                if let Some(pending) = state.in_flight.get(key.as_str()) {
                    if joined_batches.insert(pending.batch_id) {
                        waits.push(pending.done.clone());
                    }
                    continue;
                }
                if self.should_refresh(state.entries.get(key.as_str()), now) {
                    to_fetch.push((*key).clone());
                }
            }

            if !to_fetch.is_empty() {
                let pending = self.spawn_fetch(to_fetch.clone());
                for key in to_fetch {
                    state.in_flight.insert(key, pending.clone());
                }
                waits.push(pending.done);
            }
        }

        futures::future::join_all(waits).await;

        let state = self.inner.state.lock().await;
        requested
            .into_iter()
            .map(|key| {
                let url = state.entries.get(key).and_then(|e| e.url.clone());
                (key.clone(), url)
            })
            .collect()
    }

    /// Resolve a single key.
    pub async fn resolve_one(&self, key: &str) -> Option<String> {
        let key = key.to_string();
        self.resolve(std::slice::from_ref(&key))
            .await
            .remove(&key)
            .flatten()
    }

    /// Start an upstream fetch for `keys`. Must be called with the state
    /// lock held so the in-flight entries are registered before the task
    /// can clear them.
    fn spawn_fetch(&self, keys: Vec<String>) -> PendingFetch {
        let batch_id = self.inner.next_batch.fetch_add(1, Ordering::Relaxed) + 1;
        let seq = self.inner.next_seq();
        let inner = Arc::clone(&self.inner);

        let handle = tokio::spawn(inner.run_fetch(batch_id, seq, keys));
        let done = async move {
            if let Err(error) = handle.await {
                tracing::error!(batch_id, %error, "Signed URL fetch task failed");
            }
        }
        .boxed()
        .shared();

        PendingFetch { batch_id, done }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
