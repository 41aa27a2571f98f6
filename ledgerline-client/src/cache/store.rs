//! Tag-invalidated query store.
//!
//! Every entry is keyed by endpoint and canonical arguments and remembers the
//! tags its last result provided. Invalidating a tag refetches each subscribed
//! entry that provides it and marks unsubscribed entries stale, so they refetch
//! on their next subscription. Entries without subscribers are collected after
//! `keep_unused_for`.
//!
//! The entry map lives behind a `std::sync::Mutex` that is never held across an
//! `.await`. Requests run on spawned tasks and publish through `watch` channels.

use crate::api_client::{ApiError, Fetcher};
use crate::cache::endpoint::{MutationEndpoint, QueryEndpoint};
use crate::cache::handle::{QueryHandle, QueryState, QueryStatus};
use crate::cache::key::QueryKey;
use crate::cache::lock::mutex_lock;
use crate::cache::mutation::Mutation;
use ledgerline_core::{Tag, TagList};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, trace};

const LOCK_TARGET: &str = "cache.store";

/// Shared handle to the query store. Clones share the same entries.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    fetcher: Arc<dyn Fetcher>,
    keep_unused_for: Duration,
    entries: Mutex<HashMap<QueryKey, Entry>>,
    next_epoch: AtomicU64,
    refetches: AtomicU64,
}

struct Entry {
    endpoint: QueryEndpoint,
    args: Value,
    provides: TagList,
    subscribers: usize,
    /// Identity of this entry. A recreated entry for the same key gets a new
    /// epoch, so responses addressed to the old one are dropped.
    epoch: u64,
    in_flight: usize,
    stale: bool,
    /// Bumped on every subscribe/release so a pending collection can tell
    /// whether the entry was used in the meantime.
    generation: u64,
    state: watch::Sender<QueryState>,
}

impl Entry {
    fn provides_any(&self, tags: &[Tag]) -> bool {
        self.provides.iter().any(|provided| tags.contains(provided))
    }

    fn begin_fetch(&mut self, key: &QueryKey) -> PendingFetch {
        self.in_flight += 1;
        self.stale = false;
        self.state.send_modify(|state| {
            state.is_fetching = true;
            state.status = QueryStatus::Pending;
        });
        PendingFetch {
            key: key.clone(),
            endpoint: self.endpoint,
            args: self.args.clone(),
            epoch: self.epoch,
        }
    }

    fn needs_fetch(&self) -> bool {
        if self.stale {
            return true;
        }
        let status = self.state.borrow().status;
        self.in_flight == 0 && matches!(status, QueryStatus::Uninitialized | QueryStatus::Rejected)
    }
}

struct PendingFetch {
    key: QueryKey,
    endpoint: QueryEndpoint,
    args: Value,
    epoch: u64,
}

/// Point-in-time counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub subscribed: usize,
    pub refetches: u64,
}

impl QueryCache {
    pub fn new(fetcher: Arc<dyn Fetcher>, keep_unused_for: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                fetcher,
                keep_unused_for,
                entries: Mutex::new(HashMap::new()),
                next_epoch: AtomicU64::new(1),
                refetches: AtomicU64::new(0),
            }),
        }
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.inner.fetcher
    }

    /// Subscribe to `endpoint(args)`, starting a request when the entry is new,
    /// stale, or last failed.
    ///
    /// Must be called from within a tokio runtime for the request to run; the
    /// entry is rejected with a transport error otherwise.
    pub fn query(&self, endpoint: &QueryEndpoint, args: Value) -> QueryHandle {
        let key = QueryKey::new(endpoint.name, &args);
        let (receiver, epoch, pending) = {
            let mut entries = mutex_lock(&self.inner.entries, LOCK_TARGET, "query");
            let entry = entries.entry(key.clone()).or_insert_with(|| {
                let epoch = self.inner.next_epoch.fetch_add(1, Ordering::Relaxed);
                trace!(cache_key = %key, epoch, "Creating cache entry");
                Entry {
                    endpoint: *endpoint,
                    provides: (endpoint.provides)(&args, None),
                    args,
                    subscribers: 0,
                    epoch,
                    in_flight: 0,
                    stale: false,
                    generation: 0,
                    state: watch::Sender::new(QueryState::uninitialized()),
                }
            });
            entry.subscribers += 1;
            entry.generation += 1;
            let pending = entry.needs_fetch().then(|| entry.begin_fetch(&key));
            (entry.state.subscribe(), entry.epoch, pending)
        };

        if let Some(fetch) = pending {
            self.spawn_fetch(fetch);
        }
        QueryHandle::new(self.clone(), key, epoch, receiver)
    }

    /// Build a mutation trigger for `endpoint`.
    pub fn mutation(&self, endpoint: &MutationEndpoint) -> Mutation {
        Mutation::new(self.clone(), *endpoint)
    }

    /// Refetch every subscribed entry providing any of `tags`, once per entry.
    /// Unsubscribed matches are marked stale. Returns the number of refetches
    /// started.
    pub fn invalidate_tags(&self, tags: &[Tag]) -> usize {
        if tags.is_empty() {
            return 0;
        }
        let pending: Vec<PendingFetch> = {
            let mut entries = mutex_lock(&self.inner.entries, LOCK_TARGET, "invalidate_tags");
            let mut pending = Vec::new();
            for (key, entry) in entries.iter_mut() {
                if !entry.provides_any(tags) {
                    continue;
                }
                if entry.subscribers > 0 {
                    pending.push(entry.begin_fetch(key));
                } else {
                    entry.stale = true;
                }
            }
            pending
        };

        let started = pending.len();
        self.inner
            .refetches
            .fetch_add(started as u64, Ordering::Relaxed);
        debug!(tag_count = tags.len(), refetches = started, "Invalidated tags");
        for fetch in pending {
            self.spawn_fetch(fetch);
        }
        started
    }

    /// Current state of an entry without subscribing to it.
    pub fn peek(&self, endpoint: &QueryEndpoint, args: &Value) -> Option<QueryState> {
        let key = QueryKey::new(endpoint.name, args);
        let entries = mutex_lock(&self.inner.entries, LOCK_TARGET, "peek");
        entries.get(&key).map(|entry| entry.state.borrow().clone())
    }

    /// Tags an entry currently provides.
    pub fn provided_tags(&self, endpoint: &QueryEndpoint, args: &Value) -> Option<TagList> {
        let key = QueryKey::new(endpoint.name, args);
        let entries = mutex_lock(&self.inner.entries, LOCK_TARGET, "provided_tags");
        entries.get(&key).map(|entry| entry.provides.clone())
    }

    /// Drop every entry. In-flight responses are discarded when they land.
    pub fn reset(&self) {
        let mut entries = mutex_lock(&self.inner.entries, LOCK_TARGET, "reset");
        debug!(entries = entries.len(), "Resetting query cache");
        entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let entries = mutex_lock(&self.inner.entries, LOCK_TARGET, "stats");
        CacheStats {
            entries: entries.len(),
            subscribed: entries.values().filter(|e| e.subscribers > 0).count(),
            refetches: self.inner.refetches.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn refetch(&self, key: &QueryKey, epoch: u64) {
        let pending = {
            let mut entries = mutex_lock(&self.inner.entries, LOCK_TARGET, "refetch");
            entries
                .get_mut(key)
                .filter(|entry| entry.epoch == epoch)
                .map(|entry| entry.begin_fetch(key))
        };
        if let Some(fetch) = pending {
            self.spawn_fetch(fetch);
        }
    }

    pub(crate) fn release(&self, key: &QueryKey, epoch: u64) {
        let generation = {
            let mut entries = mutex_lock(&self.inner.entries, LOCK_TARGET, "release");
            let Some(entry) = entries.get_mut(key).filter(|entry| entry.epoch == epoch) else {
                trace!(cache_key = %key, epoch, "Release for a dropped entry ignored");
                return;
            };
            entry.subscribers = entry.subscribers.saturating_sub(1);
            if entry.subscribers > 0 {
                return;
            }
            entry.generation += 1;
            if self.inner.keep_unused_for.is_zero() {
                entries.remove(key);
                trace!(cache_key = %key, "Collected unused entry");
                return;
            }
            entry.generation
        };

        match Handle::try_current() {
            Ok(runtime) => {
                let cache = self.clone();
                let key = key.clone();
                let delay = self.inner.keep_unused_for;
                runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    cache.collect(&key, generation);
                });
            }
            Err(_) => self.collect(key, generation),
        }
    }

    fn collect(&self, key: &QueryKey, generation: u64) {
        let mut entries = mutex_lock(&self.inner.entries, LOCK_TARGET, "collect");
        let unused = entries
            .get(key)
            .is_some_and(|entry| entry.subscribers == 0 && entry.generation == generation);
        if unused {
            entries.remove(key);
            trace!(cache_key = %key, "Collected unused entry");
        }
    }

    fn spawn_fetch(&self, fetch: PendingFetch) {
        let PendingFetch {
            key,
            endpoint,
            args,
            epoch,
        } = fetch;
        let request = match (endpoint.request)(&args) {
            Ok(request) => request,
            Err(err) => {
                self.complete(&key, epoch, Err(err));
                return;
            }
        };
        match Handle::try_current() {
            Ok(runtime) => {
                let cache = self.clone();
                runtime.spawn(async move {
                    let result = cache.inner.fetcher.fetch(request).await;
                    cache.complete(&key, epoch, result);
                });
            }
            Err(_) => self.complete(
                &key,
                epoch,
                Err(ApiError::transport("no async runtime available")),
            ),
        }
    }

    fn complete(&self, key: &QueryKey, epoch: u64, result: Result<Value, ApiError>) {
        let mut entries = mutex_lock(&self.inner.entries, LOCK_TARGET, "complete");
        let Some(entry) = entries.get_mut(key).filter(|entry| entry.epoch == epoch) else {
            debug!(cache_key = %key, epoch, "Discarding response for collected entry");
            return;
        };
        entry.in_flight = entry.in_flight.saturating_sub(1);
        let still_fetching = entry.in_flight > 0;

        match result {
            Ok(data) => {
                entry.provides = (entry.endpoint.provides)(&entry.args, Some(&data));
                debug!(
                    endpoint = key.endpoint(),
                    cache_key = %key,
                    tag_count = entry.provides.len(),
                    "Query fulfilled"
                );
                entry.state.send_modify(|state| {
                    state.data = Some(data);
                    state.status = QueryStatus::Fulfilled;
                    state.error = None;
                    state.is_fetching = still_fetching;
                });
            }
            Err(err) => {
                debug!(
                    endpoint = key.endpoint(),
                    cache_key = %key,
                    status = %err.status,
                    "Query rejected"
                );
                entry.state.send_modify(|state| {
                    state.status = QueryStatus::Rejected;
                    state.error = Some(err);
                    state.is_fetching = still_fetching;
                });
            }
        }
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("stats", &self.stats())
            .finish()
    }
}
