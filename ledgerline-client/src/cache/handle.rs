//! Subscriber-side view of a cache entry.

use crate::api_client::ApiError;
use crate::cache::key::QueryKey;
use crate::cache::store::QueryCache;
use serde_json::Value;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Uninitialized,
    Pending,
    Fulfilled,
    Rejected,
}

/// Snapshot of a query entry.
///
/// `data` survives refetches and failed refetches; only a successful response
/// replaces it.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    pub data: Option<Value>,
    pub status: QueryStatus,
    pub error: Option<ApiError>,
    pub is_fetching: bool,
}

impl QueryState {
    pub(crate) fn uninitialized() -> Self {
        Self {
            data: None,
            status: QueryStatus::Uninitialized,
            error: None,
            is_fetching: false,
        }
    }

    /// No data yet and a request in flight.
    pub fn is_loading(&self) -> bool {
        self.data.is_none() && self.is_fetching
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Rejected
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Fulfilled
    }

    /// Settled means the last request resolved and nothing is in flight.
    pub fn is_settled(&self) -> bool {
        !self.is_fetching && matches!(self.status, QueryStatus::Fulfilled | QueryStatus::Rejected)
    }
}

/// A live subscription to one query entry. Dropping it unsubscribes.
pub struct QueryHandle {
    cache: QueryCache,
    key: QueryKey,
    /// Epoch of the entry this handle subscribed to. Once the cache is reset,
    /// a new entry for the same key is not this handle's to release.
    epoch: u64,
    state: watch::Receiver<QueryState>,
}

impl QueryHandle {
    pub(crate) fn new(cache: QueryCache, key: QueryKey, epoch: u64, state: watch::Receiver<QueryState>) -> Self {
        Self {
            cache,
            key,
            epoch,
            state,
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn state(&self) -> QueryState {
        self.state.borrow().clone()
    }

    pub fn data(&self) -> Option<Value> {
        self.state.borrow().data.clone()
    }

    pub fn error(&self) -> Option<ApiError> {
        self.state.borrow().error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    pub fn is_fetching(&self) -> bool {
        self.state.borrow().is_fetching
    }

    pub fn is_error(&self) -> bool {
        self.state.borrow().is_error()
    }

    /// Force a request regardless of the current state. Does nothing once the
    /// subscribed entry has been dropped from the cache.
    pub fn refetch(&self) {
        self.cache.refetch(&self.key, self.epoch);
    }

    /// Wait for the next state change and return the new state.
    ///
    /// Returns the current state immediately if the entry was dropped from the
    /// cache (for example by [`QueryCache::reset`]).
    pub async fn changed(&mut self) -> QueryState {
        let _ = self.state.changed().await;
        self.state.borrow_and_update().clone()
    }

    /// Wait until no request is in flight and the last one has resolved.
    pub async fn settled(&mut self) -> QueryState {
        if let Ok(state) = self.state.wait_for(QueryState::is_settled).await {
            return state.clone();
        }
        self.state.borrow().clone()
    }
}

impl Drop for QueryHandle {
    fn drop(&mut self) {
        self.cache.release(&self.key, self.epoch);
    }
}

impl std::fmt::Debug for QueryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryHandle")
            .field("key", &self.key)
            .field("epoch", &self.epoch)
            .field("state", &*self.state.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn loading_only_without_data() {
        let mut state = QueryState::uninitialized();
        assert!(!state.is_loading());

        state.is_fetching = true;
        state.status = QueryStatus::Pending;
        assert!(state.is_loading());

        state.data = Some(json!([]));
        assert!(!state.is_loading());
        assert!(!state.is_settled());

        state.is_fetching = false;
        state.status = QueryStatus::Fulfilled;
        assert!(state.is_settled());
        assert!(state.is_success());
    }
}
