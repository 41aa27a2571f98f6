//! Mutation triggers.

use crate::api_client::ApiError;
use crate::cache::endpoint::MutationEndpoint;
use crate::cache::store::QueryCache;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Trigger for one mutation endpoint. Clones share the in-flight counter.
///
/// Triggers are not sequenced against each other or against queries; two
/// concurrent triggers both run and both invalidate on success.
#[derive(Clone)]
pub struct Mutation {
    cache: QueryCache,
    endpoint: MutationEndpoint,
    in_flight: Arc<AtomicUsize>,
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Mutation {
    pub(crate) fn new(cache: QueryCache, endpoint: MutationEndpoint) -> Self {
        Self {
            cache,
            endpoint,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.endpoint.name
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Run the mutation. On success the endpoint's invalidation tags are
    /// applied before returning; on failure nothing is invalidated.
    pub async fn trigger(&self, args: Value) -> Result<Value, ApiError> {
        let _guard = InFlight::enter(&self.in_flight);
        let request = (self.endpoint.request)(&args)?;
        match self.cache.fetcher().fetch(request).await {
            Ok(result) => {
                let tags = (self.endpoint.invalidates)(&args, &result);
                let refetched = self.cache.invalidate_tags(tags.as_slice());
                debug!(
                    endpoint = self.endpoint.name,
                    tag_count = tags.len(),
                    refetched,
                    "Mutation succeeded"
                );
                Ok(result)
            }
            Err(err) => {
                warn!(endpoint = self.endpoint.name, status = %err.status, "Mutation failed");
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for Mutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mutation")
            .field("endpoint", &self.endpoint.name)
            .field("in_flight", &self.in_flight.load(Ordering::SeqCst))
            .finish()
    }
}
