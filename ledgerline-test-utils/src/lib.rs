//! Ledgerline Test Utilities
//!
//! Shared test infrastructure for the Ledgerline workspace:
//! - A scripted, call-counting [`MockFetcher`] standing in for the REST API
//! - Proptest generators for ids, tags and realtime payloads
//! - Fixtures for configs, sessions and server responses

pub use ledgerline_client::{ApiError, ApiRequest, ClientConfig, Fetcher, Method, Session};
pub use ledgerline_core::{EntityId, Tag, TagId, TagList, TagType};

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

// ============================================================================
// MOCK FETCHER
// ============================================================================

#[derive(Debug, Clone)]
struct Reply {
    result: Result<Value, ApiError>,
    delay: Duration,
}

/// In-memory [`Fetcher`] answering from scripted routes.
///
/// Routes are matched on method and path (query string ignored). A route can
/// hold a queue of replies; the last one repeats once the queue drains.
/// Unrouted requests fail with a 404. Every request is recorded.
#[derive(Debug, Default)]
pub struct MockFetcher {
    routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method path` with `value` from now on.
    pub fn ok(&self, method: Method, path: &str, value: Value) -> &Self {
        self.set(method, path, Ok(value), Duration::ZERO)
    }

    /// Fail `method path` with `error` from now on.
    pub fn err(&self, method: Method, path: &str, error: ApiError) -> &Self {
        self.set(method, path, Err(error), Duration::ZERO)
    }

    /// Replace the route's replies with one delayed reply.
    pub fn set(&self, method: Method, path: &str, result: Result<Value, ApiError>, delay: Duration) -> &Self {
        let mut routes = lock(&self.routes);
        routes.insert((method, path.to_string()), VecDeque::from([Reply { result, delay }]));
        self
    }

    /// Append a reply to the route's queue.
    pub fn enqueue(&self, method: Method, path: &str, result: Result<Value, ApiError>, delay: Duration) -> &Self {
        let mut routes = lock(&self.routes);
        routes
            .entry((method, path.to_string()))
            .or_default()
            .push_back(Reply { result, delay });
        self
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self, method: Method, path: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| call.method == method && call.path == path)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    fn next_reply(&self, request: &ApiRequest) -> Reply {
        let mut routes = lock(&self.routes);
        let key = (request.method, request.path.clone());
        match routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(not_found),
            Some(queue) => queue.front().cloned().unwrap_or_else(not_found),
            None => not_found(),
        }
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: ApiRequest) -> Result<Value, ApiError> {
        lock(&self.calls).push(request.clone());
        let reply = self.next_reply(&request);
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        reply.result
    }
}

fn not_found() -> Reply {
    Reply {
        result: Err(ApiError::http(404, json!({ "message": "no route" }))),
        delay: Duration::ZERO,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Poll `condition` every few milliseconds until it holds or `timeout` passes.
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use proptest::prelude::*;

    /// Generate a valid entity id (short alphanumeric, as the API issues).
    pub fn arb_entity_id() -> impl Strategy<Value = EntityId> {
        "[a-z0-9]{1,12}".prop_filter_map("non-blank id", |raw| EntityId::new(raw))
    }

    pub fn arb_entity_ids(max: usize) -> impl Strategy<Value = Vec<EntityId>> {
        prop::collection::vec(arb_entity_id(), 0..=max)
    }

    pub fn arb_tag_type() -> impl Strategy<Value = TagType> {
        prop::sample::select(TagType::ALL.to_vec())
    }

    pub fn arb_tag() -> impl Strategy<Value = Tag> {
        prop_oneof![
            arb_tag_type().prop_map(Tag::list),
            (arb_tag_type(), arb_entity_id()).prop_map(|(kind, id)| Tag::entity(kind, id)),
        ]
    }

    /// A JSON id as the server might send it, valid or falsy.
    pub fn arb_json_id() -> impl Strategy<Value = Value> {
        prop_oneof![
            3 => arb_entity_id().prop_map(|id| Value::String(id.as_str().to_string())),
            1 => (1i64..10_000).prop_map(Value::from),
            1 => Just(Value::Null),
            1 => Just(json!("")),
            1 => Just(json!(0)),
            1 => Just(json!(false)),
        ]
    }

    /// An `ar_payment` payload with any mix of present and falsy fields.
    pub fn arb_ar_payment_payload() -> impl Strategy<Value = Value> {
        (
            arb_json_id(),
            prop::collection::vec(arb_json_id(), 0..4),
            any::<bool>(),
            arb_json_id(),
            arb_json_id(),
        )
            .prop_map(|(receivable, excess, created, account, memo)| {
                json!({
                    "accountsReceivableId": receivable,
                    "affectedPendingExcessIds": excess,
                    "newPendingExcessCreated": created,
                    "affectedAccountId": account,
                    "usedCreditMemoId": memo,
                })
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    use super::*;
    use ledgerline_client::UserRole;
    use ledgerline_client::User;

    /// A complete config TOML pointing at `api_base_url`.
    pub fn config_toml(api_base_url: &str) -> String {
        format!(
            r#"
api_base_url = "{api_base_url}"
ws_path = "/realtime"
company_id = "c1"
request_timeout_ms = 2000

[cache]
keep_unused_for_ms = 50

[reconnect]
initial_ms = 20
max_ms = 200
multiplier = 2.0
jitter_ms = 5

[notifications]
max_visible = 5
auto_hide_ms = 4000

[logging]
filter = "ledgerline=debug,info"
format = "pretty"
"#
        )
    }

    pub fn config(api_base_url: &str) -> ClientConfig {
        match ClientConfig::from_toml(&config_toml(api_base_url)) {
            Ok(config) => config,
            Err(err) => panic!("fixture config must parse: {err}"),
        }
    }

    pub fn user() -> User {
        User {
            id: "u1".to_string(),
            name: "Ops Lead".to_string(),
            email: "ops@acme.test".to_string(),
            role: UserRole::Admin,
            company_id: Some("c1".to_string()),
        }
    }

    pub fn session() -> Session {
        Session {
            token: "test-token".to_string(),
            user: user(),
        }
    }

    /// Body the API returns from a successful login.
    pub fn login_response() -> Value {
        json!({
            "accessToken": "test-token",
            "user": {
                "id": "u1",
                "name": "Ops Lead",
                "email": "ops@acme.test",
                "role": "ADMIN",
                "companyId": "c1"
            }
        })
    }

    /// A page of accounts as `GET /account` returns it.
    pub fn accounts_page(ids: &[&str]) -> Value {
        let rows: Vec<Value> = ids
            .iter()
            .map(|id| json!({ "id": id, "name": format!("Account {id}") }))
            .collect();
        json!({ "data": rows, "total": ids.len() })
    }
}
