//! Query cache behavior: memoization, tag-driven refetch, staleness,
//! collection and response ordering.

use ledgerline_client::cache::{QueryCache, QueryStatus};
use ledgerline_client::endpoints::{accounts, products};
use ledgerline_client::realtime::apply_frame;
use ledgerline_client::{ApiError, Method};
use ledgerline_core::{EntityId, Tag, TagType};
use ledgerline_test_utils::{fixtures, wait_until, MockFetcher};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const KEEP: Duration = Duration::from_secs(60);

fn cache_with(fetcher: &Arc<MockFetcher>, keep_unused_for: Duration) -> QueryCache {
    QueryCache::new(fetcher.clone(), keep_unused_for)
}

fn account(id: &str) -> Tag {
    Tag::entity(TagType::Account, EntityId::new(id).unwrap())
}

#[tokio::test]
async fn subscribers_share_one_request() {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher.ok(Method::Get, "/account", fixtures::accounts_page(&["a1", "a2"]));
    let cache = cache_with(&fetcher, KEEP);

    let mut first = cache.query(&accounts::GET_ACCOUNTS, json!({ "page": 1 }));
    assert!(first.is_loading());
    let state = first.settled().await;
    assert_eq!(state.status, QueryStatus::Fulfilled);

    let second = cache.query(&accounts::GET_ACCOUNTS, json!({ "page": 1 }));
    assert_eq!(second.data(), state.data);
    assert!(!second.is_fetching());
    assert_eq!(fetcher.call_count(Method::Get, "/account"), 1);
    assert_eq!(cache.stats().subscribed, 1);
}

#[tokio::test]
async fn provided_tags_follow_the_result() {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher.ok(Method::Get, "/account", fixtures::accounts_page(&["a1", "a2"]));
    let cache = cache_with(&fetcher, KEEP);

    let args = json!({});
    let mut handle = cache.query(&accounts::GET_ACCOUNTS, args.clone());
    let before = cache.provided_tags(&accounts::GET_ACCOUNTS, &args).unwrap();
    assert_eq!(before.as_slice(), [Tag::list(TagType::Accounts)]);

    handle.settled().await;
    let after = cache.provided_tags(&accounts::GET_ACCOUNTS, &args).unwrap();
    assert!(after.contains(&account("a1")));
    assert!(after.contains(&account("a2")));
}

#[tokio::test]
async fn each_matching_entry_refetches_exactly_once() {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher
        .ok(Method::Get, "/account", fixtures::accounts_page(&["a1"]))
        .ok(Method::Get, "/account/a1", json!({ "id": "a1" }))
        .ok(Method::Get, "/product", json!([]));
    let cache = cache_with(&fetcher, KEEP);

    let mut list = cache.query(&accounts::GET_ACCOUNTS, json!({}));
    let mut detail = cache.query(&accounts::GET_ACCOUNT, json!("a1"));
    let mut unrelated = cache.query(&products::GET_PRODUCTS, json!({}));
    list.settled().await;
    detail.settled().await;
    unrelated.settled().await;
    fetcher.clear_calls();

    let tags = [Tag::list(TagType::Accounts), account("a1"), account("a1")];
    assert_eq!(cache.invalidate_tags(&tags), 2);

    list.settled().await;
    detail.settled().await;
    assert_eq!(fetcher.call_count(Method::Get, "/account"), 1);
    assert_eq!(fetcher.call_count(Method::Get, "/account/a1"), 1);
    assert_eq!(fetcher.call_count(Method::Get, "/product"), 0);
    assert_eq!(cache.stats().refetches, 2);
}

#[tokio::test]
async fn repeated_invalidation_converges() {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher.ok(Method::Get, "/account/a1", json!({ "id": "a1", "name": "Acme" }));
    let cache = cache_with(&fetcher, KEEP);

    let mut handle = cache.query(&accounts::GET_ACCOUNT, json!("a1"));
    let first = handle.settled().await;

    cache.invalidate_tags(&[account("a1")]);
    let once = handle.settled().await;
    cache.invalidate_tags(&[account("a1")]);
    let twice = handle.settled().await;

    assert_eq!(first.data, once.data);
    assert_eq!(once, twice);
    assert_eq!(fetcher.call_count(Method::Get, "/account/a1"), 3);
}

#[tokio::test]
async fn unrelated_tags_start_nothing() {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher.ok(Method::Get, "/account/a1", json!({ "id": "a1" }));
    let cache = cache_with(&fetcher, KEEP);

    let mut handle = cache.query(&accounts::GET_ACCOUNT, json!("a1"));
    handle.settled().await;

    assert_eq!(cache.invalidate_tags(&[account("a2"), Tag::list(TagType::Products)]), 0);
    assert_eq!(cache.invalidate_tags(&[]), 0);
    assert!(!handle.is_fetching());
}

#[tokio::test]
async fn unsubscribed_entries_refetch_on_next_subscription() {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher.ok(Method::Get, "/account/a1", json!({ "id": "a1" }));
    let cache = cache_with(&fetcher, KEEP);

    let mut handle = cache.query(&accounts::GET_ACCOUNT, json!("a1"));
    handle.settled().await;
    drop(handle);

    assert_eq!(cache.invalidate_tags(&[account("a1")]), 0);
    assert_eq!(fetcher.call_count(Method::Get, "/account/a1"), 1);

    let mut again = cache.query(&accounts::GET_ACCOUNT, json!("a1"));
    assert!(again.is_fetching());
    assert!(!again.is_loading());
    again.settled().await;
    assert_eq!(fetcher.call_count(Method::Get, "/account/a1"), 2);
}

#[tokio::test]
async fn unused_entries_are_collected() {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher.ok(Method::Get, "/account/a1", json!({ "id": "a1" }));
    let cache = cache_with(&fetcher, Duration::from_millis(20));

    let mut handle = cache.query(&accounts::GET_ACCOUNT, json!("a1"));
    handle.settled().await;
    assert_eq!(cache.stats().entries, 1);

    drop(handle);
    assert!(wait_until(Duration::from_secs(2), || cache.stats().entries == 0).await);
}

#[tokio::test]
async fn resubscribing_cancels_collection() {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher.ok(Method::Get, "/account/a1", json!({ "id": "a1" }));
    let cache = cache_with(&fetcher, Duration::from_millis(40));

    let mut handle = cache.query(&accounts::GET_ACCOUNT, json!("a1"));
    handle.settled().await;
    drop(handle);
    let _kept = cache.query(&accounts::GET_ACCOUNT, json!("a1"));

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(cache.stats().entries, 1);
    assert_eq!(fetcher.call_count(Method::Get, "/account/a1"), 1);
}

#[tokio::test]
async fn last_resolving_response_wins() {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher
        .enqueue(Method::Get, "/account/a1", Ok(json!({ "v": "slow" })), Duration::from_millis(80))
        .enqueue(Method::Get, "/account/a1", Ok(json!({ "v": "fast" })), Duration::ZERO);
    let cache = cache_with(&fetcher, KEEP);

    let mut handle = cache.query(&accounts::GET_ACCOUNT, json!("a1"));
    handle.refetch();

    let state = loop {
        let state = handle.changed().await;
        if state.data.is_some() {
            break state;
        }
    };
    assert_eq!(state.data, Some(json!({ "v": "fast" })));
    assert!(state.is_fetching);

    let state = handle.settled().await;
    assert_eq!(state.data, Some(json!({ "v": "slow" })));
}

#[tokio::test]
async fn responses_for_collected_entries_are_discarded() {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher
        .enqueue(Method::Get, "/account/a1", Ok(json!({ "v": "orphan" })), Duration::from_millis(60))
        .enqueue(Method::Get, "/account/a1", Ok(json!({ "v": "current" })), Duration::ZERO);
    let cache = cache_with(&fetcher, KEEP);

    let orphaned = cache.query(&accounts::GET_ACCOUNT, json!("a1"));
    cache.reset();
    drop(orphaned);

    let mut current = cache.query(&accounts::GET_ACCOUNT, json!("a1"));
    current.settled().await;
    tokio::time::sleep(Duration::from_millis(120)).await;

    let state = current.state();
    assert_eq!(state.data, Some(json!({ "v": "current" })));
    assert!(!state.is_fetching);
}

#[tokio::test]
async fn handles_from_before_a_reset_leave_the_new_entry_alone() {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher.ok(Method::Get, "/account/a1", json!({ "id": "a1" }));
    let cache = cache_with(&fetcher, Duration::ZERO);

    let mut before_reset = cache.query(&accounts::GET_ACCOUNT, json!("a1"));
    before_reset.settled().await;
    cache.reset();

    let mut live = cache.query(&accounts::GET_ACCOUNT, json!("a1"));
    live.settled().await;

    before_reset.refetch();
    drop(before_reset);
    tokio::time::sleep(Duration::from_millis(30)).await;

    let stats = cache.stats();
    assert_eq!((stats.entries, stats.subscribed), (1, 1));
    assert_eq!(fetcher.call_count(Method::Get, "/account/a1"), 2);

    assert_eq!(cache.invalidate_tags(&[account("a1")]), 1);
    let refetched = wait_until(Duration::from_secs(2), || {
        fetcher.call_count(Method::Get, "/account/a1") == 3
    })
    .await;
    assert!(refetched);
    assert!(live.settled().await.is_success());
}

#[tokio::test]
async fn failed_refetch_keeps_previous_data() {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher.ok(Method::Get, "/account/a1", json!({ "id": "a1" }));
    let cache = cache_with(&fetcher, KEEP);

    let mut handle = cache.query(&accounts::GET_ACCOUNT, json!("a1"));
    handle.settled().await;

    fetcher.err(Method::Get, "/account/a1", ApiError::http(503, Value::Null));
    cache.invalidate_tags(&[account("a1")]);
    let state = handle.settled().await;

    assert!(state.is_error());
    assert_eq!(state.data, Some(json!({ "id": "a1" })));
    assert_eq!(state.error.map(|e| e.status), Some(ledgerline_client::ErrorStatus::Http(503)));
}

#[tokio::test]
async fn bad_arguments_reject_without_a_request() {
    let fetcher = Arc::new(MockFetcher::new());
    let cache = cache_with(&fetcher, KEEP);

    let mut handle = cache.query(&accounts::GET_ACCOUNT, Value::Null);
    let state = handle.settled().await;
    assert_eq!(state.status, QueryStatus::Rejected);
    assert_eq!(fetcher.total_calls(), 0);
}

#[tokio::test]
async fn mutation_success_invalidates_and_failure_does_not() {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher
        .ok(Method::Get, "/account", fixtures::accounts_page(&["a1"]))
        .set(Method::Post, "/account", Ok(json!({ "id": "a9" })), Duration::from_millis(30));
    let cache = cache_with(&fetcher, KEEP);

    let mut list = cache.query(&accounts::GET_ACCOUNTS, json!({}));
    list.settled().await;

    let create = cache.mutation(&accounts::CREATE_ACCOUNT);
    let pending = {
        let create = create.clone();
        tokio::spawn(async move { create.trigger(json!({ "name": "Acme" })).await })
    };
    assert!(wait_until(Duration::from_secs(1), || create.is_loading()).await);
    pending.await.unwrap().unwrap();
    assert!(!create.is_loading());

    list.settled().await;
    assert_eq!(fetcher.call_count(Method::Get, "/account"), 2);

    fetcher.err(Method::Post, "/account", ApiError::http(422, json!({ "message": "dup" })));
    assert!(create.trigger(json!({ "name": "Acme" })).await.is_err());
    assert_eq!(fetcher.call_count(Method::Get, "/account"), 2);
}

#[tokio::test]
async fn realtime_frames_drive_invalidation() {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher
        .ok(Method::Get, "/account", fixtures::accounts_page(&["a1"]))
        .ok(Method::Get, "/account/a2", json!({ "id": "a2" }));
    let cache = cache_with(&fetcher, KEEP);

    let mut list = cache.query(&accounts::GET_ACCOUNTS, json!({}));
    let mut other = cache.query(&accounts::GET_ACCOUNT, json!("a2"));
    list.settled().await;
    other.settled().await;

    assert_eq!(apply_frame(&cache, r#"{"event":"account_update_info","data":"a1"}"#), 1);
    assert_eq!(apply_frame(&cache, r#"["accounts_deleted", {"ids": ["a2"]}]"#), 2);
    assert_eq!(apply_frame(&cache, r#"{"event":"mystery","data":{}}"#), 0);
    assert_eq!(apply_frame(&cache, "not json"), 0);
    list.settled().await;
    other.settled().await;
    assert_eq!(fetcher.call_count(Method::Get, "/account/a2"), 2);
}
