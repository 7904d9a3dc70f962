use super::*;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const COLLECTION: &str = "pcc_api_cache";
const DAY: Duration = Duration::from_secs(86_400);

fn memory_accessor() -> (CacheAccessor, Arc<MemoryCacheStore>) {
    let store = Arc::new(MemoryCacheStore::new());
    (CacheAccessor::new(store.clone()), store)
}

#[tokio::test]
async fn test_get_missing_key_is_none() {
    let (cache, _) = memory_accessor();
    assert!(cache.get(COLLECTION, "absent").await.is_none());
}

#[tokio::test]
async fn test_set_then_get_returns_value() {
    let (cache, _) = memory_accessor();
    cache
        .set(COLLECTION, "k", json!({"records": []}), DAY)
        .await;

    assert_eq!(cache.get(COLLECTION, "k").await, Some(json!({"records": []})));
}

#[tokio::test]
async fn test_collections_are_isolated() {
    let (cache, _) = memory_accessor();
    cache.set("twincn_api_cache", "k", json!("html"), DAY).await;

    assert!(cache.get(COLLECTION, "k").await.is_none());
    assert_eq!(cache.get("twincn_api_cache", "k").await, Some(json!("html")));
}

#[tokio::test]
async fn test_expired_entry_is_a_miss_but_not_deleted() {
    let (cache, store) = memory_accessor();
    cache.set(COLLECTION, "k", json!(1), Duration::ZERO).await;

    assert!(cache.get(COLLECTION, "k").await.is_none());
    let raw = store.find(COLLECTION, "k").await.unwrap();
    assert!(raw.is_some(), "read must not purge");
}

#[tokio::test]
async fn test_get_at_respects_expiry_boundary() {
    let (cache, _) = memory_accessor();
    cache.set(COLLECTION, "k", json!(1), Duration::from_secs(60)).await;

    let later = Utc::now() + chrono::Duration::seconds(61);
    assert!(cache.get_at(COLLECTION, "k", later).await.is_none());
    assert!(cache.get_at(COLLECTION, "k", Utc::now()).await.is_some());
}

#[tokio::test]
async fn test_set_overwrites_existing_entry() {
    let (cache, _) = memory_accessor();
    cache.set(COLLECTION, "k", json!("old"), DAY).await;
    cache.set(COLLECTION, "k", json!("new"), DAY).await;

    assert_eq!(cache.get(COLLECTION, "k").await, Some(json!("new")));
}

#[tokio::test]
async fn test_get_or_fetch_calls_upstream_once_within_ttl() {
    let (cache, _) = memory_accessor();
    let calls = AtomicUsize::new(0);
    let counter = &calls;

    for expected in [CacheStatus::Miss, CacheStatus::Hit, CacheStatus::Hit] {
        let (value, status) = cache
            .get_or_fetch(COLLECTION, "k", DAY, || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(json!({"n": 1}))
            })
            .await
            .unwrap();
        assert_eq!(value, json!({"n": 1}));
        assert_eq!(status, expected);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_get_or_fetch_refetches_after_expiry() {
    let (cache, _) = memory_accessor();
    let calls = AtomicUsize::new(0);
    let counter = &calls;

    for _ in 0..2 {
        let (_, status) = cache
            .get_or_fetch(COLLECTION, "k", Duration::ZERO, || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(json!("v"))
            })
            .await
            .unwrap();
        assert_eq!(status, CacheStatus::Miss);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_get_or_fetch_error_is_not_cached() {
    let (cache, store) = memory_accessor();

    let result = cache
        .get_or_fetch(COLLECTION, "k", DAY, || async {
            Err::<serde_json::Value, _>("upstream returned 503".to_string())
        })
        .await;

    assert_eq!(result.unwrap_err(), "upstream returned 503");
    assert!(store.find(COLLECTION, "k").await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_or_fetch_null_body_is_not_cached() {
    let (cache, store) = memory_accessor();

    let (value, status) = cache
        .get_or_fetch(COLLECTION, "k", DAY, || async {
            Ok::<_, String>(serde_json::Value::Null)
        })
        .await
        .unwrap();

    assert!(value.is_null());
    assert_eq!(status, CacheStatus::Miss);
    assert!(store.find(COLLECTION, "k").await.unwrap().is_none());
}

#[tokio::test]
async fn test_store_faults_degrade_to_miss() {
    let cache = CacheAccessor::new(Arc::new(FailingCacheStore));

    cache.set(COLLECTION, "k", json!(1), DAY).await;
    assert!(cache.get(COLLECTION, "k").await.is_none());

    let (value, status) = cache
        .get_or_fetch(COLLECTION, "k", DAY, || async { Ok::<_, String>(json!(2)) })
        .await
        .unwrap();
    assert_eq!(value, json!(2));
    assert_eq!(status, CacheStatus::Miss);
    assert!(!cache.is_healthy().await);
}

#[tokio::test]
async fn test_purge_expired_removes_only_stale_entries() {
    let (cache, store) = memory_accessor();
    cache.set(COLLECTION, "stale", json!(1), Duration::ZERO).await;
    cache.set(COLLECTION, "fresh", json!(2), DAY).await;
    cache.set("twincn_api_cache", "other", json!(3), Duration::ZERO).await;

    let removed = cache.purge_expired(COLLECTION).await.unwrap();

    assert_eq!(removed, 1);
    assert!(store.find(COLLECTION, "stale").await.unwrap().is_none());
    assert!(store.find(COLLECTION, "fresh").await.unwrap().is_some());
    assert!(store.find("twincn_api_cache", "other").await.unwrap().is_some());
}

#[test]
fn test_cache_status_header_values() {
    assert_eq!(CacheStatus::Hit.as_header_value(), "HIT");
    assert_eq!(CacheStatus::Miss.to_string(), "MISS");
    assert!(CacheStatus::Hit.is_hit());
    assert!(!CacheStatus::Miss.is_hit());
}

#[test]
fn test_entry_liveness() {
    let now = Utc::now();
    let entry = CacheEntry::new("k", json!(null), now, Duration::from_secs(10));

    assert!(entry.is_live(now));
    assert!(!entry.is_live(now + chrono::Duration::seconds(10)));
    assert_eq!(entry.fetched_at, now);
}

#[test]
fn test_entry_serializes_timestamps_as_rfc3339() {
    let now = chrono::DateTime::parse_from_rfc3339("2025-03-01T08:00:00Z")
        .unwrap()
        .with_timezone(&Utc);
    let entry = CacheEntry::new("k", json!("<html></html>"), now, DAY);

    let encoded = serde_json::to_value(&entry).unwrap();
    assert_eq!(encoded["fetched_at"], "2025-03-01T08:00:00Z");
    assert_eq!(encoded["expires_at"], "2025-03-02T08:00:00Z");

    let decoded: CacheEntry = serde_json::from_value(encoded).unwrap();
    assert_eq!(decoded, entry);
}
