//! Response cache behaviour across categories, languages and invalidation.

#![cfg(feature = "cache-moka")]

use resilient_search::cache::{CacheCategory, CacheProvider, CacheStore, KeyArgs};
use resilient_search::config::CacheSettings;
use serde_json::{json, Value};
use std::time::Duration;

fn store() -> CacheStore {
    CacheStore::new(CacheProvider::moka(1_000), &CacheSettings::default())
}

fn item(id: i64, lang: &str) -> KeyArgs {
    KeyArgs::for_item(id).kwarg("lang", lang)
}

#[tokio::test]
async fn item_entries_are_keyed_by_language() {
    let cache = store();
    let chateau = json!({"name": "Château"});

    assert!(cache.set(CacheCategory::Item, &chateau, None, &item(42, "fr")).await);

    let hit: Option<Value> = cache.get(CacheCategory::Item, &item(42, "fr")).await;
    assert_eq!(hit, Some(chateau));

    let other_language: Option<Value> = cache.get(CacheCategory::Item, &item(42, "en")).await;
    assert_eq!(other_language, None);
}

#[tokio::test]
async fn same_arguments_in_another_category_miss() {
    let cache = store();
    let args = KeyArgs::new().arg("lyon");

    cache
        .set(CacheCategory::SearchResult, &vec![1, 2, 3], None, &args)
        .await;

    let geo: Option<Vec<i32>> = cache.get(CacheCategory::GeoResult, &args).await;
    assert_eq!(geo, None);
    let search: Option<Vec<i32>> = cache.get(CacheCategory::SearchResult, &args).await;
    assert_eq!(search, Some(vec![1, 2, 3]));
}

#[tokio::test]
async fn invalidating_an_item_drops_every_language() {
    let cache = store();
    for lang in ["fr", "en", "de"] {
        cache
            .set(CacheCategory::Item, &json!({"lang": lang}), None, &item(7, lang))
            .await;
    }
    cache
        .set(CacheCategory::Item, &json!({"lang": "fr"}), None, &item(8, "fr"))
        .await;

    assert_eq!(cache.invalidate_item(7).await, 3);

    let gone: Option<Value> = cache.get(CacheCategory::Item, &item(7, "en")).await;
    assert_eq!(gone, None);
    let kept: Option<Value> = cache.get(CacheCategory::Item, &item(8, "fr")).await;
    assert!(kept.is_some());
}

#[tokio::test]
async fn invalidating_searches_keeps_items() {
    let cache = store();
    cache
        .set(CacheCategory::SearchResult, &"text", None, &KeyArgs::new().arg("lac"))
        .await;
    cache
        .set(CacheCategory::GeoResult, &"geo", None, &KeyArgs::new().arg(45.9))
        .await;
    cache
        .set(CacheCategory::Item, &"item", None, &item(1, "fr"))
        .await;

    assert_eq!(cache.invalidate_searches().await, 2);

    let item_value: Option<String> = cache.get(CacheCategory::Item, &item(1, "fr")).await;
    assert_eq!(item_value.as_deref(), Some("item"));
}

#[tokio::test]
async fn namespaces_are_isolated() {
    let provider = CacheProvider::moka(1_000);
    let tourism = CacheStore::new(provider.clone(), &CacheSettings::default());
    let partner = CacheStore::new(
        provider,
        &CacheSettings {
            namespace: "partner".to_string(),
            ..CacheSettings::default()
        },
    );

    tourism
        .set(CacheCategory::Api, &"ours", None, &KeyArgs::new().arg("k"))
        .await;
    partner
        .set(CacheCategory::Api, &"theirs", None, &KeyArgs::new().arg("k"))
        .await;

    assert!(partner.clear().await);

    let ours: Option<String> = tourism.get(CacheCategory::Api, &KeyArgs::new().arg("k")).await;
    assert_eq!(ours.as_deref(), Some("ours"));
    let theirs: Option<String> = partner.get(CacheCategory::Api, &KeyArgs::new().arg("k")).await;
    assert_eq!(theirs, None);
}

#[tokio::test]
async fn disabled_cache_always_misses() {
    let cache = CacheStore::new(CacheProvider::noop(), &CacheSettings::default());

    cache
        .set(CacheCategory::Item, &"value", Some(Duration::from_secs(60)), &item(1, "fr"))
        .await;

    let value: Option<String> = cache.get(CacheCategory::Item, &item(1, "fr")).await;
    assert_eq!(value, None);
    assert!(cache.health_check().await);
}

#[tokio::test]
async fn warm_reports_stored_entries() {
    let cache = store();
    let entries = (1..=5).map(|id| (item(id, "fr"), json!({"id": id})));

    assert_eq!(cache.warm(CacheCategory::Item, entries).await, 5);

    let third: Option<Value> = cache.get(CacheCategory::Item, &item(3, "fr")).await;
    assert_eq!(third, Some(json!({"id": 3})));
}
