//! End-to-end behaviour of the orchestrator over a scripted primary engine
//! and an in-memory durable store.

mod common;

use common::*;
use resilient_search::config::SearchSettings;
use resilient_search::error::{PrimaryFailure, SearchError};
use resilient_search::resilience::{CircuitBreakerRegistry, CircuitState};
use resilient_search::search::{
    EngineError, FallbackQueryEngine, Page, ResilientSearchOrchestrator, ResultSource,
    SearchFilters, SearchQuery, SearchResult,
};
use resilient_search::store::GroupField;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

fn hit_ids(result: &SearchResult) -> BTreeSet<i64> {
    result.hits.iter().map(|h| h.id).collect()
}

fn facet_map(result: &SearchResult, name: &str) -> BTreeMap<String, u64> {
    result
        .facet(name)
        .unwrap_or_default()
        .iter()
        .map(|b| (b.key.clone(), b.count))
        .collect()
}

fn connection_refused() -> EngineError {
    EngineError::Connection("connection refused".to_string())
}

#[tokio::test]
async fn healthy_primary_answers_and_is_tagged() {
    let harness = Harness::new(ScriptedEngine::succeeding(), 5, Duration::from_secs(60));

    let result = harness
        .orchestrator
        .search(&SearchQuery::text("château"))
        .await
        .unwrap();

    assert_eq!(result.source, ResultSource::Primary);
    assert!(!result.fallback);
    assert_eq!(hit_ids(&result), BTreeSet::from([PRIMARY_HIT_ID]));
    assert_eq!(harness.engine.calls(), 1);
}

#[tokio::test]
async fn failing_primary_falls_back_to_the_store() {
    let harness = Harness::new(ScriptedEngine::failing(connection_refused()), 5, Duration::from_secs(60));
    let query = SearchQuery::text("château").with_page(Page::new(1, 100));

    let result = harness.orchestrator.search(&query).await.unwrap();

    assert_eq!(result.source, ResultSource::Fallback);
    assert!(result.fallback);
    assert_eq!(hit_ids(&result), BTreeSet::from([1, 3, 5, 10]));
    assert_eq!(result.total, 4);
}

#[tokio::test]
async fn fallback_hits_match_a_linear_scan() {
    let harness = Harness::new(ScriptedEngine::failing(connection_refused()), 1, Duration::from_secs(60));
    let records = tourism_dataset();

    let queries = vec![
        SearchQuery::text("lac"),
        SearchQuery::text("musée château").with_language("en"),
        SearchQuery::text("castle").with_language("en"),
        SearchQuery::text("lyon").with_filters(SearchFilters {
            resource_types: vec!["Restaurant".to_string()],
            ..Default::default()
        }),
        SearchQuery::geo(LYON, 5.0),
        SearchQuery::geo(ANNECY, 10.0).with_filters(SearchFilters {
            date_from: chrono::NaiveDate::from_ymd_opt(2020, 1, 1),
            ..Default::default()
        }),
        SearchQuery::by_types(["Museum", "NaturalHeritage"]),
    ];

    for query in queries {
        let query = query.with_page(Page::new(1, 100));
        let result = harness.orchestrator.search(&query).await.unwrap();
        let expected = reference_ids(&records, &query.store_query().unwrap());

        assert_eq!(result.source, ResultSource::Fallback, "{query:?}");
        assert_eq!(hit_ids(&result), expected, "{query:?}");
        assert_eq!(result.total, expected.len() as u64, "{query:?}");
    }

    // only the first call reached the engine; the rest were rejected by the open breaker
    assert_eq!(harness.engine.calls(), 1);
}

#[tokio::test]
async fn fallback_facets_are_exact_counts() {
    let harness = Harness::new(ScriptedEngine::failing(connection_refused()), 5, Duration::from_secs(60));
    let records = tourism_dataset();
    let query = SearchQuery::text("château");

    let result = harness.orchestrator.search(&query).await.unwrap();
    let filter = query.store_query().unwrap();

    assert_eq!(
        facet_map(&result, "types"),
        reference_counts(&records, &filter, GroupField::ResourceType)
    );
    assert_eq!(
        facet_map(&result, "cities"),
        reference_counts(&records, &filter, GroupField::City)
    );

    let cities = result.facet("cities").unwrap();
    assert!(cities.windows(2).all(|w| w[0].count >= w[1].count));
}

#[tokio::test]
async fn geo_fallback_orders_by_distance() {
    let harness = Harness::new(ScriptedEngine::failing(connection_refused()), 5, Duration::from_secs(60));

    let result = harness
        .orchestrator
        .search(&SearchQuery::geo(LYON, 5.0))
        .await
        .unwrap();

    let distances: Vec<f64> = result.hits.iter().map(|h| h.distance_km.unwrap()).collect();
    assert!(!distances.is_empty());
    assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    assert!(distances.iter().all(|d| *d <= 5.0));
    // the inactive château is within range but never returned
    assert!(!hit_ids(&result).contains(&9));
}

#[tokio::test(start_paused = true)]
async fn sixth_call_after_five_timeouts_skips_the_primary() {
    let harness = Harness::new(ScriptedEngine::hanging(), 5, Duration::from_secs(60));
    let query = SearchQuery::text("lac").with_page(Page::new(1, 100));
    let expected = reference_ids(&tourism_dataset(), &query.store_query().unwrap());

    for _ in 0..5 {
        let result = harness.orchestrator.search(&query).await.unwrap();
        assert_eq!(result.source, ResultSource::Fallback);
    }
    assert_eq!(harness.engine.calls(), 5);
    assert_eq!(harness.orchestrator.breaker().state(), CircuitState::Open);

    let sixth = harness.orchestrator.search(&query).await.unwrap();
    assert_eq!(sixth.source, ResultSource::Fallback);
    assert_eq!(hit_ids(&sixth), expected);
    assert_eq!(harness.engine.calls(), 5);
}

#[tokio::test(start_paused = true)]
async fn failed_recovery_trial_still_returns_fallback() {
    let harness = Harness::new(ScriptedEngine::failing(connection_refused()), 1, Duration::from_secs(30));
    let query = SearchQuery::text("parc");

    harness.orchestrator.search(&query).await.unwrap();
    assert_eq!(harness.orchestrator.breaker().state(), CircuitState::Open);

    tokio::time::advance(Duration::from_secs(30)).await;
    let result = harness.orchestrator.search(&query).await.unwrap();

    assert_eq!(result.source, ResultSource::Fallback);
    assert_eq!(harness.engine.calls(), 2);
    assert_eq!(harness.orchestrator.breaker().state(), CircuitState::Open);
}

#[tokio::test(start_paused = true)]
async fn primary_is_used_again_after_recovery() {
    let harness = Harness::new(ScriptedEngine::failing(connection_refused()), 2, Duration::from_secs(30));
    let query = SearchQuery::text("parc");

    for _ in 0..2 {
        harness.orchestrator.search(&query).await.unwrap();
    }
    assert_eq!(harness.orchestrator.breaker().state(), CircuitState::Open);

    harness.engine.set_script(Script::Succeed);
    let still_open = harness.orchestrator.search(&query).await.unwrap();
    assert_eq!(still_open.source, ResultSource::Fallback);

    tokio::time::advance(Duration::from_secs(30)).await;
    let recovered = harness.orchestrator.search(&query).await.unwrap();
    assert_eq!(recovered.source, ResultSource::Primary);
    assert_eq!(harness.orchestrator.breaker().state(), CircuitState::Closed);
}

#[tokio::test]
async fn rejected_queries_are_not_counted_but_still_answered() {
    let harness = Harness::new(
        ScriptedEngine::failing(EngineError::MalformedQuery("unbalanced quote".to_string())),
        2,
        Duration::from_secs(60),
    );

    for _ in 0..5 {
        let result = harness
            .orchestrator
            .search(&SearchQuery::text("château"))
            .await
            .unwrap();
        assert_eq!(result.source, ResultSource::Fallback);
    }

    let stats = harness.orchestrator.breaker().stats();
    assert_eq!(stats.state, CircuitState::Closed);
    assert_eq!(stats.failure_count, 0);
    assert_eq!(harness.engine.calls(), 5);
}

#[tokio::test]
async fn store_outage_after_primary_failure_is_reported() {
    let harness = Harness::new(ScriptedEngine::failing(connection_refused()), 5, Duration::from_secs(60));
    harness.store.set_available(false);

    let err = harness
        .orchestrator
        .search(&SearchQuery::text("château"))
        .await
        .unwrap_err();

    match err {
        SearchError::FallbackExhausted { primary, .. } => {
            assert_eq!(primary, PrimaryFailure::Engine(connection_refused()));
        }
        other => panic!("expected FallbackExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn store_outage_is_invisible_while_primary_is_healthy() {
    let harness = Harness::new(ScriptedEngine::succeeding(), 5, Duration::from_secs(60));
    harness.store.set_available(false);

    let result = harness
        .orchestrator
        .search(&SearchQuery::text("château"))
        .await
        .unwrap();
    assert_eq!(result.source, ResultSource::Primary);
}

#[tokio::test]
async fn invalid_queries_never_reach_an_engine() {
    let harness = Harness::new(ScriptedEngine::succeeding(), 5, Duration::from_secs(60));

    let invalid = vec![
        SearchQuery::text("   "),
        SearchQuery::text("lac").with_language("french"),
        SearchQuery::geo(LYON, 0.0),
        SearchQuery::geo(resilient_search::store::GeoPoint::new(95.0, 4.8), 10.0),
        SearchQuery::by_types(Vec::<String>::new()),
        SearchQuery::autocomplete("", 5),
    ];

    for query in invalid {
        let err = harness.orchestrator.search(&query).await.unwrap_err();
        assert!(err.is_client_error(), "{query:?}");
    }

    assert_eq!(harness.engine.calls(), 0);
    assert_eq!(harness.orchestrator.breaker().stats().total_calls, 0);
}

#[tokio::test]
async fn autocomplete_fallback_is_empty() {
    let harness = Harness::new(ScriptedEngine::failing(connection_refused()), 5, Duration::from_secs(60));

    let result = harness
        .orchestrator
        .search(&SearchQuery::autocomplete("chât", 5))
        .await
        .unwrap();

    assert_eq!(result.source, ResultSource::Fallback);
    assert!(result.suggestions.is_empty());
    assert!(result.hits.is_empty());
}

#[tokio::test]
async fn oversized_pages_are_clamped() {
    let harness = Harness::new(ScriptedEngine::failing(connection_refused()), 5, Duration::from_secs(60));

    let result = harness
        .orchestrator
        .search(&SearchQuery::by_types(["PlaceOfInterest"]).with_page(Page::new(0, 10_000)))
        .await
        .unwrap();

    assert_eq!(result.page, 1);
    assert_eq!(result.page_size, 100);
}

#[tokio::test]
async fn orchestrators_on_one_registry_share_the_breaker() {
    let harness = Harness::new(ScriptedEngine::failing(connection_refused()), 1, Duration::from_secs(60));
    let other = resilient_search::search::ResilientSearchOrchestrator::new(
        harness.orchestrator.primary().clone(),
        harness.orchestrator.fallback().clone(),
        &harness.registry,
        harness.orchestrator.settings().clone(),
    );

    assert!(std::sync::Arc::ptr_eq(harness.orchestrator.breaker(), other.breaker()));

    harness.orchestrator.search(&SearchQuery::text("lac")).await.unwrap();
    other.search(&SearchQuery::text("lac")).await.unwrap();

    // the second orchestrator saw the breaker the first one opened
    assert_eq!(harness.engine.calls(), 1);
}

#[tokio::test]
async fn breaker_looked_up_before_the_orchestrator_keeps_the_engine_policy() {
    let registry = CircuitBreakerRegistry::from_settings(breaker_settings(2, Duration::from_secs(60)));
    // a health endpoint touching the breaker first
    let early = registry.get_or_create_default("search-engine");

    let engine = ScriptedEngine::failing(EngineError::MalformedQuery("unbalanced quote".to_string()));
    let orchestrator = ResilientSearchOrchestrator::new(
        engine.clone(),
        FallbackQueryEngine::new(dataset_store()),
        &registry,
        SearchSettings::default(),
    );
    assert!(std::sync::Arc::ptr_eq(&early, orchestrator.breaker()));

    for _ in 0..5 {
        let result = orchestrator.search(&SearchQuery::text("château")).await.unwrap();
        assert_eq!(result.source, ResultSource::Fallback);
    }

    assert_eq!(early.state(), CircuitState::Closed);
    assert_eq!(early.stats().failure_count, 0);
    assert_eq!(engine.calls(), 5);
}

#[tokio::test]
async fn fallback_scan_is_bounded_by_settings() {
    let registry = CircuitBreakerRegistry::from_settings(breaker_settings(5, Duration::from_secs(60)));
    let settings = SearchSettings {
        max_fallback_scan: 2,
        ..SearchSettings::default()
    };
    let orchestrator = ResilientSearchOrchestrator::new(
        ScriptedEngine::failing(connection_refused()),
        FallbackQueryEngine::new(dataset_store()),
        &registry,
        settings,
    );
    assert_eq!(orchestrator.fallback().max_scan(), 2);

    let result = orchestrator.search(&SearchQuery::text("château")).await.unwrap();

    assert_eq!(result.source, ResultSource::Fallback);
    // only the two lowest matching ids were read; the total still counts all four
    assert_eq!(hit_ids(&result), BTreeSet::from([1, 3]));
    assert_eq!(result.total, 4);

    let filter = SearchQuery::text("château").store_query().unwrap();
    assert_eq!(
        facet_map(&result, "types"),
        reference_counts(&tourism_dataset(), &filter, GroupField::ResourceType)
    );
}

#[cfg(feature = "cache-moka")]
mod cached {
    use super::*;
    use resilient_search::cache::{CacheProvider, CacheStore};
    use resilient_search::config::CacheSettings;

    fn cache() -> CacheStore {
        CacheStore::new(CacheProvider::moka(1_000), &CacheSettings::default())
    }

    #[tokio::test]
    async fn primary_results_are_served_from_cache() {
        let harness = Harness::new(ScriptedEngine::succeeding(), 5, Duration::from_secs(60));
        let cache = cache();
        let query = SearchQuery::text("château");

        let first = harness.orchestrator.search_cached(&cache, &query).await.unwrap();
        let second = harness.orchestrator.search_cached(&cache, &query).await.unwrap();

        assert_eq!(harness.engine.calls(), 1);
        assert_eq!(first.hits, second.hits);
        assert_eq!(second.source, ResultSource::Primary);
    }

    #[tokio::test]
    async fn fallback_results_are_not_cached() {
        let harness = Harness::new(ScriptedEngine::failing(connection_refused()), 5, Duration::from_secs(60));
        let cache = cache();
        let query = SearchQuery::text("château");

        let degraded = harness.orchestrator.search_cached(&cache, &query).await.unwrap();
        assert!(degraded.is_fallback());

        harness.engine.set_script(Script::Succeed);
        let fresh = harness.orchestrator.search_cached(&cache, &query).await.unwrap();

        assert_eq!(fresh.source, ResultSource::Primary);
        assert_eq!(harness.engine.calls(), 2);
    }

    #[tokio::test]
    async fn different_languages_are_cached_separately() {
        let harness = Harness::new(ScriptedEngine::succeeding(), 5, Duration::from_secs(60));
        let cache = cache();

        harness
            .orchestrator
            .search_cached(&cache, &SearchQuery::text("lac"))
            .await
            .unwrap();
        harness
            .orchestrator
            .search_cached(&cache, &SearchQuery::text("lac").with_language("en"))
            .await
            .unwrap();

        assert_eq!(harness.engine.calls(), 2);
    }
}
