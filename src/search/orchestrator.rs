//! # Resilient Search Orchestrator
//!
//! One call contract over two engines: try the primary under the shared
//! breaker with a deadline, answer from the fallback on any failure, and tag
//! where the answer came from. Callers only ever see invalid-query errors or
//! a fallback that failed too.

use super::engine::{engine_failure_policy, EngineError, PrimaryQueryEngine};
use super::fallback::FallbackQueryEngine;
use super::types::{ResultSource, SearchKind, SearchQuery, SearchResult};
use crate::cache::{CacheCategory, CacheStore, KeyArgs};
use crate::config::SearchSettings;
use crate::error::{PrimaryFailure, Result, SearchError};
use crate::metrics;
use crate::resilience::{CircuitBreaker, CircuitBreakerError, CircuitBreakerRegistry};
use opentelemetry::KeyValue;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ResilientSearchOrchestrator {
    primary: Arc<dyn PrimaryQueryEngine>,
    fallback: FallbackQueryEngine,
    breaker: Arc<CircuitBreaker>,
    settings: SearchSettings,
}

impl ResilientSearchOrchestrator {
    /// Resolve the shared primary-engine breaker from `registry`.
    ///
    /// Every orchestrator built from the same registry and breaker name
    /// shares one breaker.
    pub fn new(
        primary: Arc<dyn PrimaryQueryEngine>,
        fallback: FallbackQueryEngine,
        registry: &CircuitBreakerRegistry,
        settings: SearchSettings,
    ) -> Self {
        let name = settings.breaker_name.as_str();
        let breaker = registry.get_or_create(
            name,
            registry.settings().config_for_component(name),
            engine_failure_policy(),
        );

        let fallback = fallback.with_max_scan(settings.max_fallback_scan);

        info!(
            primary = primary.name(),
            fallback_store = fallback.store().name(),
            breaker = name,
            primary_timeout_ms = settings.primary_timeout_ms,
            max_fallback_scan = settings.max_fallback_scan,
            "Search orchestrator initialized"
        );

        Self {
            primary,
            fallback,
            breaker,
            settings,
        }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn primary(&self) -> &Arc<dyn PrimaryQueryEngine> {
        &self.primary
    }

    pub fn fallback(&self) -> &FallbackQueryEngine {
        &self.fallback
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    #[instrument(skip_all, fields(request_id = %Uuid::new_v4(), kind = %query.kind()))]
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResult> {
        let started = Instant::now();
        query.validate()?;
        let query = query.clone().normalized(&self.settings);
        let kind = query.kind();

        let failure = match self.call_primary(&query).await {
            Ok(result) => {
                let result = result.tagged(ResultSource::Primary);
                record_completion(kind, result.source.as_str(), &result, started);
                return Ok(result);
            }
            Err(failure) => failure,
        };

        match &failure {
            PrimaryFailure::CircuitOpen { component } => {
                info!(component = %component, "Primary engine circuit open, serving fallback")
            }
            PrimaryFailure::Engine(e) => {
                warn!(error = %e, "Primary engine failed, serving fallback")
            }
            PrimaryFailure::Unexpected(e) => {
                error!(error = %e, "Primary engine raised unexpected error, serving fallback")
            }
        }

        metrics::search::search_fallbacks_total().add(
            1,
            &[
                KeyValue::new("kind", kind.as_str()),
                KeyValue::new("reason", failure.reason()),
            ],
        );

        match self.fallback.search(&query).await {
            Ok(result) => {
                let result = result.tagged(ResultSource::Fallback);
                record_completion(kind, result.source.as_str(), &result, started);
                Ok(result)
            }
            Err(source) => {
                error!(
                    primary_error = %failure,
                    fallback_error = %source,
                    "Fallback search failed, no engine available"
                );
                Err(SearchError::FallbackExhausted {
                    primary: failure,
                    source,
                })
            }
        }
    }

    /// [`search`](Self::search) behind the response cache.
    ///
    /// Only primary-sourced results are stored, so a degraded answer is never
    /// served after the primary recovers.
    pub async fn search_cached(
        &self,
        cache: &CacheStore,
        query: &SearchQuery,
    ) -> Result<SearchResult> {
        let started = Instant::now();
        query.validate()?;
        let query = query.clone().normalized(&self.settings);
        let kind = query.kind();
        let category = cache_category_for(kind);

        let args = match KeyArgs::new()
            .scoped(kind.as_str())
            .kwarg_json("query", &query)
        {
            Ok(args) => args,
            Err(e) => {
                warn!(error = %e, "Could not derive cache key, searching uncached");
                return self.search(&query).await;
            }
        };

        if let Some(cached) = cache.get::<SearchResult>(category, &args).await {
            debug!(kind = %kind, "Search served from cache");
            record_completion(kind, "cache", &cached, started);
            return Ok(cached);
        }

        let result = self.search(&query).await?;
        if result.source == ResultSource::Primary {
            cache.set(category, &result, None, &args).await;
        }
        Ok(result)
    }

    async fn call_primary(
        &self,
        query: &SearchQuery,
    ) -> std::result::Result<SearchResult, PrimaryFailure> {
        let deadline = self.settings.primary_timeout();
        let primary = &self.primary;

        self.breaker
            .call(|| async move {
                match tokio::time::timeout(deadline, primary.search(query)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(EngineError::Timeout { after: deadline }),
                }
            })
            .await
            .map_err(|err| match err {
                CircuitBreakerError::CircuitOpen { component, .. } => {
                    PrimaryFailure::CircuitOpen { component }
                }
                CircuitBreakerError::OperationFailed(e) => PrimaryFailure::Engine(e),
                CircuitBreakerError::Unexpected(e) => PrimaryFailure::Unexpected(e),
            })
    }
}

/// Cache category holding results of each query kind
pub fn cache_category_for(kind: SearchKind) -> CacheCategory {
    match kind {
        SearchKind::Text | SearchKind::TypeFilter => CacheCategory::SearchResult,
        SearchKind::Geo => CacheCategory::GeoResult,
        SearchKind::Autocomplete => CacheCategory::Api,
    }
}

fn record_completion(kind: SearchKind, source: &'static str, result: &SearchResult, started: Instant) {
    let labels = [
        KeyValue::new("kind", kind.as_str()),
        KeyValue::new("source", source),
    ];
    metrics::search::search_requests_total().add(1, &labels);
    metrics::search::search_duration().record(started.elapsed().as_secs_f64() * 1000.0, &labels);
    metrics::search::search_results_count().record(result.hits.len() as u64, &labels);
}
