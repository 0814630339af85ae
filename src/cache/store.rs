//! # Cache Store
//!
//! Typed, category-aware cache over a [`CacheProvider`]. Keys are derived
//! from call arguments (see [`super::keys`]) and namespaced; values are JSON.
//!
//! The cache is an optimization: every backend call is bounded by the
//! configured operation timeout, and any failure degrades to a miss (`None`,
//! `false` or `0`) with a warning instead of an error.

use super::category::CacheCategory;
use super::errors::{CacheError, CacheResult};
use super::keys::{derive_key, KeyArgs};
use super::provider::CacheProvider;
use crate::config::{CacheSettings, CacheTtlSettings};
use crate::metrics;
use opentelemetry::KeyValue;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Cache statistics as reported to operators
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub provider: String,
    pub available: bool,
    pub connected_clients: u64,
    pub used_memory: u64,
    pub used_memory_human: String,
    pub keyspace_hits: u64,
    pub keyspace_misses: u64,
    /// Hits as a percentage of lookups (0 when there were none)
    pub hit_rate: f64,
    pub entry_count: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct CacheStore {
    provider: CacheProvider,
    namespace: String,
    ttls: CacheTtlSettings,
    operation_timeout: Duration,
}

impl CacheStore {
    pub fn new(provider: CacheProvider, settings: &CacheSettings) -> Self {
        Self {
            provider,
            namespace: settings.namespace.clone(),
            ttls: settings.ttl.clone(),
            operation_timeout: Duration::from_millis(settings.operation_timeout_ms),
        }
    }

    /// Build the provider from settings (degrading to no-op on failure) and wrap it
    pub async fn from_settings(settings: &CacheSettings) -> Self {
        let provider = CacheProvider::from_settings_graceful(settings).await;
        info!(
            provider = provider.provider_name(),
            namespace = %settings.namespace,
            operation_timeout_ms = settings.operation_timeout_ms,
            "Cache store initialized"
        );
        Self::new(provider, settings)
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    pub fn ttl_for(&self, category: CacheCategory) -> Duration {
        self.ttls.ttl_for(category)
    }

    /// Full backend key for a call, namespace included
    pub fn key_for(&self, category: CacheCategory, args: &KeyArgs) -> String {
        self.namespaced(&derive_key(category, args))
    }

    fn namespaced(&self, raw: &str) -> String {
        if self.namespace.is_empty() {
            raw.to_string()
        } else {
            format!("{}:{}", self.namespace, raw)
        }
    }

    async fn bounded<T, Fut>(&self, operation: &'static str, fut: Fut) -> CacheResult<T>
    where
        Fut: Future<Output = CacheResult<T>>,
    {
        tokio::time::timeout(self.operation_timeout, fut)
            .await
            .map_err(|_| CacheError::Timeout(operation.to_string()))?
    }

    fn record(operation: &'static str, result: &'static str) {
        metrics::cache::cache_operations_total().add(
            1,
            &[
                KeyValue::new("operation", operation),
                KeyValue::new("result", result),
            ],
        );
    }

    /// Look up a cached value; any failure is reported as a miss
    pub async fn get<T: DeserializeOwned>(
        &self,
        category: CacheCategory,
        args: &KeyArgs,
    ) -> Option<T> {
        let key = self.key_for(category, args);

        let raw = match self.bounded("get", self.provider.get(&key)).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache get failed, treating as miss");
                Self::record("get", "error");
                return None;
            }
        };

        let Some(raw) = raw else {
            debug!(key = %key, "Cache miss");
            Self::record("get", "miss");
            return None;
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(key = %key, "Cache hit");
                Self::record("get", "hit");
                Some(value)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cached payload did not deserialize, treating as miss");
                Self::record("get", "error");
                None
            }
        }
    }

    /// Store a value; `ttl = None` uses the category default
    pub async fn set<T: Serialize>(
        &self,
        category: CacheCategory,
        value: &T,
        ttl: Option<Duration>,
        args: &KeyArgs,
    ) -> bool {
        let key = self.key_for(category, args);
        let ttl = ttl.unwrap_or_else(|| self.ttl_for(category));

        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %key, error = %e, "Value not serializable, skipping cache set");
                Self::record("set", "error");
                return false;
            }
        };

        match self.bounded("set", self.provider.set(&key, &payload, ttl)).await {
            Ok(()) => {
                debug!(key = %key, ttl_seconds = ttl.as_secs(), "Cache set");
                Self::record("set", "ok");
                true
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache set failed");
                Self::record("set", "error");
                false
            }
        }
    }

    pub async fn delete(&self, category: CacheCategory, args: &KeyArgs) -> bool {
        let key = self.key_for(category, args);
        match self.bounded("delete", self.provider.delete(&key)).await {
            Ok(removed) => {
                Self::record("delete", "ok");
                removed
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache delete failed");
                Self::record("delete", "error");
                false
            }
        }
    }

    /// Delete every key matching a glob (e.g. `list:*`) inside this store's namespace
    pub async fn delete_by_pattern(&self, pattern: &str) -> u64 {
        let pattern = self.namespaced(pattern);
        match self
            .bounded("delete_pattern", self.provider.delete_pattern(&pattern))
            .await
        {
            Ok(deleted) => {
                info!(pattern = %pattern, deleted = deleted, "Cache entries invalidated");
                Self::record("delete_pattern", "ok");
                deleted
            }
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Cache pattern delete failed");
                Self::record("delete_pattern", "error");
                0
            }
        }
    }

    /// Drop every entry this store owns
    pub async fn clear(&self) -> bool {
        let result = if self.namespace.is_empty() {
            self.bounded("clear", self.provider.clear()).await
        } else {
            let pattern = format!("{}:*", self.namespace);
            self.bounded("clear", self.provider.delete_pattern(&pattern))
                .await
                .map(|_| ())
        };

        match result {
            Ok(()) => {
                info!(namespace = %self.namespace, "Cache cleared");
                true
            }
            Err(e) => {
                warn!(error = %e, "Cache clear failed");
                false
            }
        }
    }

    pub async fn stats(&self) -> CacheStats {
        match self.bounded("stats", self.provider.stats()).await {
            Ok(backend) => {
                let lookups = backend.keyspace_hits + backend.keyspace_misses;
                let hit_rate = if lookups > 0 {
                    backend.keyspace_hits as f64 / lookups as f64 * 100.0
                } else {
                    0.0
                };

                CacheStats {
                    provider: self.provider_name().to_string(),
                    available: true,
                    connected_clients: backend.connected_clients,
                    used_memory: backend.used_memory,
                    used_memory_human: backend.used_memory_human,
                    keyspace_hits: backend.keyspace_hits,
                    keyspace_misses: backend.keyspace_misses,
                    hit_rate,
                    entry_count: backend.entry_count,
                }
            }
            Err(e) => {
                warn!(error = %e, "Cache stats unavailable");
                CacheStats {
                    provider: self.provider_name().to_string(),
                    ..CacheStats::default()
                }
            }
        }
    }

    pub async fn health_check(&self) -> bool {
        match self.bounded("health_check", self.provider.health_check()).await {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!(error = %e, "Cache health check failed");
                false
            }
        }
    }

    /// Return the cached value, or compute, store (best effort) and return it
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        category: CacheCategory,
        args: &KeyArgs,
        ttl: Option<Duration>,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get(category, args).await {
            return Ok(hit);
        }

        let value = compute().await?;
        self.set(category, &value, ttl, args).await;
        Ok(value)
    }

    /// Pre-populate entries; returns how many were stored
    pub async fn warm<T: Serialize>(
        &self,
        category: CacheCategory,
        entries: impl IntoIterator<Item = (KeyArgs, T)>,
    ) -> usize {
        let mut stored = 0;
        for (args, value) in entries {
            if self.set(category, &value, None, &args).await {
                stored += 1;
            }
        }
        info!(category = %category, stored = stored, "Cache warm-up complete");
        stored
    }

    /// Every cached variant (language, projection) of one resource
    pub async fn invalidate_item(&self, id: impl std::fmt::Display) -> u64 {
        self.delete_by_pattern(&format!("{}:{}:*", CacheCategory::Item.prefix(), id))
            .await
    }

    pub async fn invalidate_all_lists(&self) -> u64 {
        self.delete_by_pattern(&CacheCategory::ListPage.pattern()).await
    }

    pub async fn invalidate_analytics(&self) -> u64 {
        self.delete_by_pattern(&CacheCategory::Analytics.pattern())
            .await
    }

    /// Text and geo search results
    pub async fn invalidate_searches(&self) -> u64 {
        self.delete_by_pattern(&CacheCategory::SearchResult.pattern())
            .await
            + self
                .delete_by_pattern(&CacheCategory::GeoResult.pattern())
                .await
    }
}
