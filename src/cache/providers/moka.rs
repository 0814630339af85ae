//! In-memory cache provider using Moka
//!
//! In-process caching with per-entry TTL for single-instance deployments and
//! tests. Each process keeps its own cache state, so invalidations do not
//! propagate between instances.

use crate::cache::errors::{CacheError, CacheResult};
use crate::cache::traits::{human_bytes, BackendStats, CacheService};
use moka::Expiry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
struct CachedValue {
    payload: String,
    ttl: Duration,
}

/// Each entry expires after the TTL it was written with
struct PerEntryTtl;

impl Expiry<String, CachedValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

#[derive(Debug, Default)]
struct HitCounters {
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Clone)]
pub struct MokaCacheService {
    cache: moka::future::Cache<String, CachedValue>,
    counters: Arc<HitCounters>,
}

impl std::fmt::Debug for MokaCacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaCacheService")
            .field("max_capacity", &self.cache.policy().max_capacity())
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}

impl MokaCacheService {
    pub fn new(max_capacity: u64) -> Self {
        let cache = moka::future::Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        debug!(max_capacity, "Moka in-memory cache service created");

        Self {
            cache,
            counters: Arc::new(HitCounters::default()),
        }
    }

    /// Flush moka's pending maintenance (expirations, evictions)
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

impl CacheService for MokaCacheService {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let result = self.cache.get(key).await.map(|v| v.payload);

        if result.is_some() {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = key, "Cache HIT (moka)");
        } else {
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            debug!(key = key, "Cache MISS (moka)");
        }

        Ok(result)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.cache
            .insert(
                key.to_string(),
                CachedValue {
                    payload: value.to_string(),
                    ttl,
                },
            )
            .await;

        debug!(key = key, ttl_seconds = ttl.as_secs(), "Cache SET (moka)");
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let removed = self.cache.remove(key).await.is_some();
        debug!(key = key, removed, "Cache DEL (moka)");
        Ok(removed)
    }

    async fn delete_pattern(&self, pattern: &str) -> CacheResult<u64> {
        let matcher = glob::Pattern::new(pattern).map_err(|e| CacheError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        let matching: Vec<Arc<String>> = self
            .cache
            .iter()
            .filter(|(key, _)| matcher.matches(key))
            .map(|(key, _)| key)
            .collect();

        let mut deleted = 0;
        for key in matching {
            if self.cache.remove(key.as_str()).await.is_some() {
                deleted += 1;
            }
        }

        debug!(pattern = pattern, deleted = deleted, "Cache pattern DEL (moka)");
        Ok(deleted)
    }

    async fn clear(&self) -> CacheResult<()> {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        debug!("Cache cleared (moka)");
        Ok(())
    }

    async fn stats(&self) -> CacheResult<BackendStats> {
        let used_memory: u64 = self
            .cache
            .iter()
            .map(|(key, value)| (key.len() + value.payload.len()) as u64)
            .sum();

        Ok(BackendStats {
            connected_clients: 1,
            used_memory,
            used_memory_human: human_bytes(used_memory),
            keyspace_hits: self.counters.hits.load(Ordering::Relaxed),
            keyspace_misses: self.counters.misses.load(Ordering::Relaxed),
            entry_count: Some(self.cache.entry_count()),
        })
    }

    async fn health_check(&self) -> CacheResult<bool> {
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "moka"
    }
}
