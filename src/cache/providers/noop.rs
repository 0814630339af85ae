//! No-op cache provider
//!
//! Always misses, always succeeds. Used when caching is disabled or when the
//! configured backend cannot be reached at startup.

use crate::cache::errors::CacheResult;
use crate::cache::traits::{BackendStats, CacheService};
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct NoOpCacheService;

impl NoOpCacheService {
    pub fn new() -> Self {
        Self
    }
}

impl CacheService for NoOpCacheService {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> CacheResult<bool> {
        Ok(false)
    }

    async fn delete_pattern(&self, _pattern: &str) -> CacheResult<u64> {
        Ok(0)
    }

    async fn clear(&self) -> CacheResult<()> {
        Ok(())
    }

    async fn stats(&self) -> CacheResult<BackendStats> {
        Ok(BackendStats {
            used_memory_human: "0B".to_string(),
            entry_count: Some(0),
            ..Default::default()
        })
    }

    async fn health_check(&self) -> CacheResult<bool> {
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "noop"
    }
}
