//! Cache provider with enum dispatch over the compiled-in backends.
//!
//! Construction never fails: an unreachable or unknown backend degrades to
//! the no-op provider with a warning, so the service always starts.

use super::errors::CacheResult;
use super::providers::NoOpCacheService;
use super::traits::{BackendStats, CacheService};
use crate::config::CacheSettings;
use std::time::Duration;
use tracing::{info, warn};

#[cfg(feature = "cache-redis")]
use super::providers::RedisCacheService;

#[cfg(feature = "cache-moka")]
use super::providers::MokaCacheService;

#[derive(Debug, Clone)]
enum CacheBackend {
    #[cfg(feature = "cache-redis")]
    Redis(Box<RedisCacheService>),

    #[cfg(feature = "cache-moka")]
    Moka(Box<MokaCacheService>),

    NoOp(NoOpCacheService),
}

/// Dispatch a call to whichever backend is active
macro_rules! dispatch {
    ($backend:expr, $svc:ident => $call:expr) => {
        match $backend {
            #[cfg(feature = "cache-redis")]
            CacheBackend::Redis($svc) => $call,
            #[cfg(feature = "cache-moka")]
            CacheBackend::Moka($svc) => $call,
            CacheBackend::NoOp($svc) => $call,
        }
    };
}

#[derive(Debug, Clone)]
pub struct CacheProvider {
    backend: CacheBackend,
}

impl CacheProvider {
    /// Create a cache provider from configuration with graceful degradation
    pub async fn from_settings_graceful(settings: &CacheSettings) -> Self {
        let backend = Self::create_backend(settings).await;
        Self { backend }
    }

    async fn create_backend(settings: &CacheSettings) -> CacheBackend {
        if !settings.enabled {
            info!("Response cache disabled by configuration");
            return CacheBackend::NoOp(NoOpCacheService::new());
        }

        match settings.backend.as_str() {
            "redis" => Self::create_redis_backend(settings).await,
            "moka" | "memory" | "in-memory" => Self::create_moka_backend(settings),
            "noop" => CacheBackend::NoOp(NoOpCacheService::new()),
            other => {
                warn!(backend = other, "Unknown cache backend, falling back to NoOp");
                CacheBackend::NoOp(NoOpCacheService::new())
            }
        }
    }

    #[cfg(feature = "cache-redis")]
    async fn create_redis_backend(settings: &CacheSettings) -> CacheBackend {
        let Some(redis_settings) = &settings.redis else {
            warn!("Redis cache enabled but no [cache.redis] settings found, falling back to NoOp");
            return CacheBackend::NoOp(NoOpCacheService::new());
        };

        match RedisCacheService::from_settings(redis_settings).await {
            Ok(service) => {
                info!(backend = "redis", "Cache provider initialized successfully");
                CacheBackend::Redis(Box::new(service))
            }
            Err(e) => {
                warn!(
                    error = %e,
                    "Failed to connect to Redis, falling back to NoOp cache (graceful degradation)"
                );
                CacheBackend::NoOp(NoOpCacheService::new())
            }
        }
    }

    #[cfg(not(feature = "cache-redis"))]
    async fn create_redis_backend(_settings: &CacheSettings) -> CacheBackend {
        warn!("Redis cache backend requested but 'cache-redis' feature not enabled, using NoOp");
        CacheBackend::NoOp(NoOpCacheService::new())
    }

    #[cfg(feature = "cache-moka")]
    fn create_moka_backend(settings: &CacheSettings) -> CacheBackend {
        let service = MokaCacheService::new(settings.max_capacity);
        info!(
            backend = "moka",
            max_capacity = settings.max_capacity,
            "In-memory cache provider initialized successfully"
        );
        CacheBackend::Moka(Box::new(service))
    }

    #[cfg(not(feature = "cache-moka"))]
    fn create_moka_backend(_settings: &CacheSettings) -> CacheBackend {
        warn!("Moka cache backend requested but 'cache-moka' feature not enabled, using NoOp");
        CacheBackend::NoOp(NoOpCacheService::new())
    }

    pub fn noop() -> Self {
        Self {
            backend: CacheBackend::NoOp(NoOpCacheService::new()),
        }
    }

    #[cfg(feature = "cache-moka")]
    pub fn moka(max_capacity: u64) -> Self {
        Self {
            backend: CacheBackend::Moka(Box::new(MokaCacheService::new(max_capacity))),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self.backend, CacheBackend::NoOp(_))
    }

    pub fn provider_name(&self) -> &'static str {
        dispatch!(&self.backend, s => s.provider_name())
    }

    pub async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        dispatch!(&self.backend, s => s.get(key).await)
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        dispatch!(&self.backend, s => s.set(key, value, ttl).await)
    }

    pub async fn delete(&self, key: &str) -> CacheResult<bool> {
        dispatch!(&self.backend, s => s.delete(key).await)
    }

    pub async fn delete_pattern(&self, pattern: &str) -> CacheResult<u64> {
        dispatch!(&self.backend, s => s.delete_pattern(pattern).await)
    }

    pub async fn clear(&self) -> CacheResult<()> {
        dispatch!(&self.backend, s => s.clear().await)
    }

    pub async fn stats(&self) -> CacheResult<BackendStats> {
        dispatch!(&self.backend, s => s.stats().await)
    }

    pub async fn health_check(&self) -> CacheResult<bool> {
        dispatch!(&self.backend, s => s.health_check().await)
    }
}
