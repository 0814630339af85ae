//! # Resilience Configuration
//!
//! Settings for breakers, cache, search and telemetry. Every section has
//! defaults so a partial (or empty) file is valid; see [`ConfigLoader`] for
//! the lookup order.

pub mod cache;
pub mod circuit_breaker;
pub mod error;
pub mod loader;
pub mod search;

pub use cache::{CacheSettings, CacheTtlSettings, RedisSettings};
pub use circuit_breaker::{CircuitBreakerComponentConfig, CircuitBreakerSettings};
pub use error::{ConfigResult, ConfigurationError};
pub use loader::{ConfigLoader, DEFAULT_CONFIG_PATH};
pub use search::{SearchSettings, TelemetrySettings};

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ResilienceConfig {
    #[validate(nested)]
    pub circuit_breakers: CircuitBreakerSettings,

    #[validate(nested)]
    pub cache: CacheSettings,

    #[validate(nested)]
    pub search: SearchSettings,

    #[validate(nested)]
    pub telemetry: TelemetrySettings,
}

impl ResilienceConfig {
    /// Field-level validation plus the cross-section rules the derive cannot express
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.validate()?;

        self.circuit_breakers
            .validate_components()
            .map_err(ConfigurationError::validation_error)?;

        if self.search.default_page_size > self.search.max_page_size {
            return Err(ConfigurationError::invalid_value(
                "search.default_page_size",
                self.search.default_page_size.to_string(),
                format!(
                    "must not exceed search.max_page_size ({})",
                    self.search.max_page_size
                ),
            ));
        }

        if self.cache.enabled && self.cache.backend == "redis" && self.cache.redis.is_none() {
            return Err(ConfigurationError::invalid_value(
                "cache.redis",
                "<missing>",
                "backend 'redis' requires a [cache.redis] section",
            ));
        }

        Ok(())
    }
}
