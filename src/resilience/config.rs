//! # Circuit Breaker Configuration
//!
//! Per-breaker thresholds plus the service presets used by the search stack.
//! Registry-wide settings (per-component overrides loaded from TOML) live in
//! [`crate::config::CircuitBreakerSettings`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a single circuit breaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive expected failures that trip the breaker
    pub failure_threshold: u32,

    /// Time the breaker stays open before a recovery trial is admitted
    pub recovery_timeout: Duration,
}

impl CircuitBreakerConfig {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            recovery_timeout,
        }
    }

    /// Preset for the primary search index service
    pub fn for_search_engine() -> Self {
        Self::new(5, Duration::from_secs(60))
    }

    /// Preset for the cache service
    pub fn for_cache() -> Self {
        Self::new(3, Duration::from_secs(30))
    }

    /// Preset for the durable store
    pub fn for_database() -> Self {
        Self::new(10, Duration::from_secs(30))
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.failure_threshold == 0 {
            return Err("failure_threshold must be greater than 0".to_string());
        }

        if self.failure_threshold > 100 {
            return Err("failure_threshold should not exceed 100".to_string());
        }

        if self.recovery_timeout.is_zero() {
            return Err("recovery_timeout must be greater than 0".to_string());
        }

        if self.recovery_timeout > Duration::from_secs(3600) {
            return Err("recovery_timeout should not exceed 3600 seconds".to_string());
        }

        Ok(())
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(30))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_breaker_config_validation() {
        assert!(CircuitBreakerConfig::default().validate().is_ok());

        let mut invalid = CircuitBreakerConfig {
            failure_threshold: 0,
            ..Default::default()
        };
        assert!(invalid.validate().is_err());

        invalid = CircuitBreakerConfig {
            recovery_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(invalid.validate().is_err());

        invalid = CircuitBreakerConfig {
            recovery_timeout: Duration::from_secs(7200),
            ..Default::default()
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_preset_configurations() {
        let search = CircuitBreakerConfig::for_search_engine();
        assert_eq!(search.failure_threshold, 5);
        assert_eq!(search.recovery_timeout, Duration::from_secs(60));
        assert!(search.validate().is_ok());

        let cache = CircuitBreakerConfig::for_cache();
        assert_eq!(cache.failure_threshold, 3);
        assert!(cache.validate().is_ok());

        let db = CircuitBreakerConfig::for_database();
        assert_eq!(db.failure_threshold, 10);
        assert!(db.validate().is_ok());
    }
}
