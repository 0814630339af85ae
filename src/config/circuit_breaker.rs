use crate::resilience::CircuitBreakerConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use validator::Validate;

/// Thresholds for one named breaker, as written in TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct CircuitBreakerComponentConfig {
    #[validate(range(min = 1, max = 100))]
    pub failure_threshold: u32,

    #[validate(range(min = 1, max = 3600))]
    pub recovery_timeout_seconds: u64,
}

impl CircuitBreakerComponentConfig {
    pub fn to_resilience_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig::new(
            self.failure_threshold,
            Duration::from_secs(self.recovery_timeout_seconds),
        )
    }
}

impl From<CircuitBreakerConfig> for CircuitBreakerComponentConfig {
    fn from(config: CircuitBreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold,
            recovery_timeout_seconds: config.recovery_timeout.as_secs(),
        }
    }
}

/// Registry-wide breaker settings with per-component overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    /// When false, breakers run every call and never trip
    pub enabled: bool,

    /// Configuration for breakers without a specific entry
    #[validate(nested)]
    pub default_config: CircuitBreakerComponentConfig,

    /// Specific configurations keyed by breaker name; entries read from a
    /// file replace the matching preset and leave the others in place
    #[serde(deserialize_with = "merge_over_presets")]
    pub component_configs: HashMap<String, CircuitBreakerComponentConfig>,
}

fn preset_component_configs() -> HashMap<String, CircuitBreakerComponentConfig> {
    HashMap::from([
        (
            "search-engine".to_string(),
            CircuitBreakerConfig::for_search_engine().into(),
        ),
        ("cache".to_string(), CircuitBreakerConfig::for_cache().into()),
        (
            "database".to_string(),
            CircuitBreakerConfig::for_database().into(),
        ),
    ])
}

fn merge_over_presets<'de, D>(
    deserializer: D,
) -> Result<HashMap<String, CircuitBreakerComponentConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let overrides = HashMap::<String, CircuitBreakerComponentConfig>::deserialize(deserializer)?;
    let mut merged = preset_component_configs();
    merged.extend(overrides);
    Ok(merged)
}

impl CircuitBreakerSettings {
    pub fn config_for_component(&self, component_name: &str) -> CircuitBreakerConfig {
        self.component_configs
            .get(component_name)
            .unwrap_or(&self.default_config)
            .to_resilience_config()
    }

    pub fn default_breaker_config(&self) -> CircuitBreakerConfig {
        self.default_config.to_resilience_config()
    }

    /// Validate every component entry (the derive only covers the default)
    pub fn validate_components(&self) -> Result<(), String> {
        for (name, component) in &self.component_configs {
            component
                .validate()
                .map_err(|e| format!("circuit_breakers.component_configs.{name}: {e}"))?;
        }
        Ok(())
    }
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            default_config: CircuitBreakerConfig::default().into(),
            component_configs: preset_component_configs(),
        }
    }
}
