use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SearchSettings {
    /// Deadline for one primary engine call; exceeding it counts as a failure
    #[validate(range(min = 1, max = 60000))]
    pub primary_timeout_ms: u64,

    /// Registry name of the breaker shared by every primary engine call
    #[validate(length(min = 1))]
    pub breaker_name: String,

    #[validate(range(min = 1, max = 100))]
    pub default_page_size: u32,

    #[validate(range(min = 1, max = 100))]
    pub max_page_size: u32,

    #[validate(range(min = 1, max = 20))]
    pub max_autocomplete_limit: u32,

    /// Records a fallback search reads from the store before ranking
    #[validate(range(min = 1))]
    pub max_fallback_scan: usize,

    #[validate(length(equal = 2))]
    pub default_language: String,
}

impl SearchSettings {
    pub fn primary_timeout(&self) -> Duration {
        Duration::from_millis(self.primary_timeout_ms)
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            primary_timeout_ms: 2000,
            breaker_name: "search-engine".to_string(),
            default_page_size: 20,
            max_page_size: 100,
            max_autocomplete_limit: 20,
            max_fallback_scan: 1000,
            default_language: "fr".to_string(),
        }
    }
}

/// OpenTelemetry export settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TelemetrySettings {
    pub enabled: bool,

    #[validate(length(min = 1))]
    pub service_name: String,

    #[validate(length(min = 1))]
    pub otlp_endpoint: String,

    #[validate(range(min = 1, max = 3600))]
    pub export_interval_seconds: u64,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            service_name: "resilient-search".to_string(),
            otlp_endpoint: "http://localhost:4317".to_string(),
            export_interval_seconds: 60,
        }
    }
}
