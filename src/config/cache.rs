use crate::cache::CacheCategory;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,

    /// `moka` (alias `memory`), `redis` or `noop`
    #[validate(length(min = 1))]
    pub backend: String,

    /// Prefix for every key this service writes
    pub namespace: String,

    /// Upper bound on any single backend call
    #[validate(range(min = 1, max = 60000))]
    pub operation_timeout_ms: u64,

    /// In-process backend capacity (entries)
    #[validate(range(min = 1))]
    pub max_capacity: u64,

    #[validate(nested)]
    pub redis: Option<RedisSettings>,

    #[validate(nested)]
    pub ttl: CacheTtlSettings,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: "moka".to_string(),
            namespace: "tourism".to_string(),
            operation_timeout_ms: 250,
            max_capacity: 10_000,
            redis: None,
            ttl: CacheTtlSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct RedisSettings {
    #[validate(length(min = 1))]
    pub url: String,

    #[validate(range(min = 1, max = 60000))]
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,
}

fn default_connection_timeout_ms() -> u64 {
    2000
}

/// Time-to-live per cache category, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CacheTtlSettings {
    #[validate(range(min = 1))]
    pub item_seconds: u64,
    #[validate(range(min = 1))]
    pub list_page_seconds: u64,
    #[validate(range(min = 1))]
    pub search_result_seconds: u64,
    #[validate(range(min = 1))]
    pub geo_result_seconds: u64,
    #[validate(range(min = 1))]
    pub analytics_seconds: u64,
    #[validate(range(min = 1))]
    pub api_seconds: u64,
}

impl CacheTtlSettings {
    pub fn ttl_for(&self, category: CacheCategory) -> Duration {
        let seconds = match category {
            CacheCategory::Item => self.item_seconds,
            CacheCategory::ListPage => self.list_page_seconds,
            CacheCategory::SearchResult => self.search_result_seconds,
            CacheCategory::GeoResult => self.geo_result_seconds,
            CacheCategory::Analytics => self.analytics_seconds,
            CacheCategory::Api => self.api_seconds,
        };
        Duration::from_secs(seconds)
    }
}

impl Default for CacheTtlSettings {
    fn default() -> Self {
        Self {
            item_seconds: CacheCategory::Item.default_ttl().as_secs(),
            list_page_seconds: CacheCategory::ListPage.default_ttl().as_secs(),
            search_result_seconds: CacheCategory::SearchResult.default_ttl().as_secs(),
            geo_result_seconds: CacheCategory::GeoResult.default_ttl().as_secs(),
            analytics_seconds: CacheCategory::Analytics.default_ttl().as_secs(),
            api_seconds: CacheCategory::Api.default_ttl().as_secs(),
        }
    }
}
