//! Cache categories: key prefix and default time-to-live per kind of payload.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheCategory {
    /// A single resource
    Item,
    /// A page of a resource listing
    ListPage,
    /// Text search results
    SearchResult,
    /// Geo-proximity results
    GeoResult,
    Analytics,
    /// Generic API responses (autocomplete and the like)
    Api,
}

impl CacheCategory {
    pub const ALL: [CacheCategory; 6] = [
        CacheCategory::Item,
        CacheCategory::ListPage,
        CacheCategory::SearchResult,
        CacheCategory::GeoResult,
        CacheCategory::Analytics,
        CacheCategory::Api,
    ];

    pub fn prefix(&self) -> &'static str {
        match self {
            CacheCategory::Item => "res",
            CacheCategory::ListPage => "list",
            CacheCategory::SearchResult => "search",
            CacheCategory::GeoResult => "nearby",
            CacheCategory::Analytics => "analytics",
            CacheCategory::Api => "api",
        }
    }

    pub fn default_ttl(&self) -> Duration {
        let seconds = match self {
            CacheCategory::Item => 3600,
            CacheCategory::ListPage => 900,
            CacheCategory::SearchResult => 600,
            CacheCategory::GeoResult => 1800,
            CacheCategory::Analytics => 7200,
            CacheCategory::Api => 300,
        };
        Duration::from_secs(seconds)
    }

    /// Glob matching every key of this category (before namespacing)
    pub fn pattern(&self) -> String {
        format!("{}:*", self.prefix())
    }
}

impl fmt::Display for CacheCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}
