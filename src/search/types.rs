//! Query and result types shared by both engines

use crate::config::SearchSettings;
use crate::error::SearchError;
use crate::store::{GeoPoint, Resource, StoreQuery};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Largest accepted geo radius
pub const MAX_RADIUS_KM: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    Text,
    Geo,
    TypeFilter,
    Autocomplete,
}

impl SearchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Geo => "geo",
            Self::TypeFilter => "type_filter",
            Self::Autocomplete => "autocomplete",
        }
    }
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 1-based page number and page size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
        }
    }
}

impl Page {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.page_size as usize
    }

    pub fn clamped(self, max_page_size: u32) -> Self {
        Self {
            page: self.page.max(1),
            page_size: self.page_size.clamp(1, max_page_size.max(1)),
        }
    }
}

/// Optional filters applied on top of text and geo searches
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,
}

impl SearchFilters {
    fn apply_to(&self, query: StoreQuery) -> StoreQuery {
        let mut query = query.created_between(self.date_from, self.date_to);
        if !self.resource_types.is_empty() {
            query = query.with_types(self.resource_types.iter().cloned());
        }
        if !self.cities.is_empty() {
            query = query.with_cities(self.cities.iter().cloned());
        }
        query
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchQuery {
    Text {
        query: String,
        language: String,
        #[serde(default)]
        filters: SearchFilters,
        #[serde(default)]
        page: Page,
    },
    Geo {
        center: GeoPoint,
        radius_km: f64,
        language: String,
        #[serde(default)]
        filters: SearchFilters,
        #[serde(default)]
        page: Page,
    },
    TypeFilter {
        resource_types: Vec<String>,
        language: String,
        #[serde(default)]
        page: Page,
    },
    Autocomplete {
        prefix: String,
        language: String,
        limit: u32,
    },
}

impl SearchQuery {
    pub fn text(query: impl Into<String>) -> Self {
        Self::Text {
            query: query.into(),
            language: "fr".to_string(),
            filters: SearchFilters::default(),
            page: Page::default(),
        }
    }

    pub fn geo(center: GeoPoint, radius_km: f64) -> Self {
        Self::Geo {
            center,
            radius_km,
            language: "fr".to_string(),
            filters: SearchFilters::default(),
            page: Page::default(),
        }
    }

    pub fn by_types<I, S>(resource_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::TypeFilter {
            resource_types: resource_types.into_iter().map(Into::into).collect(),
            language: "fr".to_string(),
            page: Page::default(),
        }
    }

    pub fn autocomplete(prefix: impl Into<String>, limit: u32) -> Self {
        Self::Autocomplete {
            prefix: prefix.into(),
            language: "fr".to_string(),
            limit,
        }
    }

    pub fn with_language(mut self, lang: impl Into<String>) -> Self {
        match &mut self {
            Self::Text { language, .. }
            | Self::Geo { language, .. }
            | Self::TypeFilter { language, .. }
            | Self::Autocomplete { language, .. } => *language = lang.into(),
        }
        self
    }

    /// Replace the page; no effect on autocomplete
    pub fn with_page(mut self, new_page: Page) -> Self {
        match &mut self {
            Self::Text { page, .. } | Self::Geo { page, .. } | Self::TypeFilter { page, .. } => {
                *page = new_page
            }
            Self::Autocomplete { .. } => {}
        }
        self
    }

    /// Replace the filters; no effect on type-filter and autocomplete queries
    pub fn with_filters(mut self, new_filters: SearchFilters) -> Self {
        match &mut self {
            Self::Text { filters, .. } | Self::Geo { filters, .. } => *filters = new_filters,
            Self::TypeFilter { .. } | Self::Autocomplete { .. } => {}
        }
        self
    }

    pub fn kind(&self) -> SearchKind {
        match self {
            Self::Text { .. } => SearchKind::Text,
            Self::Geo { .. } => SearchKind::Geo,
            Self::TypeFilter { .. } => SearchKind::TypeFilter,
            Self::Autocomplete { .. } => SearchKind::Autocomplete,
        }
    }

    pub fn language(&self) -> &str {
        match self {
            Self::Text { language, .. }
            | Self::Geo { language, .. }
            | Self::TypeFilter { language, .. }
            | Self::Autocomplete { language, .. } => language,
        }
    }

    /// Page in effect; autocomplete is a single page of `limit`
    pub fn page(&self) -> Page {
        match self {
            Self::Text { page, .. } | Self::Geo { page, .. } | Self::TypeFilter { page, .. } => {
                *page
            }
            Self::Autocomplete { limit, .. } => Page::new(1, *limit),
        }
    }

    /// Reject queries no engine should be asked to run
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.language().len() != 2 || !self.language().chars().all(|c| c.is_ascii_lowercase()) {
            return Err(SearchError::invalid_query(format!(
                "language must be a two-letter code, got '{}'",
                self.language()
            )));
        }

        match self {
            Self::Text { query, filters, .. } => {
                if query.trim().is_empty() {
                    return Err(SearchError::invalid_query("search text must not be blank"));
                }
                validate_filters(filters)
            }
            Self::Geo {
                center,
                radius_km,
                filters,
                ..
            } => {
                if !center.is_valid() {
                    return Err(SearchError::invalid_query(format!(
                        "coordinates out of range: ({}, {})",
                        center.lat, center.lng
                    )));
                }
                if !radius_km.is_finite() || *radius_km <= 0.0 || *radius_km > MAX_RADIUS_KM {
                    return Err(SearchError::invalid_query(format!(
                        "radius must be in (0, {MAX_RADIUS_KM}] km, got {radius_km}"
                    )));
                }
                validate_filters(filters)
            }
            Self::TypeFilter { resource_types, .. } => {
                if resource_types.iter().all(|t| t.trim().is_empty()) {
                    return Err(SearchError::invalid_query(
                        "at least one resource type is required",
                    ));
                }
                Ok(())
            }
            Self::Autocomplete { prefix, limit, .. } => {
                if prefix.trim().is_empty() {
                    return Err(SearchError::invalid_query("prefix must not be blank"));
                }
                if *limit == 0 {
                    return Err(SearchError::invalid_query("limit must be at least 1"));
                }
                Ok(())
            }
        }
    }

    /// Clamp paging to the configured bounds
    pub fn normalized(mut self, settings: &SearchSettings) -> Self {
        match &mut self {
            Self::Text { page, .. } | Self::Geo { page, .. } | Self::TypeFilter { page, .. } => {
                *page = page.clamped(settings.max_page_size)
            }
            Self::Autocomplete { limit, .. } => {
                *limit = (*limit).clamp(1, settings.max_autocomplete_limit)
            }
        }
        self
    }

    /// Store predicate selecting every record this query can return,
    /// unpaginated; `None` for autocomplete
    pub fn store_query(&self) -> Option<StoreQuery> {
        match self {
            Self::Text { query, filters, .. } => {
                Some(filters.apply_to(StoreQuery::new().text(query.clone())))
            }
            Self::Geo {
                center,
                radius_km,
                filters,
                ..
            } => Some(filters.apply_to(StoreQuery::new().within(*center, *radius_km))),
            Self::TypeFilter { resource_types, .. } => {
                Some(StoreQuery::new().with_types(resource_types.iter().cloned()))
            }
            Self::Autocomplete { .. } => None,
        }
    }
}

fn validate_filters(filters: &SearchFilters) -> Result<(), SearchError> {
    if let (Some(from), Some(to)) = (filters.date_from, filters.date_to) {
        if from > to {
            return Err(SearchError::invalid_query(format!(
                "date_from {from} is after date_to {to}"
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    Primary,
    Fallback,
}

impl ResultSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: i64,
    pub resource_id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub location: Option<GeoPoint>,
    pub resource_types: Vec<String>,
    pub creation_date: Option<NaiveDate>,
    pub is_active: bool,
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl SearchHit {
    /// Project a stored record, resolving localised fields for `language`
    pub fn from_resource(resource: &Resource, language: &str) -> Self {
        Self {
            id: resource.id,
            resource_id: resource.resource_id.clone(),
            name: resource.name_in(language).map(str::to_string),
            description: resource.description_in(language).map(str::to_string),
            city: resource.city.clone(),
            address: resource.address.clone(),
            location: resource.location,
            resource_types: resource.resource_types.clone(),
            creation_date: resource.creation_date,
            is_active: resource.is_active,
            score: None,
            distance_km: None,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_distance(mut self, distance_km: f64) -> Self {
        self.distance_km = Some(distance_km);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetBucket {
    pub key: String,
    pub count: u64,
}

/// A facet: term buckets, or a single metric such as `avg_distance`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Aggregation {
    Buckets(Vec<FacetBucket>),
    Value(f64),
}

impl Aggregation {
    pub fn buckets(&self) -> Option<&[FacetBucket]> {
        match self {
            Self::Buckets(buckets) => Some(buckets),
            Self::Value(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub resource_id: String,
    pub name: String,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub hits: Vec<SearchHit>,
    pub total: u64,
    pub took_ms: u64,
    #[serde(default)]
    pub aggregations: BTreeMap<String, Aggregation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<Suggestion>,
    pub page: u32,
    pub page_size: u32,
    pub max_score: Option<f64>,
    pub source: ResultSource,
    /// Always `source == Fallback`
    pub fallback: bool,
}

impl SearchResult {
    pub fn empty(page: Page, source: ResultSource) -> Self {
        Self {
            hits: Vec::new(),
            total: 0,
            took_ms: 0,
            aggregations: BTreeMap::new(),
            suggestions: Vec::new(),
            page: page.page,
            page_size: page.page_size,
            max_score: None,
            source,
            fallback: source == ResultSource::Fallback,
        }
    }

    /// Set provenance, keeping `fallback` consistent with `source`
    pub fn tagged(mut self, source: ResultSource) -> Self {
        self.source = source;
        self.fallback = source == ResultSource::Fallback;
        self
    }

    pub fn is_fallback(&self) -> bool {
        self.source == ResultSource::Fallback
    }

    pub fn facet(&self, name: &str) -> Option<&[FacetBucket]> {
        self.aggregations.get(name).and_then(Aggregation::buckets)
    }
}
