//! # Fallback Query Engine
//!
//! Degraded-mode search computed directly from the durable store. Always
//! available while the store is; answers the same queries as the primary
//! engine with simpler ranking:
//!
//! - text: weighted term hits (name 3, description 2, city 1.5, address 1),
//!   then newest `creation_date`, then `id`
//! - geo: haversine distance ascending, then `id`
//! - type filter: newest `creation_date`, then `id`
//! - autocomplete: no suggestions
//!
//! At most `max_scan` matching records (lowest ids first) are read and
//! ranked. `total` and the facets (`types`, `cities`) are exact counts over
//! every matching active record. Primary-only facets such as `avg_distance`
//! are absent.

use super::types::{
    Aggregation, FacetBucket, ResultSource, SearchHit, SearchQuery, SearchResult,
};
use crate::store::query::contains_ci;
use crate::store::{DurableStore, GroupField, Resource, StoreQuery, StoreResult};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};

/// Buckets kept per facet
pub const FACET_SIZE: usize = 20;

/// Records read per fallback search unless configured otherwise
pub const DEFAULT_MAX_SCAN: usize = 1000;

const NAME_WEIGHT: f64 = 3.0;
const DESCRIPTION_WEIGHT: f64 = 2.0;
const CITY_WEIGHT: f64 = 1.5;
const ADDRESS_WEIGHT: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct FallbackQueryEngine {
    store: Arc<dyn DurableStore>,
    facet_size: usize,
    max_scan: usize,
}

impl FallbackQueryEngine {
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self {
            store,
            facet_size: FACET_SIZE,
            max_scan: DEFAULT_MAX_SCAN,
        }
    }

    pub fn with_max_scan(mut self, max_scan: usize) -> Self {
        self.max_scan = max_scan.max(1);
        self
    }

    pub fn max_scan(&self) -> usize {
        self.max_scan
    }

    pub fn with_facet_size(mut self, facet_size: usize) -> Self {
        self.facet_size = facet_size;
        self
    }

    pub fn store(&self) -> &Arc<dyn DurableStore> {
        &self.store
    }

    pub async fn ping(&self) -> StoreResult<()> {
        self.store.ping().await
    }

    #[instrument(skip(self, query), fields(kind = %query.kind(), store = self.store.name(), max_scan = self.max_scan))]
    pub async fn search(&self, query: &SearchQuery) -> StoreResult<SearchResult> {
        let started = Instant::now();
        let page = query.page();

        let Some(filter) = query.store_query() else {
            debug!("Autocomplete has no fallback; returning no suggestions");
            return Ok(SearchResult::empty(page, ResultSource::Fallback));
        };

        let records = self.store.find(&filter.clone().paginate(0, self.max_scan)).await?;
        if records.len() == self.max_scan {
            debug!(max_scan = self.max_scan, "Fallback scan capped");
        }
        let total = self.store.count(&filter).await?;
        let language = query.language();

        let ranked: Vec<SearchHit> = match query {
            SearchQuery::Text { .. } => rank_text(records, &filter.terms(), language),
            SearchQuery::Geo { center, .. } => rank_geo(records, center, language),
            _ => rank_recent(records, language),
        };

        let max_score = ranked
            .iter()
            .filter_map(|hit| hit.score)
            .max_by(f64::total_cmp);

        let hits: Vec<SearchHit> = ranked
            .into_iter()
            .skip(page.offset())
            .take(page.page_size as usize)
            .collect();

        let aggregations = self.facets(&filter).await?;

        debug!(total, returned = hits.len(), "Fallback search complete");

        Ok(SearchResult {
            hits,
            total,
            took_ms: started.elapsed().as_millis() as u64,
            aggregations,
            suggestions: Vec::new(),
            page: page.page,
            page_size: page.page_size,
            max_score,
            source: ResultSource::Fallback,
            fallback: true,
        })
    }

    async fn facets(&self, filter: &StoreQuery) -> StoreResult<BTreeMap<String, Aggregation>> {
        let mut aggregations = BTreeMap::new();
        for (name, field) in [("types", GroupField::ResourceType), ("cities", GroupField::City)] {
            let buckets = self
                .store
                .count_by(filter, field)
                .await?
                .into_iter()
                .take(self.facet_size)
                .map(|(key, count)| FacetBucket { key, count })
                .collect();
            aggregations.insert(name.to_string(), Aggregation::Buckets(buckets));
        }
        Ok(aggregations)
    }
}

/// Weighted count of `terms` across the record's text fields
pub fn text_score(resource: &Resource, terms: &[String]) -> f64 {
    terms
        .iter()
        .map(|term| {
            let mut score = 0.0;
            if any_contains(resource.name.values().map(String::as_str), term) {
                score += NAME_WEIGHT;
            }
            if any_contains(resource.description.values().map(String::as_str), term) {
                score += DESCRIPTION_WEIGHT;
            }
            if any_contains(resource.city.as_deref(), term) {
                score += CITY_WEIGHT;
            }
            if any_contains(resource.address.as_deref(), term) {
                score += ADDRESS_WEIGHT;
            }
            score
        })
        .sum()
}

fn any_contains<'a>(values: impl IntoIterator<Item = &'a str>, term: &str) -> bool {
    values.into_iter().any(|v| contains_ci(v, term))
}

/// Newer first; records without a date sort last
fn by_creation_date_desc(a: &Resource, b: &Resource) -> Ordering {
    match (a.creation_date, b.creation_date) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn rank_text(records: Vec<Resource>, terms: &[String], language: &str) -> Vec<SearchHit> {
    let mut scored: Vec<(f64, Resource)> = records
        .into_iter()
        .map(|r| (text_score(&r, terms), r))
        .collect();

    scored.sort_by(|(sa, a), (sb, b)| {
        sb.total_cmp(sa)
            .then_with(|| by_creation_date_desc(a, b))
            .then_with(|| a.id.cmp(&b.id))
    });

    scored
        .into_iter()
        .map(|(score, r)| SearchHit::from_resource(&r, language).with_score(score))
        .collect()
}

fn rank_geo(
    records: Vec<Resource>,
    center: &crate::store::GeoPoint,
    language: &str,
) -> Vec<SearchHit> {
    let mut located: Vec<(f64, Resource)> = records
        .into_iter()
        .filter_map(|r| r.location.map(|p| (center.distance_km(&p), r)))
        .collect();

    located.sort_by(|(da, a), (db, b)| da.total_cmp(db).then_with(|| a.id.cmp(&b.id)));

    located
        .into_iter()
        .map(|(distance, r)| {
            SearchHit::from_resource(&r, language).with_distance((distance * 100.0).round() / 100.0)
        })
        .collect()
}

fn rank_recent(mut records: Vec<Resource>, language: &str) -> Vec<SearchHit> {
    records.sort_by(|a, b| by_creation_date_desc(a, b).then_with(|| a.id.cmp(&b.id)));
    records
        .iter()
        .map(|r| SearchHit::from_resource(r, language))
        .collect()
}
