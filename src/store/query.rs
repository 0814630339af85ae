use super::{GeoPoint, Resource};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoRadius {
    pub center: GeoPoint,
    pub radius_km: f64,
}

impl GeoRadius {
    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.center.distance_km(point) <= self.radius_km
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupField {
    ResourceType,
    City,
}

/// Conjunction of simple predicates over [`Resource`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreQuery {
    /// Whitespace-separated terms; a record matches when any term is a
    /// case-insensitive substring of a name, description, city or address
    pub text: Option<String>,
    /// Type membership: at least one shared type
    pub resource_types: Vec<String>,
    /// Exact city names
    pub cities: Vec<String>,
    pub within: Option<GeoRadius>,
    pub created_from: Option<NaiveDate>,
    pub created_to: Option<NaiveDate>,
    pub active_only: bool,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl Default for StoreQuery {
    fn default() -> Self {
        Self {
            text: None,
            resource_types: Vec::new(),
            cities: Vec::new(),
            within: None,
            created_from: None,
            created_to: None,
            active_only: true,
            offset: 0,
            limit: None,
        }
    }
}

impl StoreQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resource_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cities<I, S>(mut self, cities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cities = cities.into_iter().map(Into::into).collect();
        self
    }

    pub fn within(mut self, center: GeoPoint, radius_km: f64) -> Self {
        self.within = Some(GeoRadius { center, radius_km });
        self
    }

    pub fn created_between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.created_from = from;
        self.created_to = to;
        self
    }

    pub fn include_inactive(mut self) -> Self {
        self.active_only = false;
        self
    }

    pub fn paginate(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }

    /// Same predicate without `offset`/`limit`
    pub fn unpaginated(&self) -> Self {
        Self {
            offset: 0,
            limit: None,
            ..self.clone()
        }
    }

    /// Lowercased, non-empty search terms
    pub fn terms(&self) -> Vec<String> {
        self.text
            .as_deref()
            .map(|text| text.split_whitespace().map(str::to_lowercase).collect())
            .unwrap_or_default()
    }

    pub fn matches(&self, resource: &Resource) -> bool {
        if self.active_only && !resource.is_active {
            return false;
        }

        if !self.resource_types.is_empty()
            && !resource
                .resource_types
                .iter()
                .any(|t| self.resource_types.contains(t))
        {
            return false;
        }

        if !self.cities.is_empty()
            && !resource
                .city
                .as_ref()
                .is_some_and(|city| self.cities.contains(city))
        {
            return false;
        }

        if let Some(radius) = &self.within {
            match &resource.location {
                Some(point) if radius.contains(point) => {}
                _ => return false,
            }
        }

        if let Some(from) = self.created_from {
            if !resource.creation_date.is_some_and(|d| d >= from) {
                return false;
            }
        }

        if let Some(to) = self.created_to {
            if !resource.creation_date.is_some_and(|d| d <= to) {
                return false;
            }
        }

        let terms = self.terms();
        terms.is_empty() || terms.iter().any(|term| text_fields(resource).any(|f| contains_ci(f, term)))
    }
}

/// Every text field a term is matched against
pub(crate) fn text_fields(resource: &Resource) -> impl Iterator<Item = &str> {
    resource
        .name
        .values()
        .chain(resource.description.values())
        .map(String::as_str)
        .chain(resource.city.as_deref())
        .chain(resource.address.as_deref())
}

/// `needle` must already be lowercase
pub(crate) fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}
