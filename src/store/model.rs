use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Language used when a localised field has no value in the requested one
pub const DEFAULT_LANGUAGE: &str = "fr";

const EARTH_RADIUS_KM: f64 = 6371.0;
const BOUNDS_PADDING_RAD: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }

    /// Great-circle (haversine) distance in kilometres
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
    }

    /// Latitude band and longitude ranges covering every point within `radius_km`.
    ///
    /// Longitude wraps at the antimeridian (two ranges) and is unrestricted
    /// when the circle reaches a pole.
    pub fn bounds(&self, radius_km: f64) -> GeoBounds {
        // angular radius, padded so float error never shrinks the box
        let angular = radius_km / EARTH_RADIUS_KM + BOUNDS_PADDING_RAD;
        let lat = self.lat.to_radians();
        let min_lat = (lat - angular).to_degrees();
        let max_lat = (lat + angular).to_degrees();

        if min_lat <= -90.0 || max_lat >= 90.0 || angular >= std::f64::consts::FRAC_PI_2 {
            return GeoBounds {
                min_lat: min_lat.max(-90.0),
                max_lat: max_lat.min(90.0),
                lng_ranges: Vec::new(),
            };
        }

        let ratio = angular.sin() / lat.cos();
        if ratio >= 1.0 {
            return GeoBounds {
                min_lat,
                max_lat,
                lng_ranges: Vec::new(),
            };
        }

        let d_lng = ratio.asin().to_degrees();
        let west = self.lng - d_lng;
        let east = self.lng + d_lng;
        let lng_ranges = if west < -180.0 {
            vec![(west + 360.0, 180.0), (-180.0, east)]
        } else if east > 180.0 {
            vec![(west, 180.0), (-180.0, east - 360.0)]
        } else {
            vec![(west, east)]
        };

        GeoBounds {
            min_lat,
            max_lat,
            lng_ranges,
        }
    }
}

/// Coarse prefilter for a radius search; a superset of the circle
#[derive(Debug, Clone, PartialEq)]
pub struct GeoBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    /// Inclusive `(west, east)` ranges; empty means any longitude
    pub lng_ranges: Vec<(f64, f64)>,
}

impl GeoBounds {
    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.lng_ranges.is_empty()
                || self
                    .lng_ranges
                    .iter()
                    .any(|(west, east)| (*west..=*east).contains(&point.lng)))
    }
}

/// A touristic resource as held by the durable store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: i64,
    /// External identifier from the source dataset
    pub resource_id: String,
    /// Language code -> value
    pub name: BTreeMap<String, String>,
    pub description: BTreeMap<String, String>,
    pub resource_types: Vec<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub location: Option<GeoPoint>,
    pub creation_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Resource {
    pub fn name_in(&self, language: &str) -> Option<&str> {
        localized(&self.name, language)
    }

    pub fn description_in(&self, language: &str) -> Option<&str> {
        localized(&self.description, language)
    }
}

/// Requested language, then [`DEFAULT_LANGUAGE`], then any non-empty value
pub fn localized<'a>(values: &'a BTreeMap<String, String>, language: &str) -> Option<&'a str> {
    let non_empty = |lang: &str| values.get(lang).map(String::as_str).filter(|v| !v.is_empty());

    non_empty(language)
        .or_else(|| non_empty(DEFAULT_LANGUAGE))
        .or_else(|| values.values().map(String::as_str).find(|v| !v.is_empty()))
}
