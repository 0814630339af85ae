use proptest::prelude::*;
use proptest::sample::subsequence;
use resilient_search::store::{GeoPoint, Resource};

use super::builders::{resource, ResourceExt};

pub const CITIES: [&str; 4] = ["Lyon", "Annecy", "Paris", "Chamonix"];
pub const TYPES: [&str; 5] = [
    "PlaceOfInterest",
    "Museum",
    "Restaurant",
    "Accommodation",
    "NaturalHeritage",
];
/// Words names are built from, so text queries hit something
pub const WORDS: [&str; 8] = [
    "château", "musée", "lac", "parc", "auberge", "Bistrot", "Pont", "jardin",
];

/// Points scattered around the French Alps and Rhône valley
pub fn geo_point_strategy() -> impl Strategy<Value = GeoPoint> {
    (45.0f64..46.5, 4.0f64..7.0).prop_map(|(lat, lng)| GeoPoint::new(lat, lng))
}

pub fn name_strategy() -> impl Strategy<Value = String> {
    subsequence(WORDS.to_vec(), 1..=3).prop_map(|words| words.join(" "))
}

pub fn resource_strategy(id: i64) -> impl Strategy<Value = Resource> {
    (
        name_strategy(),
        prop::option::of(prop::sample::select(CITIES.to_vec())),
        subsequence(TYPES.to_vec(), 1..=3),
        prop::option::of(geo_point_strategy()),
        prop::option::of((2010i32..2025, 1u32..=12, 1u32..=28)),
        prop::bool::weighted(0.85),
    )
        .prop_map(move |(name, city, types, location, created, active)| {
            let mut record = resource(id, &name, city, &types);
            record.location = location;
            if let Some((year, month, day)) = created {
                record = record.created(year, month, day);
            }
            if !active {
                record = record.inactive();
            }
            record
        })
}

/// Between 1 and `max` records with ids 1..=n
pub fn dataset_strategy(max: usize) -> impl Strategy<Value = Vec<Resource>> {
    (1..=max).prop_flat_map(|n| {
        (1..=n as i64)
            .map(resource_strategy)
            .collect::<Vec<_>>()
    })
}
