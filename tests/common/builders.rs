//! Resource fixtures, a reference scan and orchestrator wiring for integration tests.

use chrono::{NaiveDate, TimeZone, Utc};
use resilient_search::config::{CircuitBreakerSettings, SearchSettings};
use resilient_search::resilience::{CircuitBreakerConfig, CircuitBreakerRegistry};
use resilient_search::search::{FallbackQueryEngine, PrimaryQueryEngine, ResilientSearchOrchestrator};
use resilient_search::store::{GeoPoint, GroupField, InMemoryStore, Resource, StoreQuery};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use super::mock_engine::ScriptedEngine;

pub const LYON: GeoPoint = GeoPoint {
    lat: 45.7640,
    lng: 4.8357,
};
pub const ANNECY: GeoPoint = GeoPoint {
    lat: 45.8992,
    lng: 6.1294,
};
pub const PARIS: GeoPoint = GeoPoint {
    lat: 48.8566,
    lng: 2.3522,
};

/// Active resource with a French name and no location
pub fn resource(id: i64, name: &str, city: Option<&str>, types: &[&str]) -> Resource {
    Resource {
        id,
        resource_id: format!("urn:res:{id}"),
        name: BTreeMap::from([("fr".to_string(), name.to_string())]),
        description: BTreeMap::new(),
        resource_types: types.iter().map(|t| t.to_string()).collect(),
        city: city.map(str::to_string),
        address: None,
        location: None,
        creation_date: None,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        is_active: true,
    }
}

pub trait ResourceExt {
    fn at(self, lat: f64, lng: f64) -> Self;
    fn created(self, year: i32, month: u32, day: u32) -> Self;
    fn described(self, language: &str, text: &str) -> Self;
    fn named(self, language: &str, text: &str) -> Self;
    fn with_address(self, address: &str) -> Self;
    fn inactive(self) -> Self;
}

impl ResourceExt for Resource {
    fn at(mut self, lat: f64, lng: f64) -> Self {
        self.location = Some(GeoPoint::new(lat, lng));
        self
    }

    fn created(mut self, year: i32, month: u32, day: u32) -> Self {
        self.creation_date = NaiveDate::from_ymd_opt(year, month, day);
        self
    }

    fn described(mut self, language: &str, text: &str) -> Self {
        self.description.insert(language.to_string(), text.to_string());
        self
    }

    fn named(mut self, language: &str, text: &str) -> Self {
        self.name.insert(language.to_string(), text.to_string());
        self
    }

    fn with_address(mut self, address: &str) -> Self {
        self.address = Some(address.to_string());
        self
    }

    fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// A small but varied catalogue: several cities, overlapping types, inactive
/// and unlocated records, multilingual text
pub fn tourism_dataset() -> Vec<Resource> {
    vec![
        resource(1, "Château de Lyon", Some("Lyon"), &["PlaceOfInterest", "CulturalSite"])
            .at(45.7626, 4.8270)
            .created(2019, 5, 1)
            .named("en", "Lyon Castle")
            .described("fr", "Un château médiéval au cœur du Vieux Lyon"),
        resource(2, "Musée des Confluences", Some("Lyon"), &["Museum", "CulturalSite"])
            .at(45.7326, 4.8183)
            .created(2021, 3, 12)
            .described("en", "Science and anthropology museum"),
        resource(3, "Bouchon Lyonnais", Some("Lyon"), &["Restaurant"])
            .at(45.7670, 4.8330)
            .created(2022, 7, 30)
            .with_address("12 rue du Château"),
        resource(4, "Lac d'Annecy", Some("Annecy"), &["PlaceOfInterest", "NaturalHeritage"])
            .at(45.8500, 6.1700)
            .created(2018, 6, 21)
            .described("fr", "Le lac le plus pur d'Europe"),
        resource(5, "Château d'Annecy", Some("Annecy"), &["Museum", "PlaceOfInterest"])
            .at(45.8986, 6.1256)
            .created(2020, 9, 9),
        resource(6, "Hôtel du Lac", Some("Annecy"), &["Accommodation"])
            .at(45.9000, 6.1330)
            .created(2023, 1, 15)
            .described("en", "Lakeside hotel near the castle"),
        resource(7, "Musée du Louvre", Some("Paris"), &["Museum", "CulturalSite"])
            .at(48.8606, 2.3376)
            .created(2017, 11, 2)
            .named("en", "Louvre Museum"),
        resource(8, "Bistrot Parisien", Some("Paris"), &["Restaurant"])
            .at(48.8530, 2.3499)
            .created(2024, 2, 29),
        resource(9, "Château fermé", Some("Lyon"), &["PlaceOfInterest"])
            .at(45.7600, 4.8400)
            .created(2016, 4, 4)
            .inactive(),
        resource(10, "Gîte sans adresse", None, &["Accommodation"])
            .created(2022, 8, 8)
            .described("fr", "Gîte rural près du château"),
        resource(11, "Auberge de la Croix-Rousse", Some("Lyon"), &["Restaurant", "Accommodation"])
            .at(45.7750, 4.8320),
        resource(12, "Parc de la Tête d'Or", Some("Lyon"), &["NaturalHeritage", "PlaceOfInterest"])
            .at(45.7772, 4.8553)
            .created(2015, 5, 5),
    ]
}

pub fn dataset_store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::with_records(tourism_dataset()))
}

/// Linear scan: ids of every record the store predicate accepts
pub fn reference_ids(records: &[Resource], query: &StoreQuery) -> BTreeSet<i64> {
    records
        .iter()
        .filter(|r| query.matches(r))
        .map(|r| r.id)
        .collect()
}

/// Linear scan: group counts over matching records, each type counted once per record
pub fn reference_counts(
    records: &[Resource],
    query: &StoreQuery,
    field: GroupField,
) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for record in records.iter().filter(|r| query.matches(r)) {
        let keys: BTreeSet<&str> = match field {
            GroupField::ResourceType => record.resource_types.iter().map(String::as_str).collect(),
            GroupField::City => record.city.iter().map(String::as_str).collect(),
        };
        for key in keys {
            *counts.entry(key.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

/// Breaker settings with the primary engine's breaker set to `threshold`/`recovery`
pub fn breaker_settings(threshold: u32, recovery: Duration) -> CircuitBreakerSettings {
    let mut settings = CircuitBreakerSettings::default();
    settings.component_configs.insert(
        "search-engine".to_string(),
        CircuitBreakerConfig::new(threshold, recovery).into(),
    );
    settings
}

pub struct Harness {
    pub orchestrator: ResilientSearchOrchestrator,
    pub engine: Arc<ScriptedEngine>,
    pub store: Arc<InMemoryStore>,
    pub registry: CircuitBreakerRegistry,
}

impl Harness {
    pub fn new(engine: Arc<ScriptedEngine>, threshold: u32, recovery: Duration) -> Self {
        Self::with_store(engine, dataset_store(), threshold, recovery)
    }

    pub fn with_store(
        engine: Arc<ScriptedEngine>,
        store: Arc<InMemoryStore>,
        threshold: u32,
        recovery: Duration,
    ) -> Self {
        let registry = CircuitBreakerRegistry::from_settings(breaker_settings(threshold, recovery));
        let primary: Arc<dyn PrimaryQueryEngine> = engine.clone();
        let orchestrator = ResilientSearchOrchestrator::new(
            primary,
            FallbackQueryEngine::new(store.clone()),
            &registry,
            SearchSettings::default(),
        );

        Self {
            orchestrator,
            engine,
            store,
            registry,
        }
    }
}
