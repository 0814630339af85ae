//! In-process [`DurableStore`] backed by a `BTreeMap`; used in tests,
//! benchmarks and for small fixed datasets.

use super::{DurableStore, GroupCount, GroupField, Resource, StoreError, StoreQuery, StoreResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug)]
pub struct InMemoryStore {
    records: RwLock<BTreeMap<i64, Resource>>,
    available: AtomicBool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            available: AtomicBool::new(true),
        }
    }

    pub fn with_records(records: impl IntoIterator<Item = Resource>) -> Self {
        let store = Self::new();
        for record in records {
            store.insert(record);
        }
        store
    }

    /// Insert or replace by `id`
    pub fn insert(&self, resource: Resource) {
        self.records.write().insert(resource.id, resource);
    }

    pub fn remove(&self, id: i64) -> Option<Resource> {
        self.records.write().remove(&id)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Simulate an outage: every call fails with [`StoreError::Unavailable`]
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store marked unavailable".to_string()))
        }
    }

    fn matching(&self, query: &StoreQuery) -> Vec<Resource> {
        self.records
            .read()
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DurableStore for InMemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn fetch(&self, id: i64) -> StoreResult<Option<Resource>> {
        self.ensure_available()?;
        Ok(self.records.read().get(&id).cloned())
    }

    async fn find(&self, query: &StoreQuery) -> StoreResult<Vec<Resource>> {
        self.ensure_available()?;
        let matching = self.matching(query).into_iter().skip(query.offset);
        Ok(match query.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    async fn count(&self, query: &StoreQuery) -> StoreResult<u64> {
        self.ensure_available()?;
        let records = self.records.read();
        Ok(records.values().filter(|r| query.matches(r)).count() as u64)
    }

    async fn count_by(
        &self,
        query: &StoreQuery,
        field: GroupField,
    ) -> StoreResult<Vec<GroupCount>> {
        self.ensure_available()?;

        let mut counts: HashMap<String, u64> = HashMap::new();
        for record in self.records.read().values().filter(|r| query.matches(r)) {
            match field {
                GroupField::ResourceType => {
                    let mut seen: Vec<&String> = Vec::new();
                    for t in &record.resource_types {
                        if !seen.contains(&t) {
                            seen.push(t);
                            *counts.entry(t.clone()).or_default() += 1;
                        }
                    }
                }
                GroupField::City => {
                    if let Some(city) = record.city.as_ref().filter(|c| !c.is_empty()) {
                        *counts.entry(city.clone()).or_default() += 1;
                    }
                }
            }
        }

        let mut grouped: Vec<GroupCount> = counts.into_iter().collect();
        grouped.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(grouped)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.ensure_available()
    }
}
