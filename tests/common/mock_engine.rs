//! Primary engine double whose behaviour can be scripted per test.

use async_trait::async_trait;
use parking_lot::Mutex;
use resilient_search::search::{
    EngineError, PrimaryQueryEngine, ResultSource, SearchHit, SearchQuery, SearchResult,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::builders::resource;

/// Id of the single hit every successful scripted search returns
pub const PRIMARY_HIT_ID: i64 = 9_999;

#[derive(Debug, Clone)]
pub enum Script {
    Succeed,
    Fail(EngineError),
    /// Never answers within any sane deadline
    Hang,
}

#[derive(Debug)]
pub struct ScriptedEngine {
    script: Mutex<Script>,
    calls: AtomicUsize,
    pings: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
            pings: AtomicUsize::new(0),
        })
    }

    pub fn succeeding() -> Arc<Self> {
        Self::new(Script::Succeed)
    }

    pub fn failing(error: EngineError) -> Arc<Self> {
        Self::new(Script::Fail(error))
    }

    pub fn hanging() -> Arc<Self> {
        Self::new(Script::Hang)
    }

    pub fn set_script(&self, script: Script) {
        *self.script.lock() = script;
    }

    /// Searches that actually reached the engine
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    fn current(&self) -> Script {
        self.script.lock().clone()
    }
}

#[async_trait]
impl PrimaryQueryEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResult, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.current() {
            Script::Succeed => Ok(primary_result(query)),
            Script::Fail(error) => Err(error),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3_600)).await;
                Ok(primary_result(query))
            }
        }
    }

    async fn ping(&self) -> Result<(), EngineError> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        match self.current() {
            Script::Succeed => Ok(()),
            Script::Fail(error) => Err(error),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3_600)).await;
                Ok(())
            }
        }
    }
}

/// Engines report their own source; the orchestrator is expected to overwrite it
fn primary_result(query: &SearchQuery) -> SearchResult {
    let hit = SearchHit::from_resource(
        &resource(PRIMARY_HIT_ID, "Résultat moteur", Some("Lyon"), &["PlaceOfInterest"]),
        query.language(),
    )
    .with_score(12.5);

    let mut result = SearchResult::empty(query.page(), ResultSource::Fallback);
    result.hits = vec![hit];
    result.total = 1;
    result.max_score = Some(12.5);
    result
}
