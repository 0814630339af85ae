//! # Search
//!
//! ```text
//! ResilientSearchOrchestrator::search(query)
//!   ├── validate + clamp paging
//!   ├── CircuitBreaker("search-engine").call(timeout(primary.search))
//!   │     └── Ok -> source = primary
//!   └── any failure -> FallbackQueryEngine::search -> source = fallback
//! ```

pub mod engine;
pub mod fallback;
pub mod orchestrator;
pub mod types;

pub use engine::{engine_failure_policy, EngineError, PrimaryQueryEngine};
pub use fallback::FallbackQueryEngine;
pub use orchestrator::ResilientSearchOrchestrator;
pub use types::{
    Aggregation, FacetBucket, Page, ResultSource, SearchFilters, SearchHit, SearchKind,
    SearchQuery, SearchResult, Suggestion,
};
