#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, OpenTelemetry in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Resilient Search Core
//!
//! Keeps tourism resource search answering while its dependencies fail.
//!
//! ## Overview
//!
//! The preferred search engine is treated as unreliable. Every call to it
//! goes through a named circuit breaker with a deadline; when the breaker is
//! open or the call fails, the same query is answered from the durable store
//! by a simpler fallback engine and the result is tagged `source = fallback`.
//! A category-aware response cache can wrap any of this at the call boundary.
//!
//! ## Module Organization
//!
//! - [`resilience`] - Circuit breakers, failure policies, registry, retry policy
//! - [`cache`] - Response cache with pluggable backends (moka, Redis, no-op)
//! - [`store`] - Durable store trait with in-memory and PostgreSQL backends
//! - [`search`] - Query types, primary engine trait, fallback engine, orchestrator
//! - [`middleware`] - Call-boundary wrappers (breaker, cache, timeout, retry, timing)
//! - [`health`] - Health report over breakers and collaborators
//! - [`config`] - TOML + environment configuration
//! - [`logging`] / [`metrics`] - tracing subscriber and OpenTelemetry meters
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resilient_search::config::ConfigLoader;
//! use resilient_search::resilience::CircuitBreakerRegistry;
//! use resilient_search::search::{
//!     FallbackQueryEngine, PrimaryQueryEngine, ResilientSearchOrchestrator, SearchQuery,
//! };
//! use resilient_search::store::InMemoryStore;
//! use std::sync::Arc;
//!
//! # async fn example(primary: Arc<dyn PrimaryQueryEngine>) -> Result<(), Box<dyn std::error::Error>> {
//! resilient_search::logging::init_tracing();
//! let config = ConfigLoader::load()?;
//!
//! let registry = CircuitBreakerRegistry::from_settings(config.circuit_breakers.clone());
//! let fallback = FallbackQueryEngine::new(Arc::new(InMemoryStore::new()));
//! let orchestrator =
//!     ResilientSearchOrchestrator::new(primary, fallback, &registry, config.search.clone());
//!
//! let result = orchestrator.search(&SearchQuery::text("château")).await?;
//! println!("{} hits from {:?}", result.total, result.source);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod resilience;
pub mod search;
pub mod store;

pub use cache::{CacheCategory, CacheStore, KeyArgs};
pub use config::{ConfigLoader, ResilienceConfig};
pub use error::{PrimaryFailure, Result, SearchError};
pub use health::{HealthChecker, HealthReport, HealthStatus};
pub use resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerRegistry,
    CircuitState, FailurePolicy,
};
pub use search::{
    FallbackQueryEngine, PrimaryQueryEngine, ResilientSearchOrchestrator, SearchQuery,
    SearchResult,
};
pub use store::{DurableStore, Resource};
