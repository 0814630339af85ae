//! # Resilience Module
//!
//! Circuit breakers for the search stack's unreliable dependencies:
//!
//! - [`CircuitBreaker`]: per-dependency Closed/Open/HalfOpen state machine
//! - [`CircuitBreakerRegistry`]: shared name → breaker map, injected where needed
//! - [`FailurePolicy`]: which errors count against a breaker
//! - [`RetryPolicy`]: exponential backoff with jitter for transient failures

pub mod circuit_breaker;
pub mod config;
pub mod policy;
pub mod registry;
pub mod retry;
pub mod stats;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerError, CircuitState};
pub use config::CircuitBreakerConfig;
pub use policy::FailurePolicy;
pub use registry::CircuitBreakerRegistry;
pub use retry::RetryPolicy;
pub use stats::{CircuitBreakerStats, RegistrySnapshot};
