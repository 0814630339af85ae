//! # Resilience Metrics
//!
//! Circuit breaker state changes and fast-fail rejections.

use opentelemetry::metrics::{Counter, Meter};
use std::sync::OnceLock;

static RESILIENCE_METER: OnceLock<Meter> = OnceLock::new();

fn meter() -> &'static Meter {
    RESILIENCE_METER
        .get_or_init(|| opentelemetry::global::meter_provider().meter("search-resilience"))
}

/// Breaker state transitions
///
/// Labels:
/// - component: breaker name
/// - to: closed, open, half_open
pub fn circuit_transitions_total() -> Counter<u64> {
    meter()
        .u64_counter("circuit_breaker.transitions.total")
        .with_description("Total number of circuit breaker state transitions")
        .build()
}

/// Calls rejected without reaching the protected operation
///
/// Labels:
/// - component: breaker name
pub fn circuit_rejections_total() -> Counter<u64> {
    meter()
        .u64_counter("circuit_breaker.rejections.total")
        .with_description("Total number of calls rejected by an open circuit")
        .build()
}
