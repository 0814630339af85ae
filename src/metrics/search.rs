//! # Search Metrics
//!
//! ```rust
//! use opentelemetry::KeyValue;
//! use resilient_search::metrics::search::*;
//!
//! search_requests_total().add(
//!     1,
//!     &[KeyValue::new("kind", "text"), KeyValue::new("source", "fallback")],
//! );
//! ```

use opentelemetry::metrics::{Counter, Histogram, Meter};
use std::sync::OnceLock;

static SEARCH_METER: OnceLock<Meter> = OnceLock::new();

fn meter() -> &'static Meter {
    SEARCH_METER.get_or_init(|| opentelemetry::global::meter_provider().meter("search"))
}

// Counters

/// Completed search requests
///
/// Labels:
/// - kind: text, geo, type_filter, autocomplete
/// - source: primary, fallback, cache
pub fn search_requests_total() -> Counter<u64> {
    meter()
        .u64_counter("search.requests.total")
        .with_description("Total number of completed search requests")
        .build()
}

/// Requests served by the fallback engine
///
/// Labels:
/// - kind: text, geo, type_filter, autocomplete
/// - reason: circuit_open, timeout, engine_error, unexpected
pub fn search_fallbacks_total() -> Counter<u64> {
    meter()
        .u64_counter("search.fallbacks.total")
        .with_description("Total number of searches answered by the fallback engine")
        .build()
}

// Histograms

/// End-to-end search duration in milliseconds
///
/// Labels:
/// - kind
/// - source
pub fn search_duration() -> Histogram<f64> {
    meter()
        .f64_histogram("search.duration")
        .with_description("Search request duration in milliseconds")
        .with_unit("ms")
        .build()
}

/// Number of hits returned per page
pub fn search_results_count() -> Histogram<u64> {
    meter()
        .u64_histogram("search.results.count")
        .with_description("Number of hits returned per search page")
        .build()
}
