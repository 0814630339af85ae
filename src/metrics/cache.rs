use opentelemetry::metrics::{Counter, Meter};
use std::sync::OnceLock;

static CACHE_METER: OnceLock<Meter> = OnceLock::new();

fn meter() -> &'static Meter {
    CACHE_METER.get_or_init(|| opentelemetry::global::meter_provider().meter("search-cache"))
}

/// Cache operations by outcome
///
/// Labels:
/// - operation: get, set, delete, delete_pattern, clear
/// - result: hit, miss, ok, error, timeout
pub fn cache_operations_total() -> Counter<u64> {
    meter()
        .u64_counter("cache.operations.total")
        .with_description("Total number of cache operations by outcome")
        .build()
}
