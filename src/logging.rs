//! # Tracing Module
//!
//! Environment-aware console logging using the tracing ecosystem. Logs go to
//! stdout; production switches the console layer to JSON lines.
//!
//! ```bash
//! SEARCH_ENV=production RUST_LOG=resilient_search=debug ./service
//! ```

use std::io::IsTerminal;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::metrics;

static TRACING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Install the global subscriber and metrics provider.
///
/// Idempotent; if another subscriber is already installed (a test harness,
/// an embedding application) that one is kept.
pub fn init_tracing() {
    TRACING_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);
        let json = environment == "production";

        let console_layer = if json {
            fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_current_span(true)
                .with_filter(EnvFilter::new(&log_level))
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(std::io::stdout().is_terminal())
                .with_filter(EnvFilter::new(&log_level))
                .boxed()
        };

        if tracing_subscriber::registry()
            .with(console_layer)
            .try_init()
            .is_err()
        {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        } else {
            tracing::info!(
                environment = %environment,
                log_level = %log_level,
                json_output = json,
                "Console logging initialized"
            );
        }

        metrics::init_metrics();
    });
}

/// `SEARCH_ENV`, then `APP_ENV`, then `development`
pub fn get_environment() -> String {
    std::env::var("SEARCH_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Filter directive: `LOG_LEVEL`, then `RUST_LOG`, then the environment default
fn get_log_level(environment: &str) -> String {
    std::env::var("LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| default_level_for(environment).to_string())
}

fn default_level_for(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}
