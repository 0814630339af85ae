//! # OpenTelemetry Metrics
//!
//! Metrics are exported via OTLP when `TELEMETRY_ENABLED=true`; otherwise the
//! global no-op provider swallows every recording, so instrumented code never
//! needs to check whether export is on.
//!
//! Domain modules:
//! - `resilience`: breaker transitions and rejections
//! - `cache`: cache operation outcomes
//! - `search`: request counts, fallbacks, latency, result sizes
//!
//! ## Configuration
//!
//! - `TELEMETRY_ENABLED=true` - Enable metrics export
//! - `OTEL_EXPORTER_OTLP_ENDPOINT` - OTLP endpoint (default: http://localhost:4317)
//! - `OTEL_SERVICE_NAME` - Service name for resource attributes

use crate::config::TelemetrySettings;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    metrics::{PeriodicReader, SdkMeterProvider},
    runtime, Resource,
};
use std::sync::OnceLock;
use std::time::Duration;

pub mod cache;
pub mod resilience;
pub mod search;

static METRICS_INITIALIZED: OnceLock<()> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub service_name: String,
    pub service_version: String,
    pub deployment_environment: String,
    pub otlp_endpoint: String,
    pub export_interval_seconds: u64,
}

impl MetricsConfig {
    /// Start from file settings; environment variables still win
    pub fn from_settings(settings: &TelemetrySettings) -> Self {
        let env_defaults = Self::default();
        Self {
            enabled: std::env::var("TELEMETRY_ENABLED")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(settings.enabled),
            service_name: std::env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| settings.service_name.clone()),
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| settings.otlp_endpoint.clone()),
            export_interval_seconds: settings.export_interval_seconds,
            ..env_defaults
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: std::env::var("TELEMETRY_ENABLED")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            service_name: std::env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| "resilient-search".to_string()),
            service_version: std::env::var("OTEL_SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            deployment_environment: std::env::var("DEPLOYMENT_ENVIRONMENT")
                .or_else(|_| std::env::var("SEARCH_ENV"))
                .unwrap_or_else(|_| "development".to_string()),
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4317".to_string()),
            export_interval_seconds: 60,
        }
    }
}

fn init_opentelemetry_meter(
    config: &MetricsConfig,
) -> Result<SdkMeterProvider, Box<dyn std::error::Error>> {
    let resource = Resource::new(vec![
        KeyValue::new("service.name", config.service_name.clone()),
        KeyValue::new("service.version", config.service_version.clone()),
        KeyValue::new(
            "deployment.environment",
            config.deployment_environment.clone(),
        ),
    ]);

    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(&config.otlp_endpoint)
        .build()?;

    let reader = PeriodicReader::builder(exporter, runtime::Tokio)
        .with_interval(Duration::from_secs(config.export_interval_seconds))
        .build();

    Ok(SdkMeterProvider::builder()
        .with_reader(reader)
        .with_resource(resource)
        .build())
}

/// Install the global MeterProvider from environment variables only.
///
/// Safe to call multiple times; only the first call has any effect.
pub fn init_metrics() {
    init_metrics_with(MetricsConfig::default());
}

/// Install the global MeterProvider with explicit configuration.
///
/// Must run inside a Tokio runtime when export is enabled (the periodic
/// reader spawns onto it).
pub fn init_metrics_with(config: MetricsConfig) {
    METRICS_INITIALIZED.get_or_init(|| {
        if !config.enabled {
            tracing::debug!("Metrics collection disabled (TELEMETRY_ENABLED=false)");
            return;
        }

        match init_opentelemetry_meter(&config) {
            Ok(meter_provider) => {
                opentelemetry::global::set_meter_provider(meter_provider);
                tracing::info!(
                    service_name = %config.service_name,
                    otlp_endpoint = %config.otlp_endpoint,
                    export_interval_seconds = config.export_interval_seconds,
                    "OpenTelemetry metrics initialized"
                );
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Failed to initialize OpenTelemetry metrics - metrics collection disabled"
                );
            }
        }
    });
}
