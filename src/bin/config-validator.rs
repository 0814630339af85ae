//! # Search Resilience Configuration Validator
//!
//! Validates the resilience configuration file (plus its environment overlay
//! and `SEARCH__` overrides) before a service starts with it.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use resilient_search::config::{ConfigLoader, ResilienceConfig};
use std::path::PathBuf;
use std::process;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "config-validator")]
#[command(about = "Validate search resilience configuration files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Environment overlay to apply (default: SEARCH_ENV, then APP_ENV, then development)
    #[arg(short, long)]
    environment: Option<String>,

    /// Configuration file (default: SEARCH_CONFIG_PATH or config/search-resilience.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate every section
    All,

    /// Validate and describe one section
    Component {
        /// circuit_breakers, cache, search or telemetry
        name: String,
    },

    /// Print the effective configuration as JSON
    Show,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    let result = load(&cli).and_then(|config| match &cli.command {
        Some(Commands::All) | None => validate_all(&config),
        Some(Commands::Component { name }) => describe_component(&config, name),
        Some(Commands::Show) => show(&config),
    });

    match result {
        Ok(()) => {
            info!("Configuration validation completed successfully");
            process::exit(0);
        }
        Err(e) => {
            error!("Configuration validation failed: {e:#}");
            eprintln!("❌ {e:#}");
            process::exit(1);
        }
    }
}

fn load(cli: &Cli) -> anyhow::Result<ResilienceConfig> {
    let environment = cli
        .environment
        .clone()
        .unwrap_or_else(ConfigLoader::detect_environment);
    let path = cli
        .config
        .clone()
        .unwrap_or_else(ConfigLoader::default_config_path);

    println!("🔧 Validating search resilience configuration");
    println!("Environment: {environment}");
    println!("File: {}", path.display());
    println!(
        "Overlay: {}",
        ConfigLoader::environment_overlay_path(&path, &environment).display()
    );
    println!();

    ConfigLoader::load_from_path(&path, &environment)
        .with_context(|| format!("loading {}", path.display()))
}

fn validate_all(config: &ResilienceConfig) -> anyhow::Result<()> {
    for section in ["circuit_breakers", "cache", "search", "telemetry"] {
        describe_component(config, section)?;
    }
    println!("\n🎉 All configuration validation checks passed!");
    Ok(())
}

fn describe_component(config: &ResilienceConfig, name: &str) -> anyhow::Result<()> {
    match name.to_lowercase().replace('-', "_").as_str() {
        "circuit_breakers" => {
            println!("⚡ Circuit breakers");
            if !config.circuit_breakers.enabled {
                println!("   ℹ️  disabled (calls pass straight through)");
            }
            let default = config.circuit_breakers.default_breaker_config();
            println!(
                "   ✅ default: threshold {}, recovery {:?}",
                default.failure_threshold, default.recovery_timeout
            );
            let mut names: Vec<&String> = config.circuit_breakers.component_configs.keys().collect();
            names.sort();
            for component in names {
                let breaker = config.circuit_breakers.config_for_component(component);
                println!(
                    "   ✅ {component}: threshold {}, recovery {:?}",
                    breaker.failure_threshold, breaker.recovery_timeout
                );
            }
        }
        "cache" => {
            let cache = &config.cache;
            println!("🗃️  Cache");
            if !cache.enabled {
                println!("   ℹ️  disabled (every lookup is a miss)");
            }
            println!("   ✅ backend: {} (namespace '{}')", cache.backend, cache.namespace);
            println!("   ✅ operation timeout: {}ms", cache.operation_timeout_ms);
            if let Some(redis) = &cache.redis {
                println!("   ✅ redis connection timeout: {}ms", redis.connection_timeout_ms);
            }
        }
        "search" => {
            let search = &config.search;
            println!("🔎 Search");
            println!(
                "   ✅ primary timeout {}ms behind breaker '{}'",
                search.primary_timeout_ms, search.breaker_name
            );
            println!(
                "   ✅ page size {} (max {})",
                search.default_page_size, search.max_page_size
            );
            println!("   ✅ fallback scans at most {} records", search.max_fallback_scan);
        }
        "telemetry" => {
            let telemetry = &config.telemetry;
            println!("📊 Telemetry");
            if telemetry.enabled {
                println!(
                    "   ✅ exporting as '{}' to {} every {}s",
                    telemetry.service_name,
                    telemetry.otlp_endpoint,
                    telemetry.export_interval_seconds
                );
            } else {
                println!("   ℹ️  export disabled");
            }
        }
        other => bail!("Unknown component: {other}"),
    }
    Ok(())
}

fn show(config: &ResilienceConfig) -> anyhow::Result<()> {
    let mut redacted = config.clone();
    if let Some(redis) = redacted.cache.redis.as_mut() {
        redis.url = "[REDACTED]".to_string();
    }
    println!("{}", serde_json::to_string_pretty(&redacted)?);
    Ok(())
}
