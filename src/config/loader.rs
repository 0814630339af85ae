//! Configuration Loader
//!
//! Environment-aware loading: a base TOML file, an optional
//! `<stem>.<environment>.toml` overlay next to it, then `SEARCH__` prefixed
//! environment variables (`SEARCH__CACHE__BACKEND=redis`).

use super::error::{ConfigResult, ConfigurationError};
use super::ResilienceConfig;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default location of the base configuration file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/search-resilience.toml";

const ENV_PREFIX: &str = "SEARCH";

pub struct ConfigLoader;

impl ConfigLoader {
    /// `SEARCH_ENV`, then `APP_ENV`, then `development`
    pub fn detect_environment() -> String {
        env::var("SEARCH_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }

    pub fn default_config_path() -> PathBuf {
        env::var("SEARCH_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Load using the detected environment and default path.
    ///
    /// A missing file at the default location falls back to built-in defaults
    /// (still subject to env overrides); an explicit `SEARCH_CONFIG_PATH` that
    /// does not exist is an error.
    pub fn load() -> ConfigResult<ResilienceConfig> {
        let path = Self::default_config_path();
        let environment = Self::detect_environment();

        if !path.exists() && env::var("SEARCH_CONFIG_PATH").is_err() {
            warn!(
                path = %path.display(),
                "Configuration file not found, using defaults with environment overrides"
            );
            let builder = Config::builder().add_source(Self::env_source());
            return Self::finish(builder, "defaults");
        }

        Self::load_from_path(&path, &environment)
    }

    pub fn load_from_path(path: &Path, environment: &str) -> ConfigResult<ResilienceConfig> {
        if !path.exists() {
            return Err(ConfigurationError::config_file_not_found(vec![
                path.to_path_buf()
            ]));
        }

        let overlay = Self::environment_overlay_path(path, environment);
        debug!(
            path = %path.display(),
            overlay = %overlay.display(),
            environment,
            "Loading configuration"
        );

        let builder = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml))
            .add_source(
                File::from(overlay.as_path())
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(Self::env_source());

        let config = Self::finish(builder, &path.display().to_string())?;
        info!(
            path = %path.display(),
            environment,
            cache_backend = %config.cache.backend,
            "Configuration loaded successfully"
        );
        Ok(config)
    }

    /// Parse a TOML document without file or environment lookups
    pub fn load_from_str(toml: &str) -> ConfigResult<ResilienceConfig> {
        let builder = Config::builder().add_source(File::from_str(toml, FileFormat::Toml));
        Self::finish(builder, "<inline>")
    }

    /// `config/search-resilience.toml` + `production` -> `config/search-resilience.production.toml`
    pub fn environment_overlay_path(path: &Path, environment: &str) -> PathBuf {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!("{stem}.{environment}.toml"))
    }

    fn env_source() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }

    fn finish(
        builder: ConfigBuilder<config::builder::DefaultState>,
        source_name: &str,
    ) -> ConfigResult<ResilienceConfig> {
        let raw = builder
            .build()
            .map_err(|e| ConfigurationError::invalid_toml(source_name, e))?;

        let config: ResilienceConfig =
            raw.try_deserialize()
                .map_err(|e| ConfigurationError::DeserializationError {
                    source_name: source_name.to_string(),
                    error: e.to_string(),
                })?;

        config.validate_all()?;
        Ok(config)
    }
}
