//! Layered application settings.
//!
//! Precedence, lowest first: built-in defaults, the TOML file (`--config`
//! or `./wetbulb.toml` when present), `WETBULB_*` environment variables,
//! then command-line flags. A `.env` file is folded into the environment
//! before loading. The provider key may also come from `CLIMATELY_API_KEY`.

use crate::error::{ConfigError, Result};
use crate::pipeline::PipelineConfig;
use crate::utils::constants::*;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    #[validate(range(min = 1))]
    pub interval_secs: u64,
    #[validate(range(min = 1))]
    pub top_k: usize,
    #[validate(range(min = 1))]
    pub fetch_timeout_secs: u64,
    #[validate(range(min = 1))]
    pub store_timeout_secs: u64,
    #[validate(length(min = 1))]
    pub expected_entry: String,
    pub database_path: PathBuf,
    pub stations_path: Option<PathBuf>,
    pub bind: SocketAddr,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

/// Values supplied on the command line. `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub interval_secs: Option<u64>,
    pub top_k: Option<usize>,
    pub fetch_timeout_secs: Option<u64>,
    pub expected_entry: Option<String>,
    pub database_path: Option<PathBuf>,
    pub stations_path: Option<PathBuf>,
    pub bind: Option<SocketAddr>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl AppConfig {
    pub fn load(config_file: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let file_source = match config_file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("interval_secs", DEFAULT_INTERVAL_SECS as i64)?
            .set_default("top_k", DEFAULT_TOP_K as i64)?
            .set_default("fetch_timeout_secs", DEFAULT_FETCH_TIMEOUT_SECS as i64)?
            .set_default("store_timeout_secs", DEFAULT_STORE_TIMEOUT_SECS as i64)?
            .set_default("expected_entry", DEFAULT_EXPECTED_ENTRY)?
            .set_default("database_path", DEFAULT_DATABASE_PATH)?
            .set_default("bind", DEFAULT_BIND_ADDR)?
            .set_default("log_level", DEFAULT_LOG_LEVEL)?
            .add_source(file_source)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .set_override_option("base_url", overrides.base_url.clone())?
            .set_override_option("interval_secs", overrides.interval_secs.map(|v| v as i64))?
            .set_override_option("top_k", overrides.top_k.map(|v| v as i64))?
            .set_override_option(
                "fetch_timeout_secs",
                overrides.fetch_timeout_secs.map(|v| v as i64),
            )?
            .set_override_option("expected_entry", overrides.expected_entry.clone())?
            .set_override_option("database_path", path_value(&overrides.database_path))?
            .set_override_option("stations_path", path_value(&overrides.stations_path))?
            .set_override_option("bind", overrides.bind.map(|b| b.to_string()))?
            .set_override_option("log_level", overrides.log_level.clone())?
            .set_override_option("log_file", path_value(&overrides.log_file))?
            .build()?;

        let mut app: AppConfig = settings.try_deserialize()?;
        if app.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            app.api_key = std::env::var(PROVIDER_API_KEY_VAR).ok();
        }

        app.check()?;
        Ok(app)
    }

    /// Field-level and cross-field validation.
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        self.level()?;
        Ok(())
    }

    pub fn level(&self) -> Result<Level> {
        self.log_level
            .parse::<Level>()
            .map_err(|_| ConfigError::Invalid(format!("Unknown log level '{}'", self.log_level)))
    }

    /// The provider key, required only by commands that fetch.
    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(ConfigError::Invalid(format!(
                "No API key configured; set {}_API_KEY or {}",
                ENV_PREFIX, PROVIDER_API_KEY_VAR
            ))),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            top_k: self.top_k,
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            store_timeout: Duration::from_secs(self.store_timeout_secs),
            expected_entry: self.expected_entry.clone(),
        }
    }
}

fn path_value(path: &Option<PathBuf>) -> Option<String> {
    path.as_ref().map(|p| p.display().to_string())
}
