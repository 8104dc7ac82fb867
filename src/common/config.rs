//! Configuration loading for the bookie engine
//!
//! TOML file first, then `BOOKIE_*` environment overrides, then validation.

use crate::config::BookieConfig;
use crate::errors::{BookieResult, ConfigurationError};
use std::env;
use std::path::Path;

pub const ENV_ADMINISTRATOR: &str = "BOOKIE_ADMINISTRATOR";
pub const ENV_STATE_FILE: &str = "BOOKIE_STATE_FILE";
pub const ENV_LOG_FILTER: &str = "BOOKIE_LOG_FILTER";
pub const ENV_MAX_ODDS: &str = "BOOKIE_MAX_ODDS";
pub const ENV_REWARD_BPS: &str = "BOOKIE_REWARD_BPS";

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    config_path: Option<String>,
    use_env: bool,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config_path: None,
            use_env: true,
        }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Skip environment overrides (tests run in a shared process environment)
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> BookieResult<BookieConfig> {
        let mut config = match self.config_path {
            Some(ref path) if Path::new(path).exists() => self.load_from_file(path)?,
            Some(ref path) => {
                tracing::debug!(path = %path, "Config file not found, using defaults");
                BookieConfig::default()
            }
            None => BookieConfig::default(),
        };

        if self.use_env {
            let vars = |key: &str| env::var(key).ok();
            apply_overrides(&mut config, vars)?;
        }

        config.validate()?;
        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> BookieResult<BookieConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    /// Save configuration to file
    pub fn save(&self, config: &BookieConfig, path: &str) -> BookieResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: String, reason: &str) -> Result<T, ConfigurationError> {
    value.parse().map_err(|_| ConfigurationError::InvalidValue {
        field: key.to_string(),
        value,
        reason: reason.to_string(),
    })
}

/// Applies overrides from `lookup`, which maps variable names to values
pub fn apply_overrides<F>(config: &mut BookieConfig, lookup: F) -> Result<(), ConfigurationError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(admin) = lookup(ENV_ADMINISTRATOR) {
        config.engine.administrator = admin;
    }
    if let Some(path) = lookup(ENV_STATE_FILE) {
        config.storage.state_file = path;
    }
    if let Some(filter) = lookup(ENV_LOG_FILTER) {
        config.logging.filter = filter;
    }
    if let Some(max) = lookup(ENV_MAX_ODDS) {
        config.engine.max_odds_magnitude = parse_var(ENV_MAX_ODDS, max, "Invalid odds magnitude")?;
    }
    if let Some(bps) = lookup(ENV_REWARD_BPS) {
        config.rewards.basis_points = parse_var(ENV_REWARD_BPS, bps, "Invalid basis points")?;
    }
    Ok(())
}

/// Write a default configuration file
pub fn generate_sample_config(path: &str) -> BookieResult<()> {
    ConfigLoader::new().save(&BookieConfig::default(), path)
}
