//! Configuration with validation and defaults
//!
//! Loaded from TOML by `common::config::ConfigLoader`; environment overrides
//! are applied before `validate` runs.

use crate::errors::ConfigurationError;
use crate::payout::{MAX_ODDS_MAGNITUDE, MIN_ODDS_MAGNITUDE};
use crate::common::types::Amount;
use serde::{Deserialize, Serialize};

/// Complete engine configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookieConfig {
    pub engine: EngineConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub rewards: RewardsConfig,
}

/// Escrow engine rules
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Account allowed to mint an admin capability
    pub administrator: String,
    /// Largest accepted odds magnitude, at most `MAX_ODDS_MAGNITUDE`
    pub max_odds_magnitude: u32,
    /// Reject explicit odds that differ from the posted line
    pub enforce_posted_line: bool,
    pub min_stake: Amount,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            administrator: "house".to_string(),
            max_odds_magnitude: MAX_ODDS_MAGNITUDE,
            enforce_posted_line: true,
            min_stake: 1,
        }
    }
}

/// Snapshot persistence
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub state_file: String,
    /// Pretty-print snapshot JSON
    pub pretty: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_file: "./bookie_state.json".to_string(),
            pretty: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "bookie=info".to_string(),
        }
    }
}

/// Reward points credited on claimed wagers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardsConfig {
    /// Points per 10_000 units of claimed stake
    pub basis_points: u32,
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self { basis_points: 100 }
    }
}

impl BookieConfig {
    /// Configuration for throwaway engines in tests and benches
    pub fn ephemeral(administrator: &str) -> Self {
        Self {
            engine: EngineConfig {
                administrator: administrator.to_string(),
                enforce_posted_line: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Validate configuration for logical consistency
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.engine.administrator.trim().is_empty() {
            return Err(ConfigurationError::MissingRequired(
                "engine.administrator".to_string(),
            ));
        }

        let max = self.engine.max_odds_magnitude;
        if !(MIN_ODDS_MAGNITUDE..=MAX_ODDS_MAGNITUDE).contains(&max) {
            return Err(ConfigurationError::InvalidValue {
                field: "engine.max_odds_magnitude".to_string(),
                value: max.to_string(),
                reason: format!(
                    "must be within {}..={}",
                    MIN_ODDS_MAGNITUDE, MAX_ODDS_MAGNITUDE
                ),
            });
        }

        if self.engine.min_stake == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "engine.min_stake".to_string(),
                value: "0".to_string(),
                reason: "minimum stake must be > 0".to_string(),
            });
        }

        if self.rewards.basis_points > 10_000 {
            return Err(ConfigurationError::InvalidValue {
                field: "rewards.basis_points".to_string(),
                value: self.rewards.basis_points.to_string(),
                reason: "cannot exceed 10000".to_string(),
            });
        }

        if self.storage.state_file.trim().is_empty() {
            return Err(ConfigurationError::MissingRequired(
                "storage.state_file".to_string(),
            ));
        }

        Ok(())
    }
}
