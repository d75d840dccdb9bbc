//! Campaign configuration.
//!
//! Provides [`CampaignConfig`] with defaults matching the reference
//! deployment (rate 100 decaying by 99/100 every 20 units, 1 unit minimum,
//! 10-block periods). Loaded from JSON; missing fields take defaults.

use std::path::Path;

use ebb_core::constants::{
    DEFAULT_MAX_VERIFY_STEPS, DEFAULT_MIN_CONTRIBUTION, DEFAULT_PERIOD_DURATION_BLOCKS,
};
use ebb_core::error::ConfigError;
use ebb_core::types::{AccountId, Amount, BlockHeight, RateParameters};
use serde::{Deserialize, Serialize};

/// Deployment parameters for one campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignConfig {
    /// Account allowed to halt and resume contributions.
    pub admin: AccountId,
    /// Block at which period 0 opens.
    pub start_block: BlockHeight,
    /// Length of each clearance period in blocks.
    pub period_duration_blocks: u64,
    /// Smallest accepted contribution in base units.
    pub min_contribution: Amount,
    /// Rate curve parameters.
    pub rate: RateParameters,
    /// Most ledger entries one verification call may consume.
    pub max_verify_steps: usize,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            admin: AccountId::ZERO,
            start_block: 0,
            period_duration_blocks: DEFAULT_PERIOD_DURATION_BLOCKS,
            min_contribution: DEFAULT_MIN_CONTRIBUTION,
            rate: RateParameters::default(),
            max_verify_steps: DEFAULT_MAX_VERIFY_STEPS,
        }
    }
}

impl CampaignConfig {
    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period_duration_blocks == 0 {
            return Err(ConfigError::Invalid("period_duration_blocks must be positive".into()));
        }
        if self.max_verify_steps == 0 {
            return Err(ConfigError::Invalid("max_verify_steps must be positive".into()));
        }
        self.rate
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}
