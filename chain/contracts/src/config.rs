//! Engine configuration
//!
//! Policy values the validation engine reads at call time. Loadable from
//! JSON; every field has a default so partial files are accepted.

use escrow_types::ids::Address;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Default minimum time between "now" and a candidate's expiry (5 minutes).
pub const DEFAULT_MIN_EXPIRY_HORIZON_SECS: i64 = 5 * 60;

/// Default chain id for domain separation.
pub const DEFAULT_CHAIN_ID: u64 = 1;

/// Configuration shared by the factory, escrow accounts and settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Candidates must stay valid at least this many seconds past now.
    pub min_expiry_horizon_secs: i64,
    /// Identity granted the escrow's spending allowance at initialization.
    pub relayer: Address,
    /// Settlement contract the order digest is bound to.
    pub settlement: Address,
    /// Chain the order digest is bound to.
    pub chain_id: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_expiry_horizon_secs: DEFAULT_MIN_EXPIRY_HORIZON_SECS,
            relayer: Address::ZERO,
            settlement: Address::ZERO,
            chain_id: DEFAULT_CHAIN_ID,
        }
    }
}

impl EngineConfig {
    /// Config for a given settlement deployment with default policy.
    pub fn new(relayer: Address, settlement: Address, chain_id: u64) -> Self {
        Self {
            relayer,
            settlement,
            chain_id,
            ..Self::default()
        }
    }

    /// Override the minimum expiry horizon.
    pub fn with_min_expiry_horizon(mut self, secs: i64) -> Self {
        self.min_expiry_horizon_secs = secs;
        self
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_expiry_horizon_secs < 0 {
            return Err(ConfigError::Invalid(format!(
                "min_expiry_horizon_secs must be non-negative, got {}",
                self.min_expiry_horizon_secs
            )));
        }
        if self.relayer.is_zero() {
            return Err(ConfigError::Invalid("relayer must be set".to_string()));
        }
        if self.settlement.is_zero() {
            return Err(ConfigError::Invalid("settlement must be set".to_string()));
        }
        Ok(())
    }
}
