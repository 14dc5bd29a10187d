//! Expiry sweep configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Expiry sweeper tuning
#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    /// Seconds between sweeps
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Maximum grants expired per sweep batch
    #[serde(default = "default_batch_limit")]
    pub batch_limit: u32,
}

impl SweepConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Validate sweep configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.batch_limit == 0 {
            return Err(ValidationError::InvalidSweepBatch);
        }
        Ok(())
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            batch_limit: default_batch_limit(),
        }
    }
}

fn default_interval() -> u64 {
    300
}

fn default_batch_limit() -> u32 {
    200
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_sweep_every_five_minutes() {
        let config = SweepConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(300));
        assert_eq!(config.batch_limit, 200);
    }

    #[test]
    fn zero_batch_limit_is_rejected() {
        let config = SweepConfig {
            batch_limit: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
