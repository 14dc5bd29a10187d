//! Role sync worker configuration

use serde::Deserialize;
use std::time::Duration;

use crate::domain::sync::RetryPolicy;

use super::error::ValidationError;

/// Role sync worker tuning
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Seconds between queue polls
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,

    /// Milliseconds between members during a group-scope sync
    #[serde(default = "default_subject_delay")]
    pub subject_delay_ms: u64,

    /// Maximum platform call attempts, counting the first
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    /// Backoff before the first retry, in milliseconds
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,

    /// Upper bound on any backoff delay, in milliseconds
    #[serde(default = "default_retry_max_delay")]
    pub retry_max_delay_ms: u64,
}

impl SyncConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn subject_delay(&self) -> Duration {
        Duration::from_millis(self.subject_delay_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
        }
    }

    /// Validate sync configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.retry_max_attempts == 0 {
            return Err(ValidationError::InvalidRetryBudget);
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval(),
            subject_delay_ms: default_subject_delay(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay(),
            retry_max_delay_ms: default_retry_max_delay(),
        }
    }
}

fn default_tick_interval() -> u64 {
    5
}

fn default_subject_delay() -> u64 {
    250
}

fn default_retry_max_attempts() -> u32 {
    4
}

fn default_retry_base_delay() -> u64 {
    500
}

fn default_retry_max_delay() -> u64 {
    30_000
}
