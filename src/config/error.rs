//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("No processor signing secret configured")]
    NoProcessorConfigured,

    #[error("Invalid Stripe signing secret format")]
    InvalidStripeSigningSecret,

    #[error("Platform API base URL must use HTTPS in production")]
    PlatformUrlMustBeHttps,

    #[error("Retry attempt budget must be at least 1")]
    InvalidRetryBudget,

    #[error("Sweep batch limit must be at least 1")]
    InvalidSweepBatch,
}
