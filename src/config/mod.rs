//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Configuration is loaded with the
//! `GUILDPASS_` prefix and nested values use double underscores as
//! separators.
//!
//! # Example
//!
//! ```no_run
//! use guildpass::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {}", config.server.socket_addr());
//! ```

mod database;
mod error;
mod platform;
mod providers;
mod server;
mod sweep;
mod sync;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use platform::PlatformConfig;
pub use providers::ProvidersConfig;
pub use server::{Environment, ServerConfig};
pub use sweep::SweepConfig;
pub use sync::SyncConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Payment processor signing secrets
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Community platform API (bot token, base URL)
    pub platform: PlatformConfig,

    /// Role sync worker tuning
    #[serde(default)]
    pub sync: SyncConfig,

    /// Expiry sweeper tuning
    #[serde(default)]
    pub sweep: SweepConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with the `GUILDPASS` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `GUILDPASS__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `GUILDPASS__DATABASE__URL=...` -> `database.url = ...`
    /// - `GUILDPASS__PROVIDERS__STRIPE_SIGNING_SECRET=whsec_...`
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("GUILDPASS")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.providers.validate()?;
        self.platform.validate(&self.server.environment)?;
        self.sync.validate()?;
        self.sweep.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var(
            "GUILDPASS__DATABASE__URL",
            "postgresql://test@localhost/guildpass",
        );
        env::set_var("GUILDPASS__PLATFORM__BOT_TOKEN", "bot-token");
        env::set_var(
            "GUILDPASS__PROVIDERS__STRIPE_SIGNING_SECRET",
            "whsec_test",
        );
    }

    fn clear_env() {
        env::remove_var("GUILDPASS__DATABASE__URL");
        env::remove_var("GUILDPASS__PLATFORM__BOT_TOKEN");
        env::remove_var("GUILDPASS__PROVIDERS__STRIPE_SIGNING_SECRET");
        env::remove_var("GUILDPASS__SERVER__PORT");
        env::remove_var("GUILDPASS__SERVER__ENVIRONMENT");
        env::remove_var("GUILDPASS__SYNC__TICK_INTERVAL_SECS");
    }

    #[test]
    fn loads_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/guildpass");
        assert_eq!(config.platform.bot_token, "bot-token");
    }

    #[test]
    fn minimal_config_validates() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.unwrap().validate().is_ok());
    }

    #[test]
    fn server_defaults_apply() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.sweep.batch_limit, 200);
    }

    #[test]
    fn nested_overrides_take_effect() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("GUILDPASS__SYNC__TICK_INTERVAL_SECS", "30");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.sync.tick_interval_secs, 30);
    }
}
