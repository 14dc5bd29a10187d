//! Community platform configuration

use serde::Deserialize;

use super::error::ValidationError;
use super::Environment;

/// Platform API configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlatformConfig {
    /// Bot token used for every platform API call
    pub bot_token: String,

    /// Override for the platform API base URL (staging, local stub)
    pub api_base_url: Option<String>,
}

impl PlatformConfig {
    /// Validate platform configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.bot_token.is_empty() {
            return Err(ValidationError::MissingRequired("PLATFORM_BOT_TOKEN"));
        }
        if *environment == Environment::Production {
            if let Some(url) = &self.api_base_url {
                if !url.starts_with("https://") {
                    return Err(ValidationError::PlatformUrlMustBeHttps);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_token_is_required() {
        assert!(PlatformConfig::default()
            .validate(&Environment::Development)
            .is_err());
    }

    #[test]
    fn plain_http_override_is_allowed_outside_production() {
        let config = PlatformConfig {
            bot_token: "token".to_string(),
            api_base_url: Some("http://localhost:9999".to_string()),
        };
        assert!(config.validate(&Environment::Development).is_ok());
        assert!(config.validate(&Environment::Production).is_err());
    }
}
