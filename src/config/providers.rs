//! Payment processor configuration
//!
//! A processor is enabled by configuring its signing secret; the webhook
//! route for a processor with no secret answers 500 until one is set.

use serde::Deserialize;

use super::error::ValidationError;

/// Payment processor signing secrets
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersConfig {
    /// Stripe webhook signing secret (whsec_...)
    pub stripe_signing_secret: Option<String>,

    /// Coinbase Commerce shared webhook secret
    pub coinbase_shared_secret: Option<String>,

    /// Square webhook signature key
    pub square_signature_key: Option<String>,
}

impl ProvidersConfig {
    /// Validate processor configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let configured = [
            self.stripe_signing_secret.as_deref(),
            self.coinbase_shared_secret.as_deref(),
            self.square_signature_key.as_deref(),
        ]
        .iter()
        .any(|s| s.is_some_and(|s| !s.is_empty()));

        if !configured {
            return Err(ValidationError::NoProcessorConfigured);
        }

        if let Some(secret) = &self.stripe_signing_secret {
            if !secret.starts_with("whsec_") {
                return Err(ValidationError::InvalidStripeSigningSecret);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_least_one_processor_is_required() {
        assert!(ProvidersConfig::default().validate().is_err());
    }

    #[test]
    fn single_processor_is_enough() {
        let config = ProvidersConfig {
            coinbase_shared_secret: Some("cb-shared".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn stripe_secret_prefix_is_enforced() {
        let config = ProvidersConfig {
            stripe_signing_secret: Some("sk_test_xxx".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ProvidersConfig {
            stripe_signing_secret: Some("whsec_xxx".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
