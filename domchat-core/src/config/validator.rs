//! Configuration validation utilities

use super::env::env_var_pattern;
use super::error::{ValidationError, ValidationErrorKind};
use super::schema::DomchatConfig;

/// Configuration validator with additional validation rules
#[derive(Debug, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Create a new validator
    pub fn new() -> Self {
        Self
    }

    /// Validate a configuration with extended rules
    pub fn validate(&self, config: &DomchatConfig) -> Result<(), ValidationError> {
        config.validate()?;
        self.validate_placeholders_resolved(config)?;
        self.validate_enabled_providers(config)?;
        Ok(())
    }

    /// A placeholder that survived interpolation would be sent verbatim as a key
    fn validate_placeholders_resolved(&self, config: &DomchatConfig) -> Result<(), ValidationError> {
        for (i, provider) in config.providers.iter().enumerate() {
            if let Some(api_key) = &provider.api_key {
                if let Some(found) = env_var_pattern().find(api_key.expose_secret()) {
                    return Err(ValidationError::new(
                        format!("providers[{}].api_key", i),
                        ValidationErrorKind::UnresolvedPlaceholder {
                            placeholder: found.as_str().to_string(),
                        },
                    ));
                }
            }
            if let Some(base_url) = &provider.base_url {
                if let Some(found) = env_var_pattern().find(base_url) {
                    return Err(ValidationError::new(
                        format!("providers[{}].base_url", i),
                        ValidationErrorKind::UnresolvedPlaceholder {
                            placeholder: found.as_str().to_string(),
                        },
                    ));
                }
            }
        }
        Ok(())
    }

    fn validate_enabled_providers(&self, config: &DomchatConfig) -> Result<(), ValidationError> {
        if !config.providers.is_empty() && config.providers.iter().all(|p| !p.enabled) {
            return Err(ValidationError::required("providers")
                .with_context("At least one provider must be enabled"));
        }
        Ok(())
    }
}
