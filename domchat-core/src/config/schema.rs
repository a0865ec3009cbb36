//! Configuration schema structures with serde support

use super::error::{ValidationError, ValidationErrorKind};
use super::secrets::SecretString;
use crate::providers::ProviderType;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// The only schema version this crate understands
pub const CONFIG_VERSION: &str = "0.1";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DomchatConfig {
    /// Schema version (required - no default)
    pub version: String,

    /// Provider credentials and endpoints
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    /// Global connection settings
    #[serde(default)]
    pub connection: ConnectionConfig,
}

/// Per-provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Which backend this entry configures
    #[serde(rename = "type")]
    pub provider_type: ProviderType,

    /// API key (supports environment variable interpolation)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<SecretString>,

    /// Overrides the provider's public endpoint (scheme + host, no path)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Response length ceiling; only Anthropic requires one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Anthropic `anthropic-version` header value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    /// Ask OpenAI to report usage on the final stream chunk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_usage: Option<bool>,

    /// Extra models offered for this provider
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<ModelEntry>,

    /// Whether this provider is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// A model declared in configuration, priced per million tokens
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelEntry {
    pub name: String,

    #[serde(default)]
    pub input_price: f64,

    #[serde(default)]
    pub output_price: f64,
}

/// Connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Timeout for non-streaming requests in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Maximum idle connections per host
    #[serde(default = "default_max_idle")]
    pub max_idle_per_host: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout(),
            request_timeout_ms: default_request_timeout(),
            max_idle_per_host: default_max_idle(),
        }
    }
}

impl ConnectionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

// Default value functions for serde
fn default_true() -> bool { true }
fn default_connect_timeout() -> u64 { 10_000 }
fn default_request_timeout() -> u64 { 60_000 }
fn default_max_idle() -> usize { 10 }

impl DomchatConfig {
    /// An empty configuration at the current schema version
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            providers: Vec::new(),
            connection: ConnectionConfig::default(),
        }
    }

    /// The enabled entry for a provider, if any
    pub fn provider(&self, provider_type: ProviderType) -> Option<&ProviderConfig> {
        self.providers
            .iter()
            .find(|p| p.enabled && p.provider_type == provider_type)
    }

    /// The configured API key for a provider, if any
    pub fn api_key(&self, provider_type: ProviderType) -> Option<&SecretString> {
        self.provider(provider_type).and_then(|p| p.api_key.as_ref())
    }

    /// The configured base URL for a provider, falling back to its public endpoint
    pub fn base_url(&self, provider_type: ProviderType) -> &str {
        self.provider(provider_type)
            .and_then(|p| p.base_url.as_deref())
            .unwrap_or_else(|| provider_type.default_base_url())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.version.is_empty() {
            return Err(ValidationError::required("version"));
        }

        if self.version != CONFIG_VERSION {
            return Err(ValidationError::new(
                "version",
                ValidationErrorKind::InvalidVersion {
                    expected: CONFIG_VERSION.to_string(),
                    actual: self.version.clone(),
                },
            ));
        }

        let mut seen_types = HashSet::new();
        for (i, provider) in self.providers.iter().enumerate() {
            if !seen_types.insert(provider.provider_type) {
                return Err(ValidationError::new(
                    format!("providers[{}].type", i),
                    ValidationErrorKind::DuplicateValue {
                        value: provider.provider_type.to_string(),
                    },
                ));
            }
            provider.validate(&format!("providers[{}]", i))?;
        }

        if self.connection.connect_timeout_ms == 0 {
            return Err(ValidationError::out_of_range(
                "connection.connect_timeout_ms",
                "Must be greater than 0",
            ));
        }

        if self.connection.request_timeout_ms == 0 {
            return Err(ValidationError::out_of_range(
                "connection.request_timeout_ms",
                "Must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Default for DomchatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderConfig {
    /// A minimal enabled entry for a provider
    pub fn new(provider_type: ProviderType) -> Self {
        Self {
            provider_type,
            api_key: None,
            base_url: None,
            max_tokens: None,
            api_version: None,
            include_usage: None,
            models: Vec::new(),
            enabled: true,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<SecretString>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Validate provider configuration
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.enabled && self.provider_type.requires_api_key() {
            let missing = self.api_key.as_ref().map_or(true, SecretString::is_empty);
            if missing {
                return Err(ValidationError::required(format!("{}.api_key", path))
                    .with_context(format!("{} requires an API key", self.provider_type)));
            }
        }

        if let Some(base_url) = &self.base_url {
            match url::Url::parse(base_url) {
                Ok(url) => {
                    if url.scheme() != "http" && url.scheme() != "https" {
                        return Err(ValidationError::new(
                            format!("{}.base_url", path),
                            ValidationErrorKind::InvalidUrl {
                                message: format!(
                                    "URL scheme must be http or https, got: {}",
                                    url.scheme()
                                ),
                            },
                        ));
                    }
                }
                Err(e) => {
                    return Err(ValidationError::new(
                        format!("{}.base_url", path),
                        ValidationErrorKind::InvalidUrl {
                            message: e.to_string(),
                        },
                    ));
                }
            }
        }

        if self.max_tokens == Some(0) {
            return Err(ValidationError::out_of_range(
                format!("{}.max_tokens", path),
                "Must be greater than 0",
            ));
        }

        let mut seen_models = HashSet::new();
        for (i, model) in self.models.iter().enumerate() {
            let model_path = format!("{}.models[{}]", path, i);
            if model.name.is_empty() {
                return Err(ValidationError::required(format!("{}.name", model_path)));
            }
            if !seen_models.insert(model.name.as_str()) {
                return Err(ValidationError::new(
                    format!("{}.name", model_path),
                    ValidationErrorKind::DuplicateValue {
                        value: model.name.clone(),
                    },
                ));
            }
            model.validate(&model_path)?;
        }

        Ok(())
    }
}

impl ModelEntry {
    /// Validate model pricing
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if !self.input_price.is_finite() || self.input_price < 0.0 {
            return Err(ValidationError::out_of_range(
                format!("{}.input_price", path),
                "Must be a non-negative number",
            ));
        }
        if !self.output_price.is_finite() || self.output_price < 0.0 {
            return Err(ValidationError::out_of_range(
                format!("{}.output_price", path),
                "Must be a non-negative number",
            ));
        }
        Ok(())
    }
}
