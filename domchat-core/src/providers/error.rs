//! Provider error types and handling

use super::adapter::ProviderType;
use thiserror::Error;

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that can occur when calling an LLM provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No usable API key for a provider that needs one
    #[error("Missing API key for {provider}")]
    MissingApiKey { provider: ProviderType },

    /// Provider tag that names no known backend
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Any other problem with how the call was set up
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The request never produced a response, or the body stream broke
    #[error("Network error talking to {provider}: {message}")]
    Network {
        provider: ProviderType,
        message: String,
    },

    /// Timed out waiting for a non-streaming response
    #[error("Request to {provider} timed out")]
    Timeout { provider: ProviderType },

    /// The provider answered with a non-success status
    #[error("{provider} API request failed with status {status}: {message}")]
    Http {
        provider: ProviderType,
        status: u16,
        message: String,
    },

    /// A successful response whose body could not be understood
    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse {
        provider: ProviderType,
        message: String,
    },
}

impl ProviderError {
    /// HTTP status, for errors the provider itself reported
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether repeating the same call could reasonably succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Network { .. } | ProviderError::Timeout { .. } => true,
            ProviderError::Http { status, .. } => *status == 429 || *status >= 500,
            ProviderError::MissingApiKey { .. }
            | ProviderError::UnsupportedProvider(_)
            | ProviderError::Configuration(_)
            | ProviderError::InvalidResponse { .. } => false,
        }
    }

    /// The provider involved, when known
    pub fn provider(&self) -> Option<ProviderType> {
        match self {
            ProviderError::MissingApiKey { provider }
            | ProviderError::Network { provider, .. }
            | ProviderError::Timeout { provider }
            | ProviderError::Http { provider, .. }
            | ProviderError::InvalidResponse { provider, .. } => Some(*provider),
            ProviderError::UnsupportedProvider(_) | ProviderError::Configuration(_) => None,
        }
    }
}

impl From<crate::config::ConfigError> for ProviderError {
    fn from(err: crate::config::ConfigError) -> Self {
        ProviderError::Configuration(err.to_string())
    }
}
