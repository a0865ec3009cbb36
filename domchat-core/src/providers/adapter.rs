//! Provider adapter trait and provider identities
//!
//! A [`Provider`] knows how to shape a request for one backend, how to decode
//! that backend's streaming framing, and how to read its complete JSON body.
//! It holds endpoint settings only; credentials travel with each request.

use super::error::{ProviderError, ProviderResult};
use crate::http::ProviderRequest;
use crate::protocol::types::{AiCallResult, AiRequest};
use crate::stream::StreamFraming;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Core provider trait that all LLM backends implement
pub trait Provider: Send + Sync {
    fn provider_type(&self) -> ProviderType;

    /// Get the provider's name
    fn name(&self) -> &str {
        self.provider_type().as_str()
    }

    /// Scheme and host requests are sent to
    fn base_url(&self) -> &str;

    /// Build the HTTP request for a call
    fn build_request(&self, request: &AiRequest) -> ProviderRequest;

    /// Fresh framing state for one streamed response, or `None` when the
    /// provider only ever answers with a complete body
    fn framing(&self) -> Option<StreamFraming>;

    /// Read a complete (non-streamed) response body
    fn parse_response(&self, body: Value) -> ProviderResult<AiCallResult>;
}

/// The closed set of supported backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    OpenAI,
    Anthropic,
    Gemini,
    Ollama,
}

impl ProviderType {
    pub const ALL: [ProviderType; 4] = [
        ProviderType::OpenAI,
        ProviderType::Anthropic,
        ProviderType::Gemini,
        ProviderType::Ollama,
    ];

    /// Tag used in configuration, persisted model tokens and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::OpenAI => "openai",
            ProviderType::Anthropic => "anthropic",
            ProviderType::Gemini => "gemini",
            ProviderType::Ollama => "ollama",
        }
    }

    /// Local Ollama is the only backend that runs without a key
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, ProviderType::Ollama)
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderType::OpenAI => "https://api.openai.com",
            ProviderType::Anthropic => "https://api.anthropic.com",
            ProviderType::Gemini => "https://generativelanguage.googleapis.com",
            ProviderType::Ollama => "http://localhost:11434",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderType::OpenAI),
            "anthropic" => Ok(ProviderType::Anthropic),
            "gemini" => Ok(ProviderType::Gemini),
            "ollama" => Ok(ProviderType::Ollama),
            _ => Err(ProviderError::UnsupportedProvider(s.to_string())),
        }
    }
}

/// Join a base URL and an absolute path without doubling the slash
pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}
