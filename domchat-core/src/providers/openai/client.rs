//! OpenAI provider implementation

use super::converter::{from_openai_response, to_openai_request};
use super::streaming::OpenAIStreamParser;
use super::types::OpenAIResponse;
use crate::config::ProviderConfig;
use crate::http::ProviderRequest;
use crate::protocol::{AiCallResult, AiRequest};
use crate::providers::adapter::join_url;
use crate::providers::{Provider, ProviderError, ProviderResult, ProviderType};
use crate::stream::StreamFraming;
use serde_json::Value;

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// OpenAI provider implementation
#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    base_url: String,
    include_usage: bool,
}

impl Default for OpenAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenAIProvider {
    /// Create a provider for the public endpoint
    pub fn new() -> Self {
        Self {
            base_url: ProviderType::OpenAI.default_base_url().to_string(),
            include_usage: true,
        }
    }

    /// Create a provider from its configuration entry
    pub fn from_config(config: &ProviderConfig) -> Self {
        let mut provider = Self::new();
        if let Some(base_url) = &config.base_url {
            provider.base_url = base_url.clone();
        }
        if let Some(include_usage) = config.include_usage {
            provider.include_usage = include_usage;
        }
        provider
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Whether streamed requests ask for a final usage chunk
    pub fn with_include_usage(mut self, include_usage: bool) -> Self {
        self.include_usage = include_usage;
        self
    }
}

impl Provider for OpenAIProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::OpenAI
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request(&self, request: &AiRequest) -> ProviderRequest {
        let body = to_openai_request(request, self.include_usage);

        ProviderRequest::post(
            join_url(&self.base_url, CHAT_COMPLETIONS_PATH),
            serde_json::json!(body),
        )
        .with_header(
            "Authorization",
            format!("Bearer {}", request.api_key.expose_secret()),
        )
    }

    fn framing(&self) -> Option<StreamFraming> {
        Some(StreamFraming::Sse(Box::new(OpenAIStreamParser)))
    }

    fn parse_response(&self, body: Value) -> ProviderResult<AiCallResult> {
        let response: OpenAIResponse =
            serde_json::from_value(body).map_err(|e| ProviderError::InvalidResponse {
                provider: ProviderType::OpenAI,
                message: e.to_string(),
            })?;
        Ok(from_openai_response(response))
    }
}
