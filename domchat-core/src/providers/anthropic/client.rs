//! Anthropic provider implementation
//!
//! The prompt goes in the top-level `system` field; the Messages API has no
//! system role in `messages`.

use super::streaming::AnthropicStreamParser;
use super::types::{AnthropicContentBlock, AnthropicMessage, AnthropicRequest, AnthropicResponse};
use crate::config::ProviderConfig;
use crate::http::ProviderRequest;
use crate::protocol::{AiCallResult, AiRequest, Sender};
use crate::providers::adapter::join_url;
use crate::providers::{Provider, ProviderError, ProviderResult, ProviderType};
use crate::stream::StreamFraming;
use serde_json::Value;

const MESSAGES_PATH: &str = "/v1/messages";

pub const DEFAULT_API_VERSION: &str = "2023-06-01";

pub const DEFAULT_MAX_TOKENS: u32 = 300;

/// Anthropic provider implementation
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    base_url: String,
    api_version: String,
    max_tokens: u32,
}

impl Default for AnthropicProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AnthropicProvider {
    /// Create a new Anthropic provider
    pub fn new() -> Self {
        Self {
            base_url: ProviderType::Anthropic.default_base_url().to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        let mut provider = Self::new();
        if let Some(base_url) = &config.base_url {
            provider.base_url = base_url.clone();
        }
        if let Some(api_version) = &config.api_version {
            provider.api_version = api_version.clone();
        }
        if let Some(max_tokens) = config.max_tokens {
            provider.max_tokens = max_tokens;
        }
        provider
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// Convert history to Anthropic format
    fn convert_messages(&self, request: &AiRequest) -> Vec<AnthropicMessage> {
        request
            .history
            .iter()
            .map(|turn| AnthropicMessage {
                role: match turn.sender {
                    Sender::User => "user",
                    Sender::AI => "assistant",
                }
                .to_string(),
                content: turn.text.clone(),
            })
            .collect()
    }
}

impl Provider for AnthropicProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Anthropic
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request(&self, request: &AiRequest) -> ProviderRequest {
        let body = AnthropicRequest {
            model: request.model.clone(),
            system: request.prompt.clone(),
            messages: self.convert_messages(request),
            max_tokens: self.max_tokens,
            stream: request.stream,
        };

        ProviderRequest::post(join_url(&self.base_url, MESSAGES_PATH), serde_json::json!(body))
            .with_header("x-api-key", request.api_key.expose_secret())
            .with_header("anthropic-version", self.api_version.as_str())
    }

    fn framing(&self) -> Option<StreamFraming> {
        Some(StreamFraming::Sse(Box::new(AnthropicStreamParser)))
    }

    fn parse_response(&self, body: Value) -> ProviderResult<AiCallResult> {
        let response: AnthropicResponse =
            serde_json::from_value(body).map_err(|e| ProviderError::InvalidResponse {
                provider: ProviderType::Anthropic,
                message: e.to_string(),
            })?;

        let content: String = response
            .content
            .into_iter()
            .filter_map(|block| match block {
                AnthropicContentBlock::Text { text } => Some(text),
                AnthropicContentBlock::Other => None,
            })
            .collect();

        let usage = response.usage.unwrap_or_default();
        Ok(AiCallResult::new(content, usage.input_tokens, usage.output_tokens))
    }
}
