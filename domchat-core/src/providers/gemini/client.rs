//! Gemini provider implementation
//!
//! Gemini authenticates with a `key` query parameter instead of a header,
//! so request URLs carry the credential and must be redacted when logged.

use super::streaming::{self, response_events};
use super::types::{GeminiContent, GeminiPart, GeminiRequest, GeminiResponse};
use crate::config::ProviderConfig;
use crate::http::ProviderRequest;
use crate::protocol::{AiCallResult, AiRequest, Sender};
use crate::providers::adapter::join_url;
use crate::providers::{Provider, ProviderError, ProviderResult, ProviderType};
use crate::stream::{StreamFraming, UsageAccumulator, UsagePolicy};
use serde_json::Value;

/// Gemini provider implementation
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    base_url: String,
}

impl Default for GeminiProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl GeminiProvider {
    pub fn new() -> Self {
        Self {
            base_url: ProviderType::Gemini.default_base_url().to_string(),
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        let mut provider = Self::new();
        if let Some(base_url) = &config.base_url {
            provider.base_url = base_url.clone();
        }
        provider
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self, request: &AiRequest) -> String {
        let method = if request.stream {
            "streamGenerateContent"
        } else {
            "generateContent"
        };
        let path = format!("/v1beta/models/{}:{}", request.model, method);

        let mut url = join_url(&self.base_url, &path);
        url.push_str("?key=");
        url.extend(url::form_urlencoded::byte_serialize(
            request.api_key.expose_secret().as_bytes(),
        ));
        url
    }
}

fn text_content(role: &str, text: &str) -> GeminiContent {
    GeminiContent {
        role: Some(role.to_string()),
        parts: vec![GeminiPart {
            text: Some(text.to_string()),
        }],
    }
}

impl Provider for GeminiProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Gemini
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request(&self, request: &AiRequest) -> ProviderRequest {
        let mut contents = Vec::with_capacity(request.history.len() + 1);
        contents.push(text_content("user", &request.prompt));
        contents.extend(request.history.iter().map(|turn| {
            let role = match turn.sender {
                Sender::User => "user",
                Sender::AI => "model",
            };
            text_content(role, &turn.text)
        }));

        ProviderRequest::post(self.endpoint(request), serde_json::json!(GeminiRequest { contents }))
    }

    fn framing(&self) -> Option<StreamFraming> {
        Some(StreamFraming::Chunked(Box::new(streaming::decoder())))
    }

    fn parse_response(&self, body: Value) -> ProviderResult<AiCallResult> {
        let response: GeminiResponse =
            serde_json::from_value(body).map_err(|e| ProviderError::InvalidResponse {
                provider: ProviderType::Gemini,
                message: e.to_string(),
            })?;

        let mut content = String::new();
        let mut usage = UsageAccumulator::new(UsagePolicy::Replace);
        for event in response_events(&response) {
            if let Some(text) = event.as_delta() {
                content.push_str(text);
            }
            usage.record(&event);
        }

        let (input_tokens, output_tokens) = usage.finalize();
        Ok(AiCallResult::new(content, input_tokens, output_tokens))
    }
}
