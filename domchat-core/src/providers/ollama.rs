//! Local Ollama provider
//!
//! Ollama is always called without streaming and needs no key. Its generate
//! endpoint takes a single prompt string, so history is rendered into it.

use crate::catalog::ModelDescriptor;
use crate::config::ProviderConfig;
use crate::http::ProviderRequest;
use crate::protocol::{AiCallResult, AiRequest, ConversationTurn, Sender};
use crate::providers::adapter::join_url;
use crate::providers::{Provider, ProviderError, ProviderResult, ProviderType};
use crate::stream::StreamFraming;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const GENERATE_PATH: &str = "/api/generate";
const TAGS_PATH: &str = "/api/tags";

#[derive(Debug, Serialize)]
pub struct OllamaGenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
pub struct OllamaGenerateResponse {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct OllamaTagsResponse {
    #[serde(default)]
    pub models: Vec<OllamaModelTag>,
}

#[derive(Debug, Deserialize)]
pub struct OllamaModelTag {
    pub name: String,
}

/// Ollama provider implementation
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    base_url: String,
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl OllamaProvider {
    pub fn new() -> Self {
        Self {
            base_url: ProviderType::Ollama.default_base_url().to_string(),
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

    /// Request listing the locally installed models
    pub fn tags_request(&self) -> ProviderRequest {
        ProviderRequest::get(join_url(&self.base_url, TAGS_PATH))
    }

    /// Installed models as free catalog entries
    pub fn parse_tags(&self, body: Value) -> ProviderResult<Vec<ModelDescriptor>> {
        let tags: OllamaTagsResponse =
            serde_json::from_value(body).map_err(|e| ProviderError::InvalidResponse {
                provider: ProviderType::Ollama,
                message: e.to_string(),
            })?;
        Ok(tags
            .models
            .into_iter()
            .map(|tag| ModelDescriptor::local(tag.name))
            .collect())
    }
}

/// Prompt followed by the conversation so far, one block per turn
pub fn render_prompt(prompt: &str, history: &[ConversationTurn]) -> String {
    let rendered: Vec<String> = history
        .iter()
        .map(|turn| {
            let speaker = match turn.sender {
                Sender::User => "User",
                Sender::AI => "Assistant",
            };
            format!("{}: {}", speaker, turn.text)
        })
        .collect();

    format!("{}\n\n{}", prompt, rendered.join("\n\n"))
}

impl Provider for OllamaProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Ollama
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request(&self, request: &AiRequest) -> ProviderRequest {
        let body = OllamaGenerateRequest {
            model: request.model.clone(),
            prompt: render_prompt(&request.prompt, &request.history),
            stream: false,
        };
        ProviderRequest::post(join_url(&self.base_url, GENERATE_PATH), serde_json::json!(body))
    }

    fn framing(&self) -> Option<StreamFraming> {
        None
    }

    fn parse_response(&self, body: Value) -> ProviderResult<AiCallResult> {
        let response: OllamaGenerateResponse =
            serde_json::from_value(body).map_err(|e| ProviderError::InvalidResponse {
                provider: ProviderType::Ollama,
                message: e.to_string(),
            })?;
        Ok(AiCallResult::new(
            response.response,
            response.prompt_eval_count,
            response.eval_count,
        ))
    }
}
