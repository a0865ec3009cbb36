//! Provider selection and UI-facing entry points

use super::call::StreamingCallAdapter;
use super::{
    AnthropicProvider, GeminiProvider, OllamaProvider, OpenAIProvider, Provider, ProviderError,
    ProviderResult, ProviderType,
};
use crate::catalog::ModelDescriptor;
use crate::config::DomchatConfig;
use crate::http::{HttpClient, HttpExecutor, RequestOptions};
use crate::protocol::{AiCallResult, AiRequest, StreamUpdate};
use crate::stream::DeltaSink;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};
use uuid::Uuid;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Routes a request to the provider it names
pub struct ModelApiDispatcher<E = HttpClient> {
    http: E,
    openai: OpenAIProvider,
    anthropic: AnthropicProvider,
    gemini: GeminiProvider,
    ollama: OllamaProvider,
    request_timeout: Duration,
}

impl ModelApiDispatcher<HttpClient> {
    /// Dispatcher for the public endpoints with a default HTTP client
    pub fn new() -> ProviderResult<Self> {
        Ok(Self::with_executor(HttpClient::new()?))
    }

    /// Dispatcher using configured endpoints and connection settings
    pub fn from_config(config: &DomchatConfig) -> ProviderResult<Self> {
        let http = HttpClient::from_connection(&config.connection)?;
        let mut dispatcher = Self::with_executor(http);

        if let Some(entry) = config.provider(ProviderType::OpenAI) {
            dispatcher.openai = OpenAIProvider::from_config(entry);
        }
        if let Some(entry) = config.provider(ProviderType::Anthropic) {
            dispatcher.anthropic = AnthropicProvider::from_config(entry);
        }
        if let Some(entry) = config.provider(ProviderType::Gemini) {
            dispatcher.gemini = GeminiProvider::from_config(entry);
        }
        if let Some(entry) = config.provider(ProviderType::Ollama) {
            dispatcher.ollama = OllamaProvider::from_config(entry);
        }
        dispatcher.request_timeout = config.connection.request_timeout();

        Ok(dispatcher)
    }
}

impl<E: HttpExecutor> ModelApiDispatcher<E> {
    /// Dispatcher for the public endpoints over any executor
    pub fn with_executor(http: E) -> Self {
        Self {
            http,
            openai: OpenAIProvider::new(),
            anthropic: AnthropicProvider::new(),
            gemini: GeminiProvider::new(),
            ollama: OllamaProvider::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_openai(mut self, provider: OpenAIProvider) -> Self {
        self.openai = provider;
        self
    }

    pub fn with_anthropic(mut self, provider: AnthropicProvider) -> Self {
        self.anthropic = provider;
        self
    }

    pub fn with_gemini(mut self, provider: GeminiProvider) -> Self {
        self.gemini = provider;
        self
    }

    pub fn with_ollama(mut self, provider: OllamaProvider) -> Self {
        self.ollama = provider;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// The provider serving a provider type
    pub fn provider(&self, provider_type: ProviderType) -> &dyn Provider {
        match provider_type {
            ProviderType::OpenAI => &self.openai,
            ProviderType::Anthropic => &self.anthropic,
            ProviderType::Gemini => &self.gemini,
            ProviderType::Ollama => &self.ollama,
        }
    }

    fn validate(&self, request: &AiRequest) -> ProviderResult<()> {
        if request.provider.requires_api_key() && request.api_key.is_empty() {
            return Err(ProviderError::MissingApiKey {
                provider: request.provider,
            });
        }
        Ok(())
    }

    /// Make one call, forwarding text to `sink` as it arrives
    pub async fn call(
        &self,
        request: &AiRequest,
        sink: &mut dyn DeltaSink,
    ) -> ProviderResult<AiCallResult> {
        self.call_with_id(request, Uuid::new_v4(), sink).await
    }

    async fn call_with_id(
        &self,
        request: &AiRequest,
        request_id: Uuid,
        sink: &mut dyn DeltaSink,
    ) -> ProviderResult<AiCallResult> {
        self.validate(request)?;

        StreamingCallAdapter::new(self.provider(request.provider), &self.http)
            .with_timeout(self.request_timeout)
            .call_with_id(request, request_id, sink)
            .await
    }

    /// Make one call, reporting progress as [`StreamUpdate`] messages
    ///
    /// Sends a `Chunk` per text fragment, then exactly one `Completed` or
    /// `Failed`. A closed receiver does not stop the call.
    pub async fn call_with_updates(
        &self,
        request: &AiRequest,
        updates: &UnboundedSender<StreamUpdate>,
    ) -> ProviderResult<AiCallResult> {
        let request_id = Uuid::new_v4();

        let mut forward = |fragment: &str| {
            let _ = updates.send(StreamUpdate::Chunk {
                request_id,
                text: fragment.to_string(),
            });
        };

        let outcome = self.call_with_id(request, request_id, &mut forward).await;

        let terminal = match &outcome {
            Ok(result) => StreamUpdate::Completed {
                request_id,
                result: result.clone(),
            },
            Err(err) => StreamUpdate::Failed {
                request_id,
                message: err.to_string(),
            },
        };
        if updates.send(terminal).is_err() {
            debug!("Update receiver dropped [request_id: {}]", request_id);
        }

        outcome
    }

    /// Models installed on the local Ollama; empty when it cannot be reached
    pub async fn list_local_models(&self) -> Vec<ModelDescriptor> {
        let request = self.ollama.tags_request();
        let options = RequestOptions::new().with_timeout(self.request_timeout);

        let listed = match self
            .http
            .execute_json(ProviderType::Ollama, &request, &options)
            .await
        {
            Ok(body) => self.ollama.parse_tags(body),
            Err(err) => Err(err),
        };

        match listed {
            Ok(models) => models,
            Err(err) => {
                warn!("Could not list local Ollama models: {}", err);
                Vec::new()
            }
        }
    }
}
