//! Known models and their prices
//!
//! Prices are US dollars per million tokens. The built-in list covers the
//! hosted providers; local Ollama models are discovered at runtime and are
//! free; configuration may add more.

use crate::config::{ConfigError, ConfigResult, DomchatConfig};
use crate::providers::ProviderType;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

const TOKENS_PER_PRICE_UNIT: f64 = 1_000_000.0;

/// A selectable model with its pricing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    #[serde(rename = "type")]
    pub provider: ProviderType,
    pub name: String,
    pub input_price: f64,
    pub output_price: f64,
}

impl ModelDescriptor {
    pub fn new(
        provider: ProviderType,
        name: impl Into<String>,
        input_price: f64,
        output_price: f64,
    ) -> Self {
        Self {
            provider,
            name: name.into(),
            input_price,
            output_price,
        }
    }

    /// A locally hosted model, which costs nothing to run
    pub fn local(name: impl Into<String>) -> Self {
        Self::new(ProviderType::Ollama, name, 0.0, 0.0)
    }

    /// Dollar cost of a call with the given token counts
    pub fn price(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (self.input_price * input_tokens as f64 + self.output_price * output_tokens as f64)
            / TOKENS_PER_PRICE_UNIT
    }

    pub fn is_free(&self) -> bool {
        self.input_price == 0.0 && self.output_price == 0.0
    }

    /// Opaque string form for persisting the selected model
    pub fn to_token(&self) -> ConfigResult<String> {
        let json = serde_json::to_vec(self).map_err(|e| ConfigError::InvalidModelToken {
            message: e.to_string(),
        })?;
        Ok(STANDARD.encode(json))
    }

    /// Restore a model from [`to_token`](Self::to_token) output
    pub fn from_token(token: &str) -> ConfigResult<Self> {
        let json = STANDARD
            .decode(token.trim())
            .map_err(|e| ConfigError::InvalidModelToken {
                message: format!("not base64: {}", e),
            })?;
        serde_json::from_slice(&json).map_err(|e| ConfigError::InvalidModelToken {
            message: format!("not a model description: {}", e),
        })
    }
}

/// Built-in hosted models: (provider, name, input price, output price)
const BUILTIN_MODELS: &[(ProviderType, &str, f64, f64)] = &[
    (ProviderType::OpenAI, "gpt-4o-mini", 0.15, 0.6),
    (ProviderType::OpenAI, "gpt-3.5-turbo", 2.0, 2.0),
    (ProviderType::OpenAI, "gpt-4o", 5.0, 15.0),
    (ProviderType::OpenAI, "o1-mini", 7.5, 30.0),
    (ProviderType::OpenAI, "o1-preview", 15.0, 60.0),
    (ProviderType::Gemini, "gemini-2.0-flash", 0.1, 0.4),
    (ProviderType::Gemini, "gemini-2.0-flash-lite", 0.075, 0.3),
    (ProviderType::Gemini, "gemini-1.5-pro", 0.3125, 5.0),
    (ProviderType::Gemini, "gemini-1.5-flash", 0.075, 0.3),
    (ProviderType::Anthropic, "claude-3-5-haiku-20241022", 0.25, 1.25),
    (ProviderType::Anthropic, "claude-3-5-sonnet-20241022", 3.0, 15.0),
    (ProviderType::Anthropic, "claude-3-opus-20240229", 15.0, 75.0),
];

/// Ordered list of selectable models
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    models: Vec<ModelDescriptor>,
}

impl ModelCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The hosted models this crate knows prices for
    pub fn builtin() -> Self {
        let models = BUILTIN_MODELS
            .iter()
            .map(|&(provider, name, input, output)| ModelDescriptor::new(provider, name, input, output))
            .collect();
        Self { models }
    }

    /// Add models, skipping any provider/name pair already present
    pub fn extend<I>(&mut self, models: I)
    where
        I: IntoIterator<Item = ModelDescriptor>,
    {
        for model in models {
            if self.find(model.provider, &model.name).is_none() {
                self.models.push(model);
            }
        }
    }

    /// Append models discovered on a local Ollama
    pub fn with_local_models(mut self, models: Vec<ModelDescriptor>) -> Self {
        self.extend(models);
        self
    }

    /// Append models declared for enabled providers in configuration
    pub fn with_config(mut self, config: &DomchatConfig) -> Self {
        let declared: Vec<ModelDescriptor> = config
            .providers
            .iter()
            .filter(|p| p.enabled)
            .flat_map(|p| {
                p.models.iter().map(move |m| {
                    ModelDescriptor::new(p.provider_type, m.name.clone(), m.input_price, m.output_price)
                })
            })
            .collect();
        self.extend(declared);
        self
    }

    pub fn find(&self, provider: ProviderType, name: &str) -> Option<&ModelDescriptor> {
        self.models
            .iter()
            .find(|m| m.provider == provider && m.name == name)
    }

    pub fn by_provider(&self, provider: ProviderType) -> impl Iterator<Item = &ModelDescriptor> {
        self.models.iter().filter(move |m| m.provider == provider)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.models.iter()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
