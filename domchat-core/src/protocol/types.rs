//! Core protocol types for LLM interactions
//!
//! This module contains the provider-agnostic values that flow through a
//! call: the request a caller builds, the conversation history it carries,
//! the result it gets back, and the update messages sent to a UI.

use crate::catalog::ModelDescriptor;
use crate::config::SecretString;
use crate::providers::ProviderType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a turn of the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    #[serde(rename = "User")]
    User,
    #[serde(rename = "AI")]
    AI,
}

/// One prior exchange in the conversation, oldest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub sender: Sender,
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::AI,
            text: text.into(),
        }
    }
}

/// Everything needed to make one call
///
/// `prompt` is the page payload plus the user's question, already assembled.
#[derive(Debug, Clone)]
pub struct AiRequest {
    pub provider: ProviderType,
    pub model: String,
    pub api_key: SecretString,
    pub prompt: String,
    pub history: Vec<ConversationTurn>,
    /// Request an incremental response where the provider supports one
    pub stream: bool,
}

impl AiRequest {
    /// A streaming request with no history and no key
    pub fn new(provider: ProviderType, model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            api_key: SecretString::default(),
            prompt: prompt.into(),
            history: Vec::new(),
            stream: true,
        }
    }

    /// A request for a catalog model
    pub fn for_model(model: &ModelDescriptor, prompt: impl Into<String>) -> Self {
        Self::new(model.provider, model.name.clone(), prompt)
    }

    pub fn with_api_key(mut self, api_key: impl Into<SecretString>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_history(mut self, history: Vec<ConversationTurn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_turn(mut self, turn: ConversationTurn) -> Self {
        self.history.push(turn);
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

/// Outcome of one completed call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiCallResult {
    /// Every delta of the call, concatenated in order
    pub content: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

impl AiCallResult {
    pub fn new(content: impl Into<String>, input_tokens: Option<u64>, output_tokens: Option<u64>) -> Self {
        Self {
            content: content.into(),
            input_tokens,
            output_tokens,
        }
    }

    /// Dollar cost of the call; unknown unless both token counts were reported
    pub fn cost(&self, model: &ModelDescriptor) -> Option<f64> {
        match (self.input_tokens, self.output_tokens) {
            (Some(input), Some(output)) => Some(model.price(input, output)),
            _ => None,
        }
    }
}

/// Message pushed to a UI while a call runs
///
/// Exactly one `Completed` or `Failed` follows any number of `Chunk`s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum StreamUpdate {
    #[serde(rename = "stream_update")]
    Chunk {
        #[serde(rename = "id")]
        request_id: Uuid,
        #[serde(rename = "chunk")]
        text: String,
    },

    #[serde(rename = "response_result")]
    Completed {
        #[serde(rename = "id")]
        request_id: Uuid,
        result: AiCallResult,
    },

    #[serde(rename = "response_error")]
    Failed {
        #[serde(rename = "id")]
        request_id: Uuid,
        message: String,
    },
}

impl StreamUpdate {
    pub fn request_id(&self) -> Uuid {
        match self {
            StreamUpdate::Chunk { request_id, .. }
            | StreamUpdate::Completed { request_id, .. }
            | StreamUpdate::Failed { request_id, .. } => *request_id,
        }
    }

    /// Whether this is the last message for its request
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamUpdate::Chunk { .. })
    }
}
