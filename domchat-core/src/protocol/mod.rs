//! Protocol module for LLM request/response structures
//!
//! This module defines the provider-agnostic values exchanged with callers.
//! Provider wire formats live with each provider under `providers/`.

pub mod types;

pub use types::{AiCallResult, AiRequest, ConversationTurn, Sender, StreamUpdate};
