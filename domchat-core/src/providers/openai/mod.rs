//! OpenAI provider implementation
//!
//! This module provides an adapter for the OpenAI chat completions API,
//! translating between Domchat's protocol values and OpenAI's format.

mod client;
pub mod converter;
pub mod streaming;
pub mod types;

pub use client::OpenAIProvider;
pub use streaming::OpenAIStreamParser;
pub use types::{OpenAIRequest, OpenAIResponse, OpenAIStreamChunk};
