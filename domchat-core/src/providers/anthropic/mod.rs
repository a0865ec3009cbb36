//! Anthropic provider implementation
//!
//! Implements the Provider trait for Anthropic's Claude Messages API.

mod client;
pub mod streaming;
pub mod types;

pub use client::{AnthropicProvider, DEFAULT_API_VERSION, DEFAULT_MAX_TOKENS};
pub use streaming::AnthropicStreamParser;
