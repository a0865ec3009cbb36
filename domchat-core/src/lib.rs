//! Domchat Core Library
//!
//! Sends a captured page and a question to a hosted or local LLM and streams
//! the answer back. Every backend's wire format is decoded incrementally into
//! the same sequence of text deltas and token counts.
//!
//! ```no_run
//! use domchat_core::{AiRequest, ModelApiDispatcher, ProviderType};
//!
//! # async fn run() -> Result<(), domchat_core::ProviderError> {
//! let dispatcher = ModelApiDispatcher::new()?;
//! let request = AiRequest::new(ProviderType::OpenAI, "gpt-4o-mini", "Summarize this page")
//!     .with_api_key("sk-...");
//!
//! let mut print = |fragment: &str| print!("{}", fragment);
//! let result = dispatcher.call(&request, &mut print).await?;
//! println!("\n{:?} / {:?} tokens", result.input_tokens, result.output_tokens);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod http;
pub mod protocol;
pub mod providers;
pub mod stream;

pub use catalog::{ModelCatalog, ModelDescriptor};
pub use config::{ConfigError, DomchatConfig};
pub use http::{HttpClient, HttpExecutor};
pub use protocol::{AiCallResult, AiRequest, ConversationTurn, Sender, StreamUpdate};
pub use providers::{
    ModelApiDispatcher, Provider, ProviderError, ProviderResult, ProviderType,
    StreamingCallAdapter,
};
pub use stream::{
    DeltaSink, FrameDecoder, StreamEvent, StreamFraming, UsageAccumulator, UsagePolicy,
};

/// Returns the version of the Domchat Core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
