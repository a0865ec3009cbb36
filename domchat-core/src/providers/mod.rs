//! Provider abstraction and concrete LLM backends
//!
//! Each backend implements [`Provider`]: it shapes requests, supplies a frame
//! decoder for its streaming format and reads complete bodies. The
//! [`ModelApiDispatcher`] picks the backend a request names and runs the call
//! through a [`StreamingCallAdapter`].

pub mod adapter;
pub mod anthropic;
pub mod call;
pub mod dispatcher;
pub mod error;
pub mod gemini;
pub mod ollama;
pub mod openai;

pub use adapter::{Provider, ProviderType};
pub use call::StreamingCallAdapter;
pub use dispatcher::ModelApiDispatcher;
pub use error::{ProviderError, ProviderResult};

// Re-export concrete providers
pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAIProvider;
