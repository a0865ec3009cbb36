//! Google Gemini provider implementation

mod client;
pub mod streaming;
pub mod types;

pub use client::GeminiProvider;
pub use streaming::GeminiStreamParser;
