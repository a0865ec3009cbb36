//! Streaming support for Gemini responses
//!
//! `streamGenerateContent` without `alt=sse` answers with one JSON array
//! whose elements arrive over time. Each element carries the next piece of
//! text and the usage totals so far.

use super::types::GeminiResponse;
use crate::stream::{JsonArrayDecoder, PayloadParser, StreamEvent, UsagePolicy};

#[derive(Debug, Default)]
pub struct GeminiStreamParser;

/// Events for one response object, streamed or complete
pub(crate) fn response_events(response: &GeminiResponse) -> Vec<StreamEvent> {
    let mut events = Vec::new();

    let text = response.text();
    if !text.is_empty() {
        events.push(StreamEvent::Delta { text });
    }

    if let Some(usage) = &response.usage_metadata {
        events.push(StreamEvent::usage(
            usage.prompt_token_count,
            usage.candidates_token_count,
        ));
    }

    events
}

impl PayloadParser for GeminiStreamParser {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn usage_policy(&self) -> UsagePolicy {
        UsagePolicy::Replace
    }

    fn parse(&mut self, payload: &[u8]) -> Result<Vec<StreamEvent>, serde_json::Error> {
        let response: GeminiResponse = serde_json::from_slice(payload)?;
        Ok(response_events(&response))
    }
}

/// A decoder for one Gemini stream
pub fn decoder() -> JsonArrayDecoder<GeminiStreamParser> {
    JsonArrayDecoder::new(GeminiStreamParser)
}
