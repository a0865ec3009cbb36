//! Streaming support for OpenAI responses

use super::converter::from_openai_stream_chunk;
use super::types::OpenAIStreamChunk;
use crate::stream::{PayloadParser, StreamEvent, UsagePolicy};

/// Terminal sentinel of an OpenAI stream
const DONE_SENTINEL: &[u8] = b"[DONE]";

/// Interprets OpenAI `data:` payloads
///
/// OpenAI sends each chunk as `data: {...json...}`; the last event is
/// `data: [DONE]`.
#[derive(Debug, Default)]
pub struct OpenAIStreamParser;

impl PayloadParser for OpenAIStreamParser {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn usage_policy(&self) -> UsagePolicy {
        UsagePolicy::Replace
    }

    fn parse(&mut self, payload: &[u8]) -> Result<Vec<StreamEvent>, serde_json::Error> {
        if payload == DONE_SENTINEL {
            return Ok(vec![StreamEvent::Done]);
        }
        let chunk: OpenAIStreamChunk = serde_json::from_slice(payload)?;
        Ok(from_openai_stream_chunk(chunk))
    }
}
