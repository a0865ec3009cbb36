//! Streaming support for Anthropic responses
//!
//! Anthropic sends typed envelopes on `data:` lines. Usage arrives in pieces
//! (input tokens on `message_start`, output tokens on `message_delta`), so
//! the reports are summed rather than replaced.

use super::types::{AnthropicDelta, AnthropicStreamEvent, AnthropicUsage};
use crate::stream::{PayloadParser, StreamEvent, UsagePolicy};
use tracing::{debug, error};

#[derive(Debug, Default)]
pub struct AnthropicStreamParser;

fn usage_event(usage: AnthropicUsage) -> StreamEvent {
    StreamEvent::usage(usage.input_tokens, usage.output_tokens)
}

impl PayloadParser for AnthropicStreamParser {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn usage_policy(&self) -> UsagePolicy {
        UsagePolicy::Additive
    }

    fn parse(&mut self, payload: &[u8]) -> Result<Vec<StreamEvent>, serde_json::Error> {
        let event: AnthropicStreamEvent = serde_json::from_slice(payload)?;

        let events = match event {
            AnthropicStreamEvent::MessageStart { message } => {
                message.usage.map(usage_event).into_iter().collect()
            }
            AnthropicStreamEvent::ContentBlockDelta {
                delta: AnthropicDelta::TextDelta { text },
            } if !text.is_empty() => vec![StreamEvent::Delta { text }],
            AnthropicStreamEvent::ContentBlockDelta { .. } => Vec::new(),
            AnthropicStreamEvent::MessageDelta { usage } => {
                usage.map(usage_event).into_iter().collect()
            }
            AnthropicStreamEvent::MessageStop => vec![StreamEvent::Done],
            AnthropicStreamEvent::Error { error } => {
                error!(
                    "Anthropic stream reported {}: {}",
                    error.error_type, error.message
                );
                Vec::new()
            }
            AnthropicStreamEvent::Other => {
                debug!("Ignoring Anthropic stream event");
                Vec::new()
            }
        };

        Ok(events)
    }
}
