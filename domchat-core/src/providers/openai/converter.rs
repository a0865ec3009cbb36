//! Conversion between Domchat protocol values and OpenAI format

use super::types::*;
use crate::protocol::{AiCallResult, AiRequest, Sender};
use crate::stream::StreamEvent;

/// Build the chat completions body: the prompt as a system message, then
/// the history in order
pub fn to_openai_request(request: &AiRequest, include_usage: bool) -> OpenAIRequest {
    let mut messages = Vec::with_capacity(request.history.len() + 1);
    messages.push(OpenAIMessage {
        role: "system".to_string(),
        content: request.prompt.clone(),
    });
    messages.extend(request.history.iter().map(|turn| OpenAIMessage {
        role: openai_role(turn.sender).to_string(),
        content: turn.text.clone(),
    }));

    OpenAIRequest {
        model: request.model.clone(),
        stream: request.stream,
        messages,
        stream_options: (request.stream && include_usage)
            .then_some(OpenAIStreamOptions { include_usage: true }),
    }
}

fn openai_role(sender: Sender) -> &'static str {
    match sender {
        Sender::User => "user",
        Sender::AI => "assistant",
    }
}

/// Convert a complete OpenAI response
pub fn from_openai_response(response: OpenAIResponse) -> AiCallResult {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();

    let (input_tokens, output_tokens) = response
        .usage
        .map(|u| (u.prompt_tokens, u.completion_tokens))
        .unwrap_or((None, None));

    AiCallResult::new(content, input_tokens, output_tokens)
}

/// Convert one streaming chunk to events
pub fn from_openai_stream_chunk(chunk: OpenAIStreamChunk) -> Vec<StreamEvent> {
    let mut events = Vec::new();

    for choice in chunk.choices {
        if let Some(content) = choice.delta.content {
            if !content.is_empty() {
                events.push(StreamEvent::Delta { text: content });
            }
        }
    }

    if let Some(usage) = chunk.usage {
        events.push(StreamEvent::usage(usage.prompt_tokens, usage.completion_tokens));
    }

    events
}
