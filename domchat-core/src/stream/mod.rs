//! Incremental decoding of provider streaming responses
//!
//! Each provider frames its stream differently (SSE events or a bracketed
//! JSON array of objects). A [`StreamFraming`] turns the raw response body
//! into uniform [`StreamEvent`]s, regardless of where the transport happened
//! to split the bytes.

pub mod json_array;
pub mod sse;
pub mod usage;

pub use json_array::{JsonArrayDecoder, JsonObjectScanner};
pub use sse::sse_events;
pub use usage::{UsageAccumulator, UsagePolicy};

use crate::http::ByteStream;
use crate::providers::{ProviderResult, ProviderType};
use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;

/// Decoded events of one response body
pub type EventStream = Pin<Box<dyn Stream<Item = ProviderResult<StreamEvent>> + Send>>;

/// A normalized event produced by a frame decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A fragment of generated text
    Delta { text: String },

    /// A usage report; absent fields were not part of this report
    UsageUpdate {
        input_tokens: Option<u64>,
        output_tokens: Option<u64>,
    },

    /// The provider signalled the end of the response
    Done,
}

impl StreamEvent {
    pub fn delta(text: impl Into<String>) -> Self {
        StreamEvent::Delta { text: text.into() }
    }

    pub fn usage(input_tokens: Option<u64>, output_tokens: Option<u64>) -> Self {
        StreamEvent::UsageUpdate {
            input_tokens,
            output_tokens,
        }
    }

    /// The text of a `Delta`, if this is one
    pub fn as_delta(&self) -> Option<&str> {
        match self {
            StreamEvent::Delta { text } => Some(text),
            _ => None,
        }
    }
}

/// How a provider frames its streamed body
pub enum StreamFraming {
    /// Server-sent events; each event's `data` is one payload
    Sse(Box<dyn PayloadParser>),
    /// No delimiters; the decoder finds frames in raw chunks
    Chunked(Box<dyn FrameDecoder>),
}

impl StreamFraming {
    pub fn usage_policy(&self) -> UsagePolicy {
        match self {
            StreamFraming::Sse(parser) => parser.usage_policy(),
            StreamFraming::Chunked(decoder) => decoder.usage_policy(),
        }
    }

    /// Decode `body` into events; the stream ends after `Done`
    pub fn decode(self, provider: ProviderType, body: ByteStream) -> EventStream {
        match self {
            StreamFraming::Sse(parser) => sse_events(provider, body, parser),
            StreamFraming::Chunked(decoder) => chunked_events(body, decoder),
        }
    }
}

/// Per-provider stream framing state machine for undelimited bodies
///
/// A decoder is owned by exactly one call. Once [`is_closed`](Self::is_closed)
/// returns true, further input is ignored.
pub trait FrameDecoder: Send {
    /// Feed the next transport chunk
    fn decode(&mut self, chunk: &[u8]) -> Vec<StreamEvent>;

    /// Signal end of transport; flushes or discards buffered data
    fn finish(&mut self) -> Vec<StreamEvent>;

    fn is_closed(&self) -> bool;

    /// How this provider's usage reports combine
    fn usage_policy(&self) -> UsagePolicy;
}

/// Provider-specific interpretation of one complete frame payload
///
/// For SSE providers the payload is an event's `data`; for bracketed JSON
/// arrays it is one top-level object.
pub trait PayloadParser: Send {
    /// Provider name used in log messages
    fn name(&self) -> &'static str;

    /// How usage reports from this provider combine
    fn usage_policy(&self) -> UsagePolicy;

    /// Turn one payload into events. A `Done` event closes the stream.
    fn parse(&mut self, payload: &[u8]) -> Result<Vec<StreamEvent>, serde_json::Error>;
}

/// Receives text fragments as soon as they are decoded
pub trait DeltaSink: Send {
    fn on_delta(&mut self, fragment: &str);
}

impl<F> DeltaSink for F
where
    F: FnMut(&str) + Send,
{
    fn on_delta(&mut self, fragment: &str) {
        self(fragment)
    }
}

struct ChunkedState {
    body: ByteStream,
    decoder: Box<dyn FrameDecoder>,
    pending: VecDeque<StreamEvent>,
    finished: bool,
}

/// Feed body chunks to `decoder` as they arrive
///
/// The body is not polled again once the decoder closes.
pub fn chunked_events(body: ByteStream, decoder: Box<dyn FrameDecoder>) -> EventStream {
    let state = ChunkedState {
        body,
        decoder,
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((Ok(event), state));
            }
            if state.finished {
                return None;
            }
            if state.decoder.is_closed() {
                state.finished = true;
                continue;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => state.pending.extend(state.decoder.decode(&chunk)),
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(e), state));
                }
                None => {
                    state.pending.extend(state.decoder.finish());
                    state.finished = true;
                }
            }
        }
    }))
}

/// Run a whole sequence of chunks through a decoder, then finish it
///
/// Stops feeding as soon as the decoder closes, mirroring how a live call
/// stops reading the body.
pub fn decode_all<'a, I>(decoder: &mut dyn FrameDecoder, chunks: I) -> Vec<StreamEvent>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut events = Vec::new();
    for chunk in chunks {
        if decoder.is_closed() {
            break;
        }
        events.extend(decoder.decode(chunk));
    }
    events.extend(decoder.finish());
    events
}

/// Concatenated text of every `Delta` in `events`
pub fn collect_text(events: &[StreamEvent]) -> String {
    events.iter().filter_map(StreamEvent::as_delta).collect()
}
