//! Server-Sent Events decoding
//!
//! OpenAI and Anthropic both frame their streams as SSE with one JSON object
//! per event. Event framing, line splitting and UTF-8 reassembly across
//! transport chunks are done by `eventsource_stream`; each event's `data`
//! goes to the provider's [`PayloadParser`].

use super::{EventStream, PayloadParser, StreamEvent};
use crate::http::ByteStream;
use crate::providers::{ProviderError, ProviderType};
use bytes::Bytes;
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

type SseStream = Pin<Box<dyn Stream<Item = Result<Event, EventStreamError<ProviderError>>> + Send>>;

/// Blank line appended after the body so an unterminated last event is dispatched
const FINAL_TERMINATOR: &[u8] = b"\n\n";

struct SseState {
    provider: ProviderType,
    events: SseStream,
    parser: Box<dyn PayloadParser>,
    pending: VecDeque<StreamEvent>,
    /// Set once the transport body is exhausted
    body_ended: Arc<AtomicBool>,
    closed: bool,
}

impl SseState {
    fn handle(&mut self, data: &str) {
        if data.is_empty() {
            return;
        }

        match self.parser.parse(data.as_bytes()) {
            Ok(frame_events) => {
                for event in frame_events {
                    let done = event == StreamEvent::Done;
                    self.pending.push_back(event);
                    if done {
                        debug!("{} stream signalled completion", self.parser.name());
                        self.closed = true;
                        return;
                    }
                }
            }
            Err(e) if self.body_ended.load(Ordering::SeqCst) => {
                debug!(
                    "Discarding incomplete final {} stream event: {}",
                    self.parser.name(),
                    e
                );
            }
            Err(e) => {
                warn!(
                    "Skipping malformed {} stream frame: {}",
                    self.parser.name(),
                    e
                );
            }
        }
    }
}

/// Decode an SSE body into events
///
/// The returned stream ends right after a `Done` event without polling the
/// body again. Payloads that fail to parse are skipped. Only transport
/// errors are yielded; undecodable framing ends the stream early.
pub fn sse_events(
    provider: ProviderType,
    body: ByteStream,
    parser: Box<dyn PayloadParser>,
) -> EventStream {
    let body_ended = Arc::new(AtomicBool::new(false));
    let ended = body_ended.clone();
    let terminated = body.chain(stream::once(async move {
        ended.store(true, Ordering::SeqCst);
        Ok::<_, ProviderError>(Bytes::from_static(FINAL_TERMINATOR))
    }));

    let state = SseState {
        provider,
        events: Box::pin(terminated.eventsource()),
        parser,
        pending: VecDeque::new(),
        body_ended,
        closed: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((Ok(event), state));
            }
            if state.closed {
                return None;
            }

            match state.events.next().await {
                Some(Ok(event)) => state.handle(&event.data),
                Some(Err(EventStreamError::Transport(e))) => {
                    state.closed = true;
                    return Some((Err(e), state));
                }
                Some(Err(e)) => {
                    warn!(
                        "Ending {} stream after undecodable data: {:?}",
                        state.provider, e
                    );
                    state.closed = true;
                }
                None => state.closed = true,
            }
        }
    }))
}
