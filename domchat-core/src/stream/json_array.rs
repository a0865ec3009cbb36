//! Decoding of a streamed JSON array of objects
//!
//! Gemini streams `[{...},\r\n{...}]` with no line framing, so object
//! boundaries have to be found by matching braces. Braces inside string
//! literals are ignored, so a `}` in generated text cannot cut a frame short.
//! Every structural byte is ASCII, so scanning works on raw bytes and a
//! character split across chunks is simply reassembled in the buffer.

use super::usage::UsagePolicy;
use super::{FrameDecoder, PayloadParser, StreamEvent};
use tracing::{debug, warn};

/// Resumable brace-matching scanner over accumulated bytes
///
/// Scanning picks up where the previous call stopped, so each byte is
/// examined once even when an object arrives over many chunks.
#[derive(Debug, Default)]
pub struct JsonObjectScanner {
    buffer: Vec<u8>,
    scan_pos: usize,
    depth: usize,
    object_start: Option<usize>,
    in_string: bool,
    escaped: bool,
}

impl JsonObjectScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Byte range of the first complete top-level object, if one is buffered
    ///
    /// Bytes between objects (separators, array brackets) are skipped.
    pub fn next_object(&mut self) -> Option<(usize, usize)> {
        while self.scan_pos < self.buffer.len() {
            let pos = self.scan_pos;
            let byte = self.buffer[pos];
            self.scan_pos += 1;

            if self.depth == 0 {
                if byte == b'{' {
                    self.depth = 1;
                    self.object_start = Some(pos);
                }
                continue;
            }

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if byte == b'\\' {
                    self.escaped = true;
                } else if byte == b'"' {
                    self.in_string = false;
                }
                continue;
            }

            match byte {
                b'"' => self.in_string = true,
                b'{' => self.depth += 1,
                b'}' => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        if let Some(start) = self.object_start {
                            return Some((start, pos + 1));
                        }
                    }
                }
                _ => {}
            }
        }

        None
    }

    /// The buffered bytes for a range returned by [`next_object`](Self::next_object)
    pub fn slice(&self, range: (usize, usize)) -> &[u8] {
        &self.buffer[range.0..range.1]
    }

    /// Drop everything up to `end` plus any following separators, and reset
    /// the scan state to the start of what remains
    pub fn consume(&mut self, end: usize) {
        self.buffer.drain(..end);
        let separators = self
            .buffer
            .iter()
            .take_while(|b| **b == b',' || b.is_ascii_whitespace())
            .count();
        self.buffer.drain(..separators);
        self.reset_scan();
    }

    /// Drop bytes before any object in progress that can never start one
    pub fn discard_leading_noise(&mut self) {
        let keep_from = match self.object_start {
            Some(start) => start,
            None if self.depth == 0 => self.scan_pos,
            None => return,
        };
        if keep_from == 0 {
            return;
        }
        self.buffer.drain(..keep_from);
        self.scan_pos -= keep_from;
        self.object_start = self.object_start.map(|start| start - keep_from);
    }

    /// Remove the array's closing `]`, optionally followed by a `%` artifact
    pub fn strip_trailing_markers(&mut self) {
        let trimmed = self.buffer.trim_ascii_end();
        let trimmed = trimmed.strip_suffix(b"%").unwrap_or(trimmed).trim_ascii_end();
        let trimmed = trimmed.strip_suffix(b"]").unwrap_or(trimmed);
        let new_len = trimmed.len();
        self.buffer.truncate(new_len);
        self.reset_scan();
    }

    /// Bytes still buffered
    pub fn remaining(&self) -> &[u8] {
        &self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.trim_ascii().is_empty()
    }

    fn reset_scan(&mut self) {
        self.scan_pos = 0;
        self.depth = 0;
        self.object_start = None;
        self.in_string = false;
        self.escaped = false;
    }
}

/// Frame decoder for providers that stream a JSON array of objects
pub struct JsonArrayDecoder<P> {
    scanner: JsonObjectScanner,
    parser: P,
    started: bool,
    /// End of a brace-matched object that failed to parse once
    deferred: Option<usize>,
    closed: bool,
    skipped_frames: usize,
}

impl<P: PayloadParser> JsonArrayDecoder<P> {
    pub fn new(parser: P) -> Self {
        Self {
            scanner: JsonObjectScanner::new(),
            parser,
            started: false,
            deferred: None,
            closed: false,
            skipped_frames: 0,
        }
    }

    /// Number of objects dropped because they failed to parse
    pub fn skipped_frames(&self) -> usize {
        self.skipped_frames
    }

    fn push_chunk(&mut self, chunk: &[u8]) {
        if self.started {
            self.scanner.push(chunk);
            return;
        }

        let trimmed = chunk.trim_ascii_start();
        if trimmed.is_empty() {
            return;
        }
        self.started = true;
        self.scanner
            .push(trimmed.strip_prefix(b"[").unwrap_or(trimmed));
    }

    /// Retry a previously unparseable object; skip it if it fails again
    fn retry_deferred(&mut self, events: &mut Vec<StreamEvent>) {
        let Some(end) = self.deferred.take() else {
            return;
        };

        match self.parser.parse(self.scanner.slice((0, end))) {
            Ok(frame_events) => self.emit(frame_events, events),
            Err(e) => {
                self.skipped_frames += 1;
                warn!(
                    "Skipping malformed {} stream object after retry: {}",
                    self.parser.name(),
                    e
                );
            }
        }
        self.scanner.consume(end);
    }

    fn drain_objects(&mut self, events: &mut Vec<StreamEvent>) {
        while !self.closed {
            let Some(range) = self.scanner.next_object() else {
                self.scanner.discard_leading_noise();
                return;
            };

            // Objects always start at the front once leading noise is gone
            if range.0 > 0 {
                self.scanner.consume(range.0);
                continue;
            }

            match self.parser.parse(self.scanner.slice(range)) {
                Ok(frame_events) => {
                    self.emit(frame_events, events);
                    self.scanner.consume(range.1);
                }
                Err(e) => {
                    debug!(
                        "Deferring unparseable {} stream object: {}",
                        self.parser.name(),
                        e
                    );
                    self.deferred = Some(range.1);
                    return;
                }
            }
        }
    }

    fn emit(&mut self, frame_events: Vec<StreamEvent>, events: &mut Vec<StreamEvent>) {
        for event in frame_events {
            let done = event == StreamEvent::Done;
            events.push(event);
            if done {
                self.closed = true;
                return;
            }
        }
    }
}

impl<P: PayloadParser> FrameDecoder for JsonArrayDecoder<P> {
    fn decode(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.closed {
            return events;
        }

        self.push_chunk(chunk);

        self.retry_deferred(&mut events);
        self.drain_objects(&mut events);
        events
    }

    fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.closed {
            return events;
        }

        self.retry_deferred(&mut events);
        self.scanner.strip_trailing_markers();
        self.drain_objects(&mut events);

        // A failure here has no next chunk to wait for
        if let Some(end) = self.deferred.take() {
            self.skipped_frames += 1;
            warn!("Skipping malformed {} stream object", self.parser.name());
            self.scanner.consume(end);
        }

        if !self.scanner.is_empty() {
            debug!(
                "Discarding {} bytes of incomplete {} stream data",
                self.scanner.remaining().len(),
                self.parser.name()
            );
        }

        self.closed = true;
        events
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn usage_policy(&self) -> UsagePolicy {
        self.parser.usage_policy()
    }
}
