//! Upstream-to-client stream translation
//!
//! Turns the raw upstream byte stream into back-to-back
//! `{"finalMessage": ...}` objects, each carrying the full text accumulated
//! so far.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Serialize;
use tracing::{debug, warn};

use super::frame::{FrameLine, UpstreamShape};
use super::line_buffer::LineBuffer;
use crate::routes::metrics::{record_frame, record_stream_complete};
use crate::upstream::{ByteStream, RequestContext};

/// Frame sent to the client
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OutboundFrame<'a> {
    #[serde(rename = "finalMessage")]
    pub final_message: &'a str,
}

impl<'a> OutboundFrame<'a> {
    pub fn encode(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Bytes::from)
    }
}

/// Why a translation session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Upstream sent the sentinel
    Sentinel,
    /// Upstream closed the body
    EndOfStream,
    /// Reading the upstream body failed
    TransportError,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Termination::Sentinel => "sentinel",
            Termination::EndOfStream => "end_of_stream",
            Termination::TransportError => "transport_error",
        }
    }
}

/// Per-session frame counters, reported when the session ends
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TranslationStats {
    pub frames_emitted: u64,
    pub frames_skipped: u64,
    pub frames_malformed: u64,
}

/// State of one translation session.
///
/// Owns the residual line bytes and the running message; both live exactly
/// as long as the session. Feeding is synchronous so the whole state machine
/// can be driven without a runtime.
#[derive(Debug)]
pub struct StreamTranslator {
    shape: UpstreamShape,
    lines: LineBuffer,
    message: String,
    /// Length of the message carried by the last emitted frame
    emitted_len: Option<usize>,
    termination: Option<Termination>,
    stats: TranslationStats,
}

impl StreamTranslator {
    pub fn new(shape: UpstreamShape) -> Self {
        Self {
            shape,
            lines: LineBuffer::new(),
            message: String::new(),
            emitted_len: None,
            termination: None,
            stats: TranslationStats::default(),
        }
    }

    /// Feed one transport chunk and collect the frames it produces.
    ///
    /// Stops at the sentinel; any lines after it, in this chunk or later
    /// ones, are never looked at.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        let mut frames = Vec::new();
        if self.is_finished() {
            return frames;
        }

        for line in self.lines.feed(chunk) {
            self.process_line(&line, &mut frames);
            if self.is_finished() {
                break;
            }
        }

        frames
    }

    /// Close the session on upstream end-of-stream.
    ///
    /// An unterminated final line is still processed. The closing snapshot
    /// is emitted unless the last frame already carried exactly this text.
    pub fn finish(&mut self) -> Vec<Bytes> {
        let mut frames = Vec::new();
        if self.is_finished() {
            return frames;
        }

        if self.lines.has_incomplete() {
            debug!(shape = %self.shape, "Upstream closed without terminating its last line");
            if let Some(line) = self.lines.take_remaining() {
                self.process_line(&line, &mut frames);
            }
        }

        if !self.is_finished() {
            if self.emitted_len != Some(self.message.len()) {
                self.emit(&mut frames);
            }
            self.termination = Some(Termination::EndOfStream);
        }

        frames
    }

    /// Mark the session as ended by a transport failure.
    pub fn abort(&mut self) {
        if !self.is_finished() {
            self.termination = Some(Termination::TransportError);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.termination.is_some()
    }

    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    /// Full text accumulated so far
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn stats(&self) -> TranslationStats {
        self.stats
    }

    fn process_line(&mut self, line: &str, frames: &mut Vec<Bytes>) {
        let payload = match FrameLine::classify(line) {
            FrameLine::Done => {
                debug!(shape = %self.shape, "Received end-of-stream sentinel from upstream");
                self.termination = Some(Termination::Sentinel);
                return;
            }
            FrameLine::Payload(payload) => payload,
        };

        match self.shape.extract_delta(payload) {
            Ok(Some(delta)) => {
                self.message.push_str(&delta);
                self.emit(frames);
            }
            Ok(None) => {
                self.stats.frames_skipped += 1;
                record_frame("skipped");
            }
            Err(e) => {
                warn!(
                    error = %e,
                    line = %truncate(payload, 500),
                    line_len = payload.len(),
                    shape = %self.shape,
                    "Failed to parse upstream frame, skipping"
                );
                self.stats.frames_malformed += 1;
                record_frame("malformed");
            }
        }
    }

    fn emit(&mut self, frames: &mut Vec<Bytes>) {
        let frame = OutboundFrame {
            final_message: &self.message,
        };

        match frame.encode() {
            Ok(bytes) => {
                frames.push(bytes);
                self.emitted_len = Some(self.message.len());
                self.stats.frames_emitted += 1;
                record_frame("emitted");
            }
            Err(e) => {
                warn!(error = %e, "Failed to encode outbound frame, skipping emission");
                record_frame("emit_failed");
            }
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Wrap an upstream body into the outbound frame stream.
///
/// The returned stream is pull-driven: the upstream is read only when the
/// consumer asks for the next chunk. Dropping it drops the upstream body and
/// releases the connection.
pub fn relay_stream(
    upstream: ByteStream,
    shape: UpstreamShape,
    ctx: RequestContext,
) -> impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static {
    async_stream::stream! {
        let mut upstream = upstream;
        let mut translator = StreamTranslator::new(shape);

        while let Some(chunk) = upstream.next().await {
            match chunk {
                Ok(bytes) => {
                    for frame in translator.feed(&bytes) {
                        yield Ok(frame);
                    }
                    if translator.is_finished() {
                        break;
                    }
                }
                Err(e) => {
                    translator.abort();
                    ctx.log_stream_error(&e);
                    yield Err(e);
                    break;
                }
            }
        }

        // Release the upstream connection before the final flush
        drop(upstream);

        for frame in translator.finish() {
            yield Ok(frame);
        }

        if let Some(termination) = translator.termination() {
            record_stream_complete(termination.as_str());
        }
        ctx.log_stream_complete(&translator);
    }
}
