//! Request logging for relayed chats
//!
//! Provides structured logging with correlation IDs so the handler side and
//! the streaming side of one request can be matched up in the logs.

use std::time::Instant;
use tracing::{debug, error, info, warn, Span};
use uuid::Uuid;

use crate::streaming::{StreamTranslator, UpstreamShape};

/// Upstream label used in logs and error messages
pub const UPSTREAM_LABEL: &str = "ollama";

/// Context for tracking a request through the system
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique identifier for this request (for log correlation)
    pub trace_id: String,
    /// When the request started
    pub start_time: Instant,
    /// Model being requested upstream
    pub model: String,
    /// Frame shape expected from the upstream
    pub shape: UpstreamShape,
    /// Number of messages in the conversation
    pub messages: usize,
}

impl RequestContext {
    /// Create a new request context
    pub fn new(model: impl Into<String>, shape: UpstreamShape) -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string()[..8].to_string(), // Short ID for readability
            start_time: Instant::now(),
            model: model.into(),
            shape,
            messages: 0,
        }
    }

    /// Set the conversation length
    pub fn with_messages(mut self, messages: usize) -> Self {
        self.messages = messages;
        self
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u128 {
        self.start_time.elapsed().as_millis()
    }

    /// Log request initiation
    pub fn log_request_start(&self) {
        info!(
            trace_id = %self.trace_id,
            upstream = UPSTREAM_LABEL,
            model = %self.model,
            shape = %self.shape,
            messages = self.messages,
            "Relaying chat request"
        );
    }

    /// Log request being sent to upstream
    pub fn log_upstream_request(&self, url: &str, body_size: usize) {
        debug!(
            trace_id = %self.trace_id,
            url = %url,
            body_size = body_size,
            elapsed_ms = %self.elapsed_ms(),
            "Sending request to upstream"
        );
    }

    /// Log response received from upstream
    pub fn log_upstream_response(&self, status: u16) {
        info!(
            trace_id = %self.trace_id,
            upstream = UPSTREAM_LABEL,
            status = status,
            elapsed_ms = %self.elapsed_ms(),
            "Response received from upstream"
        );
    }

    /// Log connection error
    pub fn log_connection_error(&self, error: &reqwest::Error, url: &str) {
        error!(
            trace_id = %self.trace_id,
            upstream = UPSTREAM_LABEL,
            url = %url,
            connect = error.is_connect(),
            timeout = error.is_timeout(),
            elapsed_ms = %self.elapsed_ms(),
            error = %error,
            "Connection to upstream failed"
        );
    }

    /// Log a non-success upstream status
    pub fn log_bad_status(&self, status: u16) {
        error!(
            trace_id = %self.trace_id,
            upstream = UPSTREAM_LABEL,
            status = status,
            elapsed_ms = %self.elapsed_ms(),
            "Upstream returned an error status"
        );
    }

    /// Log a transport failure while reading the upstream body
    pub fn log_stream_error(&self, error: &reqwest::Error) {
        warn!(
            trace_id = %self.trace_id,
            upstream = UPSTREAM_LABEL,
            elapsed_ms = %self.elapsed_ms(),
            error = %error,
            "Upstream stream failed mid-response"
        );
    }

    /// Log the end of a translation session
    pub fn log_stream_complete(&self, translator: &StreamTranslator) {
        let stats = translator.stats();
        info!(
            trace_id = %self.trace_id,
            model = %self.model,
            termination = translator.termination().map(|t| t.as_str()).unwrap_or("unknown"),
            frames_emitted = stats.frames_emitted,
            frames_skipped = stats.frames_skipped,
            frames_malformed = stats.frames_malformed,
            message_len = translator.message().len(),
            elapsed_ms = %self.elapsed_ms(),
            "Relay stream completed"
        );
    }

    /// Create a tracing span for this request
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "relay_request",
            trace_id = %self.trace_id,
            model = %self.model,
            shape = %self.shape,
        )
    }
}
