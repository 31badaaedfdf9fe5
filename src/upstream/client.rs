//! Upstream inference client
//!
//! Issues the single streaming POST per chat and hands back the raw body.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::pin::Pin;

use anyhow::Context;

use super::headers::build_upstream_headers;
use super::logging::{RequestContext, UPSTREAM_LABEL};
use crate::config::Config;
use crate::conversation::{Message, UpstreamChatRequest};
use crate::error::{AppError, AppResult};
use crate::streaming::UpstreamShape;

/// Stream type for raw upstream response bodies
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// Trait defining the interface to the inference upstream
///
/// # Errors
///
/// Implementations MUST distinguish a transport failure
/// ([`AppError::UpstreamUnreachable`]) from an upstream that answered with a
/// failure ([`AppError::UpstreamBadResponse`]); the handler renders them
/// differently. No retries are attempted.
#[async_trait]
pub trait ChatUpstream: Send + Sync {
    /// Get the upstream name for logging and metrics
    fn name(&self) -> &'static str;

    /// Model identifier sent with every request
    fn model(&self) -> &str;

    /// Frame shape this upstream streams back
    fn shape(&self) -> UpstreamShape;

    /// Start a streaming chat and return the response body.
    async fn stream_chat(&self, messages: &[Message], ctx: &RequestContext) -> AppResult<ByteStream>;
}

/// HTTP client for the configured inference endpoint
pub struct UpstreamClient {
    client: reqwest::Client,
    url: String,
    model: String,
    shape: UpstreamShape,
    headers: HeaderMap,
}

impl UpstreamClient {
    /// Create a new upstream client
    ///
    /// Fails if the configured token cannot be sent as a header value.
    pub fn new(client: reqwest::Client, config: &Config) -> anyhow::Result<Self> {
        let headers = build_upstream_headers(config.upstream_token.as_deref())
            .context("OLLAMA_TOKEN is not a valid header value")?;

        Ok(Self {
            client,
            url: config.upstream_url.clone(),
            model: config.upstream_model.clone(),
            shape: config.upstream_shape,
            headers,
        })
    }
}

#[async_trait]
impl ChatUpstream for UpstreamClient {
    fn name(&self) -> &'static str {
        UPSTREAM_LABEL
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn shape(&self) -> UpstreamShape {
        self.shape
    }

    async fn stream_chat(&self, messages: &[Message], ctx: &RequestContext) -> AppResult<ByteStream> {
        let body = serde_json::to_vec(&UpstreamChatRequest::streaming(&self.model, messages))
            .context("Failed to serialize upstream request")?;

        ctx.log_upstream_request(&self.url, body.len());

        let response = self
            .client
            .post(&self.url)
            .headers(self.headers.clone())
            .body(body)
            .send()
            .await
            .map_err(|e| {
                ctx.log_connection_error(&e, &self.url);
                AppError::UpstreamUnreachable(e)
            })?;

        let status = response.status();
        ctx.log_upstream_response(status.as_u16());

        // Error bodies are left unread
        if !status.is_success() || !has_body(status) {
            ctx.log_bad_status(status.as_u16());
            return Err(AppError::UpstreamBadResponse {
                status: status.as_u16(),
            });
        }

        Ok(Box::pin(response.bytes_stream()))
    }
}

/// Whether a successful status can carry a response body at all
fn has_body(status: StatusCode) -> bool {
    !matches!(status, StatusCode::NO_CONTENT | StatusCode::RESET_CONTENT)
}
