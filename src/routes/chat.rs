//! Chat relay endpoint
//!
//! Accepts a conversation, forwards it upstream and streams back cumulative
//! `{"finalMessage": ...}` objects.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, StatusCode},
    response::Response,
};
use tracing::Instrument;

use crate::{
    conversation::ConversationRequest,
    error::AppError,
    routes::metrics::{record_request, record_upstream_error},
    streaming::relay_stream,
    upstream::RequestContext,
    AppState,
};

/// Handle chat relay requests
///
/// Upstream failures short-circuit to a single `{"error": ...}` object with
/// status 500 before any streamed body is started.
pub async fn chat(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response, AppError> {
    let start_time = Instant::now();

    let request: ConversationRequest = serde_json::from_slice(&body).map_err(|e| {
        record_request("bad_request", start_time.elapsed().as_secs_f64());
        AppError::BadRequest(format!("Invalid request body: {}", e))
    })?;

    let upstream = state.upstream.clone();
    let ctx = RequestContext::new(upstream.model(), upstream.shape())
        .with_messages(request.messages.len());
    ctx.log_request_start();

    let stream = match upstream
        .stream_chat(&request.messages, &ctx)
        .instrument(ctx.create_span())
        .await
    {
        Ok(stream) => stream,
        Err(e) => {
            record_upstream_error(e.kind());
            record_request("error", start_time.elapsed().as_secs_f64());
            return Err(e);
        }
    };

    record_request("streaming", start_time.elapsed().as_secs_f64());

    let body = Body::from_stream(relay_stream(stream, upstream.shape(), ctx));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::TRANSFER_ENCODING, "chunked")
        .body(body)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build response: {}", e)))
}
