//! Chat relay endpoint integration tests
//!
//! Tests for POST /api/chat against a mock upstream:
//! - Cumulative frame streaming for both upstream shapes
//! - Sentinel and malformed-line handling end to end
//! - Upstream failure responses and request validation

use axum::http::{header, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::{
    matchers::{body_json, header as header_matcher, method, path},
    Mock, ResponseTemplate,
};

use chat_relay::UpstreamShape;

use crate::common::{
    chat_request, closed_port_url, constants, final_messages, test_config, test_server,
    RelayTestHarness,
};
use crate::mocks::{UpstreamTestData, CHAT_PATH};

#[tokio::test]
async fn test_native_chat_streams_cumulative_frames() {
    let harness = RelayTestHarness::new(UpstreamShape::NativeChat).await;
    harness
        .upstream
        .mock_stream(&UpstreamTestData::native_stream(&["Hel", "lo", " there"]))
        .await;

    let response = harness.server.post("/api/chat").json(&chat_request()).await;

    response.assert_status_ok();
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap(),
        "application/json"
    );
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap().to_str().unwrap(),
        "no-cache"
    );
    assert_eq!(
        response.headers().get(header::TRANSFER_ENCODING).unwrap().to_str().unwrap(),
        "chunked"
    );
    assert_eq!(
        final_messages(&response.text()),
        vec!["Hel", "Hello", "Hello there"]
    );
}

#[tokio::test]
async fn test_hosted_completions_streams_cumulative_frames() {
    let harness = RelayTestHarness::new(UpstreamShape::HostedCompletions).await;
    harness
        .upstream
        .mock_stream(&UpstreamTestData::hosted_stream(&["ib", "is", " done"]))
        .await;

    let response = harness.server.post("/api/chat").json(&chat_request()).await;

    response.assert_status_ok();
    assert_eq!(
        final_messages(&response.text()),
        vec!["ib", "ibis", "ibis done"]
    );
}

#[tokio::test]
async fn test_forwards_conversation_with_expected_headers() {
    let harness = RelayTestHarness::new(UpstreamShape::NativeChat).await;
    let mut expected_body = chat_request();
    expected_body["stream"] = json!(true);
    expected_body["model"] = json!(constants::TEST_MODEL);

    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(header_matcher("content-type", "application/json"))
        .and(header_matcher("cache-control", "no-cache"))
        .and(header_matcher(
            "authorization",
            format!("Bearer {}", constants::TEST_TOKEN).as_str(),
        ))
        .and(body_json(expected_body))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(UpstreamTestData::native_stream(&["ok"])),
        )
        .expect(1)
        .mount(harness.upstream.server())
        .await;

    let response = harness.server.post("/api/chat").json(&chat_request()).await;

    response.assert_status_ok();
    assert_eq!(final_messages(&response.text()), vec!["ok"]);
}

#[tokio::test]
async fn test_no_token_omits_authorization() {
    let harness = RelayTestHarness::new(UpstreamShape::NativeChat).await;
    let server = test_server(test_config(
        &harness.upstream.chat_url(),
        UpstreamShape::NativeChat,
        None,
    ));
    harness
        .upstream
        .mock_stream(&UpstreamTestData::native_stream(&["hi"]))
        .await;

    let response = server.post("/api/chat").json(&chat_request()).await;
    response.assert_status_ok();

    let requests = harness.upstream.server().received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_sentinel_ends_stream_before_late_frames() {
    let harness = RelayTestHarness::new(UpstreamShape::NativeChat).await;
    harness
        .upstream
        .mock_stream(concat!(
            "data: {\"message\":{\"content\":\"hi\"}}\n",
            "[DONE]\n",
            "data: {\"message\":{\"content\":\"late\"}}\n",
        ))
        .await;

    let response = harness.server.post("/api/chat").json(&chat_request()).await;

    response.assert_status_ok();
    assert_eq!(response.text(), "{\"finalMessage\":\"hi\"}");
}

#[tokio::test]
async fn test_malformed_line_does_not_abort_stream() {
    let harness = RelayTestHarness::new(UpstreamShape::NativeChat).await;
    let body = format!(
        "{}{}\n{}",
        UpstreamTestData::native_line("first"),
        "{\"message\":{\"content\":\"bro",
        UpstreamTestData::native_line(" second"),
    );
    harness.upstream.mock_stream(&body).await;

    let response = harness.server.post("/api/chat").json(&chat_request()).await;

    response.assert_status_ok();
    assert_eq!(final_messages(&response.text()), vec!["first", "first second"]);
}

#[tokio::test]
async fn test_native_minimal_stream_yields_single_frame() {
    let harness = RelayTestHarness::new(UpstreamShape::NativeChat).await;
    harness
        .upstream
        .mock_stream("{\"message\":{\"content\":\"Hello\"}}")
        .await;

    let response = harness.server.post("/api/chat").json(&chat_request()).await;

    response.assert_status_ok();
    assert_eq!(response.text(), "{\"finalMessage\":\"Hello\"}");
}

#[tokio::test]
async fn test_frames_of_other_shape_contribute_nothing() {
    let harness = RelayTestHarness::new(UpstreamShape::NativeChat).await;
    let body = format!(
        "{}{}{}",
        UpstreamTestData::hosted_line("leak"),
        UpstreamTestData::native_line("kept"),
        UpstreamTestData::hosted_line("leak again"),
    );
    harness.upstream.mock_stream(&body).await;

    let response = harness.server.post("/api/chat").json(&chat_request()).await;

    assert_eq!(final_messages(&response.text()), vec!["kept"]);
}

#[tokio::test]
async fn test_empty_upstream_body_yields_empty_message() {
    let harness = RelayTestHarness::new(UpstreamShape::NativeChat).await;
    harness.upstream.mock_stream("").await;

    let response = harness.server.post("/api/chat").json(&chat_request()).await;

    response.assert_status_ok();
    assert_eq!(response.text(), "{\"finalMessage\":\"\"}");
}

#[tokio::test]
async fn test_unreachable_upstream_returns_fixed_error() {
    let server = test_server(test_config(&closed_port_url(), UpstreamShape::NativeChat, None));

    let response = server.post("/api/chat").json(&chat_request()).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().get(header::TRANSFER_ENCODING).is_none());
    assert_eq!(
        response.json::<Value>(),
        json!({"error": "Couldn't reach the server"})
    );
}

#[tokio::test]
async fn test_upstream_error_status_returns_fixed_error() {
    let harness = RelayTestHarness::new(UpstreamShape::NativeChat).await;
    harness
        .upstream
        .mock_status(404, "{\"error\":\"model 'llama3.1' not found\"}")
        .await;

    let response = harness.server.post("/api/chat").json(&chat_request()).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.json::<Value>(),
        json!({"error": "Failed to fetch from Ollama"})
    );
}

#[tokio::test]
async fn test_bodyless_upstream_success_returns_fixed_error() {
    let harness = RelayTestHarness::new(UpstreamShape::NativeChat).await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(harness.upstream.server())
        .await;

    let response = harness.server.post("/api/chat").json(&chat_request()).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().get(header::TRANSFER_ENCODING).is_none());
    assert_eq!(
        response.json::<Value>(),
        json!({"error": "Failed to fetch from Ollama"})
    );
}

#[tokio::test]
async fn test_invalid_body_rejected_without_upstream_call() {
    let harness = RelayTestHarness::new(UpstreamShape::NativeChat).await;
    harness.upstream.expect_no_calls().await;

    let response = harness
        .server
        .post("/api/chat")
        .json(&json!({"messages": [{"role": "robot", "content": "beep"}]}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid request body"));

    let response = harness.server.post("/api/chat").text("not json").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}
