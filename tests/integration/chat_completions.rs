//! Chat completions endpoint integration tests
//!
//! - POST /v1/chat/completions - streaming and aggregated responses
//! - Request validation (empty messages, malformed body)
//! - Vendor failures surfaced to the client
//! - Unsupported OpenAI endpoints

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{sse_content, sse_events, TestApp, DEFAULT_MODEL};
use crate::mocks::{VendorTestData, COMPLETIONS_PATH};

fn user_request(stream: bool) -> Value {
    json!({
        "model": "qwen3-max",
        "stream": stream,
        "messages": [
            {"role": "system", "content": "Be brief."},
            {"role": "user", "content": "What is 6 x 7?"}
        ]
    })
}

async fn answering(app: &TestApp) {
    app.vendor.mock_new_chat("chat-1").await;
    app.vendor
        .mock_completion(&[
            VendorTestData::created("parent-1", "response-1"),
            VendorTestData::answer("The answer"),
            VendorTestData::answer(" is 42."),
            VendorTestData::finish_with_usage(12, 5),
        ])
        .await;
}

// =============================================================================
// Streaming
// =============================================================================

#[tokio::test]
async fn test_stream_translates_vendor_events() {
    let app = TestApp::openai().await;
    answering(&app).await;

    let response = app.server.post("/v1/chat/completions").json(&user_request(true)).await;

    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "text/event-stream");
    assert_eq!(response.header("cache-control"), "no-cache");
    assert_eq!(response.header("x-accel-buffering"), "no");

    let body = response.text();
    assert_eq!(sse_content(&body), "The answer is 42.");
    assert!(body.ends_with("data: [DONE]\n\n"));
    assert_eq!(body.matches("[DONE]").count(), 1);

    let events = sse_events(&body);
    assert_eq!(events[0]["object"], "chat.completion.chunk");
    assert_eq!(events[0]["model"], "qwen3-max");
    assert_eq!(events[0]["choices"][0]["delta"]["role"], "assistant");
    assert!(events.iter().all(|e| e["id"] == events[0]["id"]));
    assert_eq!(
        events.last().unwrap()["choices"][0]["finish_reason"],
        "stop"
    );
}

#[tokio::test]
async fn test_stream_wraps_reasoning_in_think_tags() {
    let app = TestApp::openai().await;
    app.vendor.mock_new_chat("chat-1").await;
    app.vendor
        .mock_completion(&[
            VendorTestData::think("Multiply."),
            VendorTestData::think_finished(),
            VendorTestData::answer("42"),
            VendorTestData::finish(),
        ])
        .await;

    let response = app.server.post("/v1/chat/completions").json(&user_request(true)).await;

    assert_eq!(sse_content(&response.text()), "<think>Multiply.</think>42");
}

#[tokio::test]
async fn test_stream_passes_unrecognized_lines_through() {
    let app = TestApp::openai().await;
    app.vendor.mock_new_chat("chat-1").await;
    let body = format!(
        "data: {}\n\ndata: {{not json\n\ndata: {}\n\n",
        VendorTestData::answer("ok"),
        VendorTestData::finish()
    );
    app.vendor.mock_completion_raw("chat-1", &body).await;

    let response = app.server.post("/v1/chat/completions").json(&user_request(true)).await;

    let text = response.text();
    assert!(text.contains("data: {not json\n\n"));
    assert!(text.ends_with("data: [DONE]\n\n"));
}

#[tokio::test]
async fn test_stream_error_event_becomes_error_frame() {
    let app = TestApp::openai().await;
    app.vendor.mock_new_chat("chat-1").await;
    let body = "data: {\"success\":false,\"data\":{\"code\":\"RateLimited\",\"details\":\"slow down\"}}\n\n";
    app.vendor.mock_completion_raw("chat-1", body).await;

    let response = app.server.post("/v1/chat/completions").json(&user_request(true)).await;

    response.assert_status_ok();
    let text = response.text();
    let events = sse_events(&text);
    assert_eq!(events[0]["error"]["code"], "VENDOR_STREAM_ERROR");
    assert!(events[0]["error"]["message"]
        .as_str()
        .unwrap()
        .contains("RateLimited"));
    assert!(text.ends_with("data: [DONE]\n\n"));
}

// =============================================================================
// Aggregated
// =============================================================================

#[tokio::test]
async fn test_non_stream_returns_completion_object() {
    let app = TestApp::openai().await;
    answering(&app).await;

    let response = app.server.post("/v1/chat/completions").json(&user_request(false)).await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["object"], "chat.completion");
    assert_eq!(json["model"], "qwen3-max");
    assert!(json["id"].as_str().unwrap().starts_with("chatcmpl-"));
    assert_eq!(json["choices"][0]["message"]["role"], "assistant");
    assert_eq!(json["choices"][0]["message"]["content"], "The answer is 42.");
    assert_eq!(json["choices"][0]["finish_reason"], "stop");
    assert_eq!(json["usage"]["prompt_tokens"], 12);
    assert_eq!(json["usage"]["completion_tokens"], 5);
    assert_eq!(json["usage"]["total_tokens"], 17);
}

#[tokio::test]
async fn test_non_stream_still_streams_from_vendor() {
    let app = TestApp::openai().await;
    answering(&app).await;

    app.server.post("/v1/chat/completions").json(&user_request(false)).await;

    let bodies = app.vendor.completion_bodies().await;
    assert_eq!(bodies.len(), 1);
    let sent = &bodies[0];
    assert_eq!(sent["stream"], true);
    assert_eq!(sent["incremental_output"], true);
    assert_eq!(sent["chat_id"], "chat-1");
    assert_eq!(sent["model"], "qwen3-max");
    assert_eq!(sent["messages"].as_array().unwrap().len(), 1);
    assert_eq!(sent["messages"][0]["role"], "user");

    let prompt = sent["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.contains("Be brief."));
    assert!(prompt.contains("What is 6 x 7?"));

    let requests = app.vendor.requests_to(COMPLETIONS_PATH).await;
    assert_eq!(requests[0].url.query(), Some("chat_id=chat-1"));
}

#[tokio::test]
async fn test_missing_model_uses_default() {
    let app = TestApp::openai().await;
    answering(&app).await;

    let response = app
        .server
        .post("/v1/chat/completions")
        .json(&json!({"messages": [{"role": "user", "content": "hi"}]}))
        .await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["model"], DEFAULT_MODEL);
}

#[tokio::test]
async fn test_non_stream_vendor_failure_is_bad_gateway() {
    let app = TestApp::openai().await;
    app.vendor.mock_new_chat("chat-1").await;
    let body = "data: {\"success\":false,\"data\":{\"code\":\"RateLimited\",\"details\":\"slow down\"}}\n\n";
    app.vendor.mock_completion_raw("chat-1", body).await;

    let response = app.server.post("/v1/chat/completions").json(&user_request(false)).await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let json: Value = response.json();
    assert_eq!(json["error"]["code"], "VENDOR_ERROR");
    assert_eq!(
        json["error"]["message"],
        "Vendor API error: RateLimited - slow down"
    );
}

#[tokio::test]
async fn test_chat_in_progress_rejection() {
    let app = TestApp::openai().await;
    app.vendor.mock_new_chat("chat-1").await;
    app.vendor.mock_completion_in_progress().await;

    let response = app.server.post("/v1/chat/completions").json(&user_request(true)).await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let json: Value = response.json();
    assert_eq!(
        json["error"]["message"],
        "Chat is currently in progress. Please wait for the current request to complete."
    );
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_empty_messages_rejected() {
    let app = TestApp::openai().await;

    let response = app
        .server
        .post("/v1/chat/completions")
        .json(&json!({"model": "qwen3-max", "messages": []}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(app.vendor.requests_to(COMPLETIONS_PATH).await.is_empty());
}

#[tokio::test]
async fn test_malformed_body_rejected() {
    let app = TestApp::openai().await;

    let response = app
        .server
        .post("/v1/chat/completions")
        .content_type("application/json")
        .bytes("{\"messages\": ".into())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let json: Value = response.json();
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_legacy_endpoints_unsupported() {
    let app = TestApp::openai().await;

    for path in ["/v1/completions", "/v1/embeddings"] {
        let response = app
            .server
            .post(path)
            .json(&json!({"model": "qwen3-max", "input": "hi", "prompt": "hi"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
