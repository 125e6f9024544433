//! Vendor session integration tests
//!
//! The OpenAI surface keeps one long-lived vendor chat and chains each turn
//! onto the previous response. Session creation failures surface as 503.

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::TestApp;
use crate::mocks::{VendorTestData, COMPLETIONS_PATH, NEW_CHAT_PATH};

fn turn(text: &str) -> Value {
    json!({
        "model": "qwen3-max",
        "messages": [{"role": "user", "content": text}]
    })
}

#[tokio::test]
async fn test_openai_turns_share_one_session() {
    let app = TestApp::openai().await;
    app.vendor.mock_new_chat("chat-1").await;
    app.vendor
        .mock_completion(&[
            VendorTestData::created("parent-1", "response-1"),
            VendorTestData::answer("ok"),
            VendorTestData::finish(),
        ])
        .await;

    for text in ["first", "second"] {
        app.server
            .post("/v1/chat/completions")
            .json(&turn(text))
            .await
            .assert_status_ok();
    }

    assert_eq!(app.vendor.requests_to(NEW_CHAT_PATH).await.len(), 1);

    let bodies = app.vendor.completion_bodies().await;
    assert_eq!(bodies.len(), 2);
    assert!(bodies.iter().all(|b| b["chat_id"] == "chat-1"));
    assert_eq!(bodies[0]["parent_id"], Value::Null);
    assert_eq!(bodies[1]["parent_id"], "parent-1");
    assert_eq!(bodies[1]["messages"][0]["parentId"], "parent-1");
}

#[tokio::test]
async fn test_streamed_turn_updates_threading() {
    let app = TestApp::openai().await;
    app.vendor.mock_new_chat("chat-1").await;
    app.vendor
        .mock_completion(&[
            VendorTestData::created("parent-s", "response-s"),
            VendorTestData::answer("ok"),
            VendorTestData::finish(),
        ])
        .await;

    let mut request = turn("streamed");
    request["stream"] = json!(true);
    app.server
        .post("/v1/chat/completions")
        .json(&request)
        .await
        .assert_status_ok();

    let session = app.state.sessions.current().await.unwrap();
    assert_eq!(session.chat_id, "chat-1");
    assert_eq!(session.parent_id.as_deref(), Some("parent-s"));
    assert_eq!(session.response_id.as_deref(), Some("response-s"));

    let health: Value = app.server.get("/health").await.json();
    assert_eq!(health["session_id"], "chat-1");
}

#[tokio::test]
async fn test_session_creation_failure_is_503() {
    let app = TestApp::openai().await;
    app.vendor.mock_new_chat_failure().await;

    let response = app.server.post("/v1/chat/completions").json(&turn("hi")).await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let json: Value = response.json();
    assert_eq!(json["error"]["code"], "SESSION_CREATION_FAILED");
    assert_eq!(json["error"]["message"], "Failed to create chat session");
    assert!(app.vendor.requests_to(COMPLETIONS_PATH).await.is_empty());
}

#[tokio::test]
async fn test_ollama_session_failure_is_503() {
    let app = TestApp::ollama().await;
    app.vendor.mock_new_chat_failure().await;

    let response = app
        .server
        .post("/api/generate")
        .json(&json!({"model": "qwen3-max", "prompt": "hi", "stream": false}))
        .await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
}
