//! Ollama endpoint integration tests
//!
//! - POST /api/chat - NDJSON chat frames and aggregated chat object
//! - POST /api/generate - NDJSON generate lines and aggregated response

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{ndjson, TestApp};
use crate::mocks::{VendorTestData, COMPLETIONS_PATH, NEW_CHAT_PATH};

async fn answering(app: &TestApp) {
    app.vendor.mock_new_chat("chat-o").await;
    app.vendor
        .mock_completion(&[
            VendorTestData::think("Count."),
            VendorTestData::think_finished(),
            VendorTestData::answer("Two"),
            VendorTestData::answer(" apples"),
            VendorTestData::finish_with_usage(9, 3),
        ])
        .await;
}

// =============================================================================
// /api/chat
// =============================================================================

#[tokio::test]
async fn test_chat_streams_ndjson_by_default() {
    let app = TestApp::ollama().await;
    answering(&app).await;

    let response = app
        .server
        .post("/api/chat")
        .json(&json!({
            "model": "qwen3-max:latest",
            "messages": [{"role": "user", "content": "How many apples?"}]
        }))
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "application/x-ndjson");

    let frames = ndjson(&response.text());
    assert!(frames.iter().all(|f| f["model"] == "qwen3-max"));
    assert_eq!(frames[0]["message"], json!({"role": "assistant", "thinking": ""}));

    let thinking: String = frames
        .iter()
        .filter_map(|f| f["message"]["thinking"].as_str())
        .collect();
    let content: String = frames
        .iter()
        .filter_map(|f| f["message"]["content"].as_str())
        .collect();
    assert_eq!(thinking, "Count.");
    assert_eq!(content, "Two apples");

    let last = frames.last().unwrap();
    assert_eq!(last["done"], true);
    assert_eq!(last["done_reason"], "stop");
    assert_eq!(last["prompt_eval_count"], 9);
    assert_eq!(last["eval_count"], 3);
    assert!(last["total_duration"].as_u64().is_some());
    assert_eq!(frames.iter().filter(|f| f["done"] == true).count(), 1);
}

#[tokio::test]
async fn test_chat_non_stream_single_object() {
    let app = TestApp::ollama().await;
    answering(&app).await;

    let response = app
        .server
        .post("/api/chat")
        .json(&json!({
            "model": "qwen3-max",
            "stream": false,
            "messages": [{"role": "user", "content": "How many apples?"}]
        }))
        .await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["done"], true);
    assert_eq!(json["message"]["role"], "assistant");
    assert_eq!(json["message"]["content"], "Two apples");
    assert_eq!(json["message"]["thinking"], "Count.");
    assert_eq!(json["eval_count"], 3);
}

#[tokio::test]
async fn test_chat_empty_messages_rejected() {
    let app = TestApp::ollama().await;

    let response = app
        .server
        .post("/api/chat")
        .json(&json!({"model": "qwen3-max", "messages": []}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

// =============================================================================
// /api/generate
// =============================================================================

#[tokio::test]
async fn test_generate_non_stream() {
    let app = TestApp::ollama().await;
    answering(&app).await;

    let response = app
        .server
        .post("/api/generate")
        .json(&json!({
            "model": "qwen3-max:latest",
            "prompt": "How many apples?",
            "system": "Answer in words.",
            "stream": false
        }))
        .await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["model"], "qwen3-max");
    assert_eq!(json["response"], "Two apples");
    assert_eq!(json["done"], true);
    assert_eq!(json["done_reason"], "stop");
    assert!(json.get("message").is_none());

    let bodies = app.vendor.completion_bodies().await;
    let prompt = bodies[0]["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.contains("Answer in words."));
    assert!(prompt.contains("How many apples?"));
}

#[tokio::test]
async fn test_generate_stream_lines() {
    let app = TestApp::ollama().await;
    answering(&app).await;

    let response = app
        .server
        .post("/api/generate")
        .json(&json!({"model": "qwen3-max", "prompt": "How many apples?"}))
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "application/x-ndjson");

    let lines = ndjson(&response.text());
    assert!(lines.iter().all(|l| l.get("message").is_none()));
    let text: String = lines
        .iter()
        .filter_map(|l| l["response"].as_str())
        .collect();
    assert!(text.ends_with("Two apples"));

    let last = lines.last().unwrap();
    assert_eq!(last["done"], true);
    assert_eq!(last["done_reason"], "stop");
}

#[tokio::test]
async fn test_generate_empty_prompt_rejected() {
    let app = TestApp::ollama().await;

    let response = app
        .server
        .post("/api/generate")
        .json(&json!({"model": "qwen3-max", "prompt": ""}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(app.vendor.requests_to(COMPLETIONS_PATH).await.is_empty());
}

#[tokio::test]
async fn test_ollama_requests_use_fresh_sessions() {
    let app = TestApp::ollama().await;
    answering(&app).await;

    for _ in 0..2 {
        app.server
            .post("/api/chat")
            .json(&json!({
                "model": "qwen3-max",
                "stream": false,
                "messages": [{"role": "user", "content": "again"}]
            }))
            .await
            .assert_status_ok();
    }

    assert_eq!(app.vendor.requests_to(NEW_CHAT_PATH).await.len(), 2);
    let bodies = app.vendor.completion_bodies().await;
    assert!(bodies.iter().all(|b| b["parent_id"].is_null()));
}
