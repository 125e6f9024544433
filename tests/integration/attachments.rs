//! Attachment upload integration tests
//!
//! Inline images are uploaded to the file host once per session and sent to
//! the vendor as file descriptors pointing at the hosted copy.

use base64::Engine;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::TestApp;
use crate::mocks::{VendorTestData, UPLOAD_PATH};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDRmirage";
const HOSTED_URL: &str = "https://files.example/abc123.png";

fn png_base64() -> String {
    base64::engine::general_purpose::STANDARD.encode(PNG)
}

fn image_turn() -> Value {
    json!({
        "model": "qwen3-max",
        "messages": [{
            "role": "user",
            "content": [
                {"type": "text", "text": "What is in this picture?"},
                {"type": "image_url", "image_url": {"url": format!("data:image/png;base64,{}", png_base64())}}
            ]
        }]
    })
}

async fn answering(app: &TestApp) {
    app.vendor.mock_new_chat("chat-1").await;
    app.vendor
        .mock_completion(&[VendorTestData::answer("A pixel."), VendorTestData::finish()])
        .await;
}

#[tokio::test]
async fn test_image_uploaded_and_attached() {
    let app = TestApp::openai().await;
    answering(&app).await;
    app.vendor.mock_upload(HOSTED_URL).await;

    app.server
        .post("/v1/chat/completions")
        .json(&image_turn())
        .await
        .assert_status_ok();

    let uploads = app.vendor.requests_to(UPLOAD_PATH).await;
    assert_eq!(uploads.len(), 1);

    let bodies = app.vendor.completion_bodies().await;
    let files = bodies[0]["messages"][0]["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["url"], HOSTED_URL);
    assert_eq!(files[0]["file_type"], "image/png");
    assert_eq!(files[0]["showType"], "image");
    assert!(files[0]["name"].as_str().unwrap().ends_with(".png"));
}

#[tokio::test]
async fn test_repeat_image_served_from_cache() {
    let app = TestApp::openai().await;
    answering(&app).await;
    app.vendor.mock_upload(HOSTED_URL).await;

    for _ in 0..2 {
        app.server
            .post("/v1/chat/completions")
            .json(&image_turn())
            .await
            .assert_status_ok();
    }

    assert_eq!(app.vendor.requests_to(UPLOAD_PATH).await.len(), 1);
    assert_eq!(app.state.upload_cache.len(), 1);

    let bodies = app.vendor.completion_bodies().await;
    assert_eq!(bodies[1]["messages"][0]["files"][0]["url"], HOSTED_URL);
}

#[tokio::test]
async fn test_new_session_clears_upload_cache() {
    let app = TestApp::ollama().await;
    answering(&app).await;
    app.vendor.mock_upload(HOSTED_URL).await;

    let request = json!({
        "model": "qwen3-max",
        "prompt": "Describe it",
        "images": [png_base64()],
        "stream": false
    });
    for _ in 0..2 {
        app.server
            .post("/api/generate")
            .json(&request)
            .await
            .assert_status_ok();
    }

    // Every Ollama request starts a fresh session, so nothing is reused
    assert_eq!(app.vendor.requests_to(UPLOAD_PATH).await.len(), 2);
}

#[tokio::test]
async fn test_failed_upload_does_not_fail_request() {
    let app = TestApp::openai().await;
    answering(&app).await;
    app.vendor.mock_upload_failure().await;

    let response = app.server.post("/v1/chat/completions").json(&image_turn()).await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["choices"][0]["message"]["content"], "A pixel.");

    let bodies = app.vendor.completion_bodies().await;
    assert_eq!(bodies[0]["messages"][0]["files"], json!([]));
    assert!(app.state.upload_cache.is_empty());
}
