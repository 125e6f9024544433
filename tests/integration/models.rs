//! Models endpoint integration tests
//!
//! - GET /v1/models - Active vendor models, `:latest` tagged in Ollama mode
//! - GET /v1/models/{id} - Model details with context and reasoning info
//! - GET /api/tags, /api/ps, POST /api/show - Ollama model metadata

use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::common::{TestApp, DEFAULT_MODEL};
use crate::mocks::VendorTestData;

async fn with_models(app: &TestApp) {
    app.vendor
        .mock_models(vec![
            VendorTestData::model("qwen3-max", 262_144),
            VendorTestData::model("qwen3-coder-plus", 1_048_576),
            VendorTestData::inactive_model("qwen-legacy"),
        ])
        .await;
}

fn ids(json: &Value, list: &str, field: &str) -> Vec<String> {
    json[list]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m[field].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_list_models_active_only() {
    let app = TestApp::openai().await;
    with_models(&app).await;

    let response = app.server.get("/v1/models").await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["object"], "list");
    assert_eq!(ids(&json, "data", "id"), vec!["qwen3-max", "qwen3-coder-plus"]);

    let first = &json["data"][0];
    assert_eq!(first["object"], "model");
    assert_eq!(first["owned_by"], "library");
    assert_eq!(first["info"]["meta"]["max_context_length"], 262_144);
}

#[tokio::test]
async fn test_list_models_tagged_in_ollama_mode() {
    let app = TestApp::ollama().await;
    with_models(&app).await;

    let json: Value = app.server.get("/v1/models").await.json();

    assert_eq!(
        ids(&json, "data", "id"),
        vec!["qwen3-max:latest", "qwen3-coder-plus:latest"]
    );
}

#[tokio::test]
async fn test_list_models_falls_back_to_default() {
    let app = TestApp::openai().await;

    let json: Value = app.server.get("/v1/models").await.json();

    assert_eq!(ids(&json, "data", "id"), vec![DEFAULT_MODEL]);
}

#[tokio::test]
async fn test_get_model_details() {
    let app = TestApp::openai().await;
    with_models(&app).await;

    let response = app.server.get("/v1/models/qwen3-max").await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["id"], "qwen3-max");
    assert_eq!(json["contextWindow"], 262_144);
    assert_eq!(json["reservedOutputTokenSpace"], 8192);
    assert_eq!(json["reasoningCapabilities"]["supportsReasoning"], true);
    assert_eq!(json["capabilities"]["vision"], true);
}

#[tokio::test]
async fn test_get_model_strips_latest_tag() {
    let app = TestApp::ollama().await;
    with_models(&app).await;

    let response = app.server.get("/v1/models/qwen3-coder-plus:latest").await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["id"], "qwen3-coder-plus:latest");
    assert_eq!(json["contextWindow"], 1_048_576);
}

#[tokio::test]
async fn test_get_model_unknown_is_404() {
    let app = TestApp::openai().await;
    with_models(&app).await;

    let response = app.server.get("/v1/models/gpt-4o").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let json: Value = response.json();
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_ollama_tags_and_ps() {
    let app = TestApp::ollama().await;
    with_models(&app).await;

    let tags: Value = app.server.get("/api/tags").await.json();
    assert_eq!(
        ids(&tags, "models", "name"),
        vec!["qwen3-max:latest", "qwen3-coder-plus:latest"]
    );
    assert_eq!(tags["models"][0]["details"]["family"], "qwen");

    let ps: Value = app.server.get("/api/ps").await.json();
    assert_eq!(ps["models"].as_array().unwrap().len(), 2);
    assert!(ps["models"][0]["expires_at"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_ollama_show() {
    let app = TestApp::ollama().await;
    with_models(&app).await;

    let response = app
        .server
        .post("/api/show")
        .json(&json!({"model": "qwen3-max:latest"}))
        .await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["details"]["parameter_size"], "262144");
    assert_eq!(json["model_info"]["qwen.context_length"], 262_144);
    assert!(json["modelfile"].as_str().unwrap().contains("FROM qwen3-max"));
}

#[tokio::test]
async fn test_ollama_show_unknown_is_404() {
    let app = TestApp::ollama().await;
    with_models(&app).await;

    let response = app
        .server
        .post("/api/show")
        .json(&json!({"model": "llama3"}))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ollama_routes_absent_in_openai_mode() {
    let app = TestApp::openai().await;

    let response = app.server.get("/api/tags").await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ollama_root_and_version() {
    let app = TestApp::ollama().await;

    let root = app.server.get("/").await;
    root.assert_status_ok();
    assert_eq!(root.text(), "Ollama is running");

    let version: Value = app.server.get("/api/version").await.json();
    assert_eq!(version["version"], "0.11.7");
}
