//! Common test utilities for Mirage
//!
//! Builds the full application against a [`MockVendor`] and decodes the
//! streamed wire formats the facade emits.

#![allow(dead_code)]

use std::sync::Arc;

use axum_test::TestServer;
use serde_json::Value;

use mirage::{routes, AppState, Config, FacadeMode};

use crate::mocks::MockVendor;

/// Default model configured for every test app
pub const DEFAULT_MODEL: &str = "qwen3-235b-a22b";

/// A running Mirage router wired to a mock vendor
pub struct TestApp {
    pub server: TestServer,
    pub vendor: MockVendor,
    pub state: Arc<AppState>,
}

impl TestApp {
    /// OpenAI mode with a fresh mock vendor
    pub async fn openai() -> Self {
        Self::start(FacadeMode::OpenAi).await
    }

    /// Ollama mode with a fresh mock vendor
    pub async fn ollama() -> Self {
        Self::start(FacadeMode::Ollama).await
    }

    pub async fn start(mode: FacadeMode) -> Self {
        let vendor = MockVendor::start().await;
        let config = Config {
            mode,
            default_model: DEFAULT_MODEL.to_string(),
            ..Config::for_vendor(&vendor.uri())
        };

        let state = Arc::new(AppState::new(config).expect("Failed to build app state"));
        let app = routes::create_router(state.clone());
        let server = TestServer::new(app).expect("Failed to create test server");

        Self {
            server,
            vendor,
            state,
        }
    }
}

/// JSON payloads of an SSE body, skipping the `[DONE]` terminator
pub fn sse_events(body: &str) -> Vec<Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .filter(|data| *data != "[DONE]")
        .map(|data| serde_json::from_str(data).expect("SSE payload is JSON"))
        .collect()
}

/// Concatenated `delta.content` of an OpenAI chunk stream
pub fn sse_content(body: &str) -> String {
    sse_events(body)
        .iter()
        .filter_map(|event| event["choices"][0]["delta"]["content"].as_str())
        .collect()
}

/// One JSON object per non-empty line
pub fn ndjson(body: &str) -> Vec<Value> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("NDJSON line is JSON"))
        .collect()
}
