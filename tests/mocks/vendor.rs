//! Mock vendor web API for testing
//!
//! Provides wiremock-based mocks for the endpoints Mirage calls:
//! - GET /api/models - Model listing
//! - POST /api/v2/chats/new - Session creation
//! - POST /api/v2/chat/completions - Event stream for one user turn
//! - POST /upload - Anonymous file host
//!
//! # Example
//!
//! ```rust,ignore
//! let vendor = MockVendor::start().await;
//! vendor.mock_new_chat("chat-1").await;
//! vendor
//!     .mock_completion(&[VendorTestData::answer("Hi"), VendorTestData::finish()])
//!     .await;
//! ```

use serde_json::{json, Value};
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, Request, ResponseTemplate,
};

pub const NEW_CHAT_PATH: &str = "/api/v2/chats/new";
pub const COMPLETIONS_PATH: &str = "/api/v2/chat/completions";
pub const UPLOAD_PATH: &str = "/upload";

/// Mock vendor server wrapper
pub struct MockVendor {
    server: MockServer,
}

impl MockVendor {
    /// Start a new mock vendor server
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL; `Config::for_vendor` derives the API and upload URLs from it
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    // =========================================================================
    // GET /api/models
    // =========================================================================

    pub async fn mock_models(&self, models: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path("/api/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": models })))
            .mount(&self.server)
            .await;
    }

    // =========================================================================
    // POST /api/v2/chats/new
    // =========================================================================

    /// Every session creation returns `chat_id`
    pub async fn mock_new_chat(&self, chat_id: &str) {
        Mock::given(method("POST"))
            .and(path(NEW_CHAT_PATH))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": { "id": chat_id }
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_new_chat_failure(&self) {
        Mock::given(method("POST"))
            .and(path(NEW_CHAT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "data": { "code": "Unauthorized", "details": "Please log in" }
            })))
            .mount(&self.server)
            .await;
    }

    // =========================================================================
    // POST /api/v2/chat/completions
    // =========================================================================

    /// Answer every completion with `events` as an event stream
    pub async fn mock_completion(&self, events: &[Value]) {
        Mock::given(method("POST"))
            .and(path(COMPLETIONS_PATH))
            .respond_with(sse_response(VendorTestData::sse(events)))
            .mount(&self.server)
            .await;
    }

    /// Answer completions for `chat_id` with a raw event-stream body
    pub async fn mock_completion_raw(&self, chat_id: &str, body: &str) {
        Mock::given(method("POST"))
            .and(path(COMPLETIONS_PATH))
            .and(query_param("chat_id", chat_id))
            .respond_with(sse_response(body.to_string()))
            .mount(&self.server)
            .await;
    }

    /// Reject completions the way the vendor does while a chat is busy
    pub async fn mock_completion_in_progress(&self) {
        Mock::given(method("POST"))
            .and(path(COMPLETIONS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "data": { "code": "Bad_Request", "details": "The chat is in progress!" }
            })))
            .mount(&self.server)
            .await;
    }

    // =========================================================================
    // POST /upload
    // =========================================================================

    pub async fn mock_upload(&self, file_url: &str) {
        Mock::given(method("POST"))
            .and(path(UPLOAD_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!("{}\n", file_url)))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_upload_failure(&self) {
        Mock::given(method("POST"))
            .and(path(UPLOAD_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("disk full"))
            .mount(&self.server)
            .await;
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub async fn requests_to(&self, request_path: &str) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == request_path)
            .collect()
    }

    /// JSON bodies of every completions call, in order
    pub async fn completion_bodies(&self) -> Vec<Value> {
        self.requests_to(COMPLETIONS_PATH)
            .await
            .iter()
            .map(|r| serde_json::from_slice(&r.body).expect("completion body is JSON"))
            .collect()
    }
}

fn sse_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

/// Builders for vendor stream events and model records
pub struct VendorTestData;

impl VendorTestData {
    pub fn created(parent_id: &str, response_id: &str) -> Value {
        json!({ "response.created": { "parent_id": parent_id, "response_id": response_id } })
    }

    pub fn answer(text: &str) -> Value {
        json!({ "choices": [{ "delta": { "role": "assistant", "content": text, "phase": "answer", "status": "typing" } }] })
    }

    pub fn think(text: &str) -> Value {
        json!({ "choices": [{ "delta": { "role": "assistant", "content": text, "phase": "think", "status": "typing" } }] })
    }

    pub fn think_finished() -> Value {
        json!({ "choices": [{ "delta": { "content": "", "phase": "think", "status": "finished" } }] })
    }

    pub fn finish() -> Value {
        json!({ "choices": [{ "delta": { "content": "" }, "finish_reason": "stop" }] })
    }

    pub fn finish_with_usage(input: u64, output: u64) -> Value {
        json!({
            "choices": [{ "delta": { "content": "" }, "finish_reason": "stop" }],
            "usage": { "input_tokens": input, "output_tokens": output, "total_tokens": input + output }
        })
    }

    pub fn model(id: &str, context_length: u64) -> Value {
        json!({
            "id": id,
            "info": {
                "is_active": true,
                "meta": {
                    "max_context_length": context_length,
                    "max_generation_length": 8192,
                    "capabilities": { "vision": true, "thinking": true }
                }
            }
        })
    }

    pub fn inactive_model(id: &str) -> Value {
        json!({ "id": id, "info": { "is_active": false } })
    }

    /// `data:` lines for `events` followed by the terminator
    pub fn sse(events: &[Value]) -> String {
        let mut body: String = events
            .iter()
            .map(|event| format!("data: {}\n\n", event))
            .collect();
        body.push_str("data: [DONE]\n\n");
        body
    }
}
