//! Per-request logging context
//!
//! Provides structured logging with correlation IDs so that the lines of one
//! client request can be followed through translation, upload and streaming.

use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Context for tracking a request through the system
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique identifier for this request (for log correlation)
    pub trace_id: String,
    /// When the request started
    pub start_time: Instant,
    /// Client-facing endpoint being served
    pub endpoint: String,
    /// Model requested by the client
    pub model: Option<String>,
    /// Whether this is a streaming request
    pub streaming: bool,
    /// Vendor chat session serving this request
    pub session_id: Option<String>,
}

impl RequestContext {
    /// Create a new request context
    pub fn new(endpoint: &str) -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string()[..8].to_string(),
            start_time: Instant::now(),
            endpoint: endpoint.to_string(),
            model: None,
            streaming: false,
            session_id: None,
        }
    }

    /// Set the model for this request
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Mark this as a streaming request
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Record the vendor session
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u128 {
        self.start_time.elapsed().as_millis()
    }

    /// Log request initiation
    pub fn log_request_start(&self) {
        info!(
            trace_id = %self.trace_id,
            endpoint = %self.endpoint,
            model = ?self.model,
            streaming = %self.streaming,
            "Request started"
        );
    }

    /// Log the translated vendor request
    pub fn log_translated(&self, content_chars: usize, files: usize) {
        debug!(
            trace_id = %self.trace_id,
            session_id = ?self.session_id,
            content_chars = %content_chars,
            files = %files,
            elapsed_ms = %self.elapsed_ms(),
            "Request translated for vendor"
        );
    }

    /// Log stream started
    pub fn log_stream_started(&self) {
        info!(
            trace_id = %self.trace_id,
            endpoint = %self.endpoint,
            session_id = ?self.session_id,
            elapsed_ms = %self.elapsed_ms(),
            "Streaming response started"
        );
    }

    /// Log stream ended
    pub fn log_stream_ended(&self, lines: usize) {
        info!(
            trace_id = %self.trace_id,
            endpoint = %self.endpoint,
            lines = %lines,
            elapsed_ms = %self.elapsed_ms(),
            "Streaming response ended"
        );
    }

    /// Log successful non-streaming completion
    pub fn log_request_complete(&self, content_chars: usize) {
        info!(
            trace_id = %self.trace_id,
            endpoint = %self.endpoint,
            model = ?self.model,
            content_chars = %content_chars,
            elapsed_ms = %self.elapsed_ms(),
            "Request completed successfully"
        );
    }

    /// Log a warning condition
    pub fn log_warning(&self, message: &str) {
        warn!(
            trace_id = %self.trace_id,
            endpoint = %self.endpoint,
            elapsed_ms = %self.elapsed_ms(),
            message = %message,
            "Warning during request"
        );
    }

    /// Log request failure
    pub fn log_error(&self, error: &str) {
        error!(
            trace_id = %self.trace_id,
            endpoint = %self.endpoint,
            model = ?self.model,
            streaming = %self.streaming,
            session_id = ?self.session_id,
            elapsed_ms = %self.elapsed_ms(),
            error = %error,
            "Request failed"
        );
    }
}
