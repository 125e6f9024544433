//! Error types for Mirage
//!
//! This module defines custom error types used throughout the application.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Failed to create vendor chat session: {0}")]
    SessionCreation(String),

    #[error("Vendor rejected the request: {0}")]
    Vendor(String),

    #[error("Upstream error: {0}")]
    UpstreamError(String),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error details, shaped like the OpenAI error object
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl AppError {
    /// Message safe to show to API clients
    pub fn client_message(&self) -> String {
        match self {
            AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Vendor(msg)
            | AppError::UpstreamError(msg) => msg.clone(),
            AppError::SessionCreation(_) => "Failed to create chat session".to_string(),
            AppError::HttpError(_) => "Upstream service error".to_string(),
            AppError::JsonError(_) => "Invalid JSON in request".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, kind) = match &self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", "invalid_request_error"),
            AppError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", "invalid_request_error")
            }
            AppError::SessionCreation(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SESSION_CREATION_FAILED",
                "server_error",
            ),
            AppError::Vendor(_) => (StatusCode::BAD_GATEWAY, "VENDOR_ERROR", "server_error"),
            AppError::UpstreamError(_) | AppError::HttpError(_) => {
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", "server_error")
            }
            AppError::JsonError(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_JSON", "invalid_request_error")
            }
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "server_error",
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.client_message(),
                kind: kind.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
