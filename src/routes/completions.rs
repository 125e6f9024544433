//! Legacy completions endpoint
//!
//! The vendor only speaks chat, so `POST /v1/completions` points clients at
//! the chat completions endpoint instead.

use crate::error::{AppError, AppResult};

pub async fn completions() -> AppResult<()> {
    Err(AppError::BadRequest(
        "The completions endpoint is deprecated, use /v1/chat/completions".to_string(),
    ))
}
