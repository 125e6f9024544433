//! Chat completions endpoint
//!
//! OpenAI-compatible `POST /v1/chat/completions`. Streaming replies are
//! server-sent events ending in `data: [DONE]`.

use std::sync::Arc;

use axum::{body::Bytes, extract::State, response::Response};
use tracing::{info, instrument};

use super::{parse_body, reply_response, SSE_CONTENT_TYPE};
use crate::{
    error::{AppError, AppResult},
    facade::Surface,
    protocol::ChatCompletionRequest,
    AppState,
};

/// Handle chat completion requests
#[instrument(skip_all, fields(endpoint = "/v1/chat/completions"))]
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> AppResult<Response> {
    let request: ChatCompletionRequest = parse_body(&body)?;
    if request.messages.is_empty() {
        return Err(AppError::BadRequest("messages must not be empty".to_string()));
    }

    info!(
        model = %request.model,
        stream = %request.stream,
        messages = %request.messages.len(),
        "Processing chat completion request"
    );

    let reply = state.facade.complete(request, Surface::OpenAiChat).await?;
    reply_response(reply, SSE_CONTENT_TYPE)
}
