//! Ollama-compatible endpoints
//!
//! Mounted only in Ollama mode. Model metadata is synthesized: the vendor
//! exposes none of the local-runtime details Ollama clients expect.

use std::sync::Arc;

use axum::{body::Bytes, extract::State, response::Response, routing::{get, post}, Json, Router};
use chrono::{Duration, SecondsFormat, Utc};
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::models::listed_models;
use super::{parse_body, reply_response, NDJSON_CONTENT_TYPE};
use crate::{
    error::{AppError, AppResult},
    facade::Surface,
    protocol::ollama::{with_latest, ChatRequest, GenerateRequest, ShowRequest},
    tokens::DEFAULT_CONTEXT_LENGTH,
    AppState,
};

pub const OLLAMA_VERSION: &str = "0.11.7";
const MODEL_DIGEST: &str = "365c0bd3c000a25d28ddbf732fe1c6add414de7275464c4e4d1c3b5fcb5d8ad1";
const TAG_SIZE: u64 = 4_661_224_676;
const LOADED_SIZE: u64 = 6_654_289_920;

const LICENSE: &str = "DEMO LICENSE AGREEMENT\n\n\
    This is a demo model for testing purposes.\n\n\
    By using this model, you agree to use it responsibly and in accordance with applicable laws.\n\n\
    This model is provided 'as is' without any warranties.";

const TEMPLATE: &str = "{{ if .System }}<|start_header_id|>system<|end_header_id|>\n\n\
    {{ .System }}<|eot_id|>{{ end }}{{ if .Prompt }}<|start_header_id|>user<|end_header_id|>\n\n\
    {{ .Prompt }}<|eot_id|>{{ end }}<|start_header_id|>assistant<|end_header_id|>\n\n\
    {{ .Response }}<|eot_id|>";

const PARAMETERS: &str = "num_keep                       24\n\
    stop                           \"<|start_header_id|>\"\n\
    stop                           \"<|end_header_id|>\"\n\
    stop                           \"<|eot_id|>\"";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root))
        .route("/api/version", get(version))
        .route("/api/tags", get(tags))
        .route("/api/ps", get(ps))
        .route("/api/show", post(show))
        .route("/api/generate", post(generate))
        .route("/api/chat", post(chat))
}

fn details(parameter_size: &str) -> Value {
    json!({
        "parent_model": "",
        "format": "gguf",
        "family": "qwen",
        "families": ["qwen"],
        "parameter_size": parameter_size,
        "quantization_level": "Q4_0"
    })
}

fn timestamp(offset: Duration) -> String {
    (Utc::now() + offset).to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub async fn root() -> &'static str {
    "Ollama is running"
}

pub async fn version() -> Json<Value> {
    Json(json!({ "version": OLLAMA_VERSION }))
}

/// Installed models
pub async fn tags(State(state): State<Arc<AppState>>) -> Json<Value> {
    let modified_at = timestamp(Duration::zero());
    let models: Vec<Value> = listed_models(&state)
        .await
        .iter()
        .map(|model| {
            let name = with_latest(&model.id);
            json!({
                "name": name,
                "model": name,
                "modified_at": modified_at,
                "size": TAG_SIZE,
                "digest": MODEL_DIGEST,
                "details": details("235B"),
            })
        })
        .collect();

    Json(json!({ "models": models }))
}

/// Loaded models; every vendor model counts as loaded for half an hour
pub async fn ps(State(state): State<Arc<AppState>>) -> Json<Value> {
    let expires_at = timestamp(Duration::minutes(30));
    let models: Vec<Value> = listed_models(&state)
        .await
        .iter()
        .map(|model| {
            let name = with_latest(&model.id);
            json!({
                "name": name,
                "model": name,
                "size": LOADED_SIZE,
                "digest": MODEL_DIGEST,
                "details": details("235B"),
                "expires_at": expires_at,
                "size_vram": LOADED_SIZE,
            })
        })
        .collect();

    Json(json!({ "models": models }))
}

/// Model card for one model
pub async fn show(State(state): State<Arc<AppState>>, body: Bytes) -> AppResult<Json<Value>> {
    let request: ShowRequest = parse_body(&body)?;
    let id = request.model_id().to_string();

    let model = state
        .catalog
        .find(&id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Model {} not found", id)))?;
    let context_length = model.max_context_length.unwrap_or(DEFAULT_CONTEXT_LENGTH);

    let modelfile = format!(
        "# Modelfile generated by \"ollama show\"\n\
         # To build a new Modelfile based on this, replace FROM with:\n\
         # FROM {id}:latest\n\n\
         FROM {id}\n\
         TEMPLATE \"{TEMPLATE}\"\n\
         PARAMETER num_keep 24\n\
         PARAMETER stop \"<|start_header_id|>\"\n\
         PARAMETER stop \"<|end_header_id|>\"\n\
         PARAMETER stop \"<|eot_id|>\"\n\
         LICENSE \"{LICENSE}\""
    );

    Ok(Json(json!({
        "license": LICENSE,
        "modelfile": modelfile,
        "parameters": PARAMETERS,
        "template": TEMPLATE,
        "details": details(&context_length.to_string()),
        "model_info": {
            "general.architecture": "qwen",
            "general.file_type": 2,
            "general.parameter_count": context_length * 1000,
            "general.quantization_version": 2,
            "qwen.attention.head_count": 32,
            "qwen.attention.head_count_kv": 8,
            "qwen.block_count": 32,
            "qwen.context_length": context_length,
            "qwen.embedding_length": 4096,
            "qwen.feed_forward_length": 14336,
            "qwen.vocab_size": 128256,
            "tokenizer.ggml.model": "gpt2",
            "tokenizer.ggml.pre": "qwen-bpe"
        },
        "capabilities": ["completion"],
        "modified_at": timestamp(Duration::zero()),
    })))
}

/// `POST /api/generate`
#[instrument(skip_all, fields(endpoint = "/api/generate"))]
pub async fn generate(State(state): State<Arc<AppState>>, body: Bytes) -> AppResult<Response> {
    let request: GenerateRequest = parse_body(&body)?;
    let request = request.into_chat_request();
    if request.messages.is_empty() {
        return Err(AppError::BadRequest("prompt must not be empty".to_string()));
    }

    info!(model = %request.model, stream = %request.stream, "Processing generate request");

    let reply = state.facade.complete(request, Surface::OllamaGenerate).await?;
    reply_response(reply, NDJSON_CONTENT_TYPE)
}

/// `POST /api/chat`
#[instrument(skip_all, fields(endpoint = "/api/chat"))]
pub async fn chat(State(state): State<Arc<AppState>>, body: Bytes) -> AppResult<Response> {
    let request: ChatRequest = parse_body(&body)?;
    let request = request.into_chat_request();
    if request.messages.is_empty() {
        return Err(AppError::BadRequest("messages must not be empty".to_string()));
    }

    info!(
        model = %request.model,
        stream = %request.stream,
        messages = %request.messages.len(),
        "Processing Ollama chat request"
    );

    let reply = state.facade.complete(request, Surface::OllamaChat).await?;
    reply_response(reply, NDJSON_CONTENT_TYPE)
}
