//! Models endpoints
//!
//! `/v1/models` lists the vendor's active models; `/v1/models/{id}` describes
//! one of them with the context and reasoning details editors look for.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    protocol::ollama::{strip_latest, with_latest},
    protocol::openai::{Model, ModelsResponse},
    tokens::DEFAULT_CONTEXT_LENGTH,
    vendor::ModelDescriptor,
    AppState, FacadeMode,
};

/// Output space reserved when the vendor does not say
const DEFAULT_GENERATION_LENGTH: u64 = 8192;

/// Vendor models, or just the default model when the list is unavailable
pub(crate) async fn listed_models(state: &AppState) -> Vec<ModelDescriptor> {
    let models = state.catalog.models().await;
    if models.is_empty() {
        vec![ModelDescriptor::named(state.config.default_model.clone())]
    } else {
        models
    }
}

/// List available models
pub async fn list_models(State(state): State<Arc<AppState>>) -> Json<ModelsResponse> {
    let created = Utc::now().timestamp();
    let ollama = state.config.mode == FacadeMode::Ollama;

    let data = listed_models(&state)
        .await
        .into_iter()
        .map(|model| Model {
            id: if ollama { with_latest(&model.id) } else { model.id.clone() },
            object: "model".to_string(),
            created,
            owned_by: "library".to_string(),
            info: Some(model.info()),
        })
        .collect();

    Json(ModelsResponse {
        object: "list".to_string(),
        data,
    })
}

/// Describe one model
pub async fn get_model(
    State(state): State<Arc<AppState>>,
    Path(model_id): Path<String>,
) -> AppResult<Json<Value>> {
    let id = strip_latest(&model_id);
    let model = state
        .catalog
        .find(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Model {} not found", model_id)))?;

    Ok(Json(model_details(&model_id, &model)))
}

fn capability(model: &ModelDescriptor, name: &str) -> bool {
    model
        .capabilities
        .get(name)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn model_details(model_id: &str, model: &ModelDescriptor) -> Value {
    let reasoning = capability(model, "thinking") || capability(model, "thinking_budget");
    let think_tags: Vec<&str> = if reasoning {
        vec!["<think>", "</think>"]
    } else {
        Vec::new()
    };

    json!({
        "id": model_id,
        "object": "model",
        "created": Utc::now().timestamp(),
        "owned_by": "qwen",
        "permission": [],
        "root": model_id,
        "parent": null,
        "contextWindow": model.max_context_length.unwrap_or(DEFAULT_CONTEXT_LENGTH),
        "reservedOutputTokenSpace": model
            .max_thinking_generation_length
            .or(model.max_generation_length)
            .unwrap_or(DEFAULT_GENERATION_LENGTH),
        "supportsSystemMessage": "system-role",
        "reasoningCapabilities": {
            "supportsReasoning": reasoning,
            "canTurnOffReasoning": reasoning,
            "canIOReasoning": reasoning,
            "openSourceThinkTags": think_tags,
        },
        "capabilities": {
            "vision": capability(model, "vision"),
            "function_calling": true,
            "json_output": true,
            "streaming": true,
            "document": capability(model, "document"),
            "video": capability(model, "video"),
            "audio": capability(model, "audio"),
            "citations": capability(model, "citations"),
        },
    })
}
