//! Health check endpoint
//!
//! `/health` reports uptime, the active facade mode and whether the vendor
//! model list can be loaded.

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::{AppState, FacadeMode};

/// Health status enum
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Vendor reachability check
#[derive(Debug, Serialize)]
pub struct VendorCheck {
    pub status: HealthStatus,
    pub latency_ms: u64,
    pub models: usize,
}

/// Full health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub mode: String,
    pub uptime_seconds: u64,
    pub timestamp: String,
    pub vendor: VendorCheck,
    pub upload_cache_entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

async fn check_vendor(state: &AppState) -> VendorCheck {
    let start = Instant::now();
    let models = state.catalog.models().await.len();

    VendorCheck {
        status: if models > 0 {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        },
        latency_ms: start.elapsed().as_millis() as u64,
        models,
    }
}

/// Health check endpoint
///
/// Always answers 200: the facade keeps serving with a default model when
/// the vendor model list is unavailable, so that case is only "degraded".
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let vendor = check_vendor(&state).await;

    let response = HealthResponse {
        status: vendor.status.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        mode: match state.config.mode {
            FacadeMode::OpenAi => "openai",
            FacadeMode::Ollama => "ollama",
        }
        .to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        vendor,
        upload_cache_entries: state.upload_cache.len(),
        session_id: state.sessions.current().await.map(|s| s.chat_id),
    };

    (StatusCode::OK, Json(response))
}
