//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub search: CheckResult,
    pub llm: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    pub engine: String,
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: scout_common::VERSION.to_string(),
    })
}

/// Readiness probe - reports which backends are live and which are stand-ins
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let engine = state.pipeline.search_engine();
    let search = CheckResult {
        status: if engine == "simulated" { "simulated" } else { "configured" }.to_string(),
        engine: engine.to_string(),
    };

    let has_key = state
        .config
        .llm
        .api_key
        .as_deref()
        .is_some_and(|key| !key.is_empty());
    let llm = CheckResult {
        status: if has_key { "configured" } else { "offline" }.to_string(),
        engine: state.pipeline.model_name().to_string(),
    };

    let all_live = search.status == "configured" && llm.status == "configured";

    Json(ReadyResponse {
        status: if all_live { "ready" } else { "degraded" }.to_string(),
        checks: HealthChecks { search, llm },
    })
}
