use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use humorflow_core::SanitizedConfig;
use serde::Serialize;
use std::sync::Arc;

use super::middleware::CurrentIdentity;
use crate::metrics::encode_metrics;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(
    State(state): State<Arc<AppState>>,
    CurrentIdentity(_): CurrentIdentity,
) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

/// GET /api/v1/metrics
pub async fn get_metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
