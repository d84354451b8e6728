//! Caption pipeline API handler.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use humorflow_core::{PipelineOutcome, PipelineRequest};
use serde::Deserialize;
use tracing::{info, warn};

use super::middleware::AdminIdentity;
use super::{api_error, ApiError};
use crate::metrics::AUTH_FAILURES_TOTAL;
use crate::state::AppState;

// ============================================================================
// Request types
// ============================================================================

/// Body of `POST /api/v1/pipeline`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunPipelineRequest {
    #[serde(default)]
    pub flavor_id: Option<i64>,
    /// Image bytes, base64 encoded. A `data:` URL prefix is accepted.
    #[serde(default)]
    pub image_base64: Option<String>,
    #[serde(default)]
    pub image_mime: Option<String>,
    #[serde(default)]
    pub image_additional_context: Option<String>,
}

impl RunPipelineRequest {
    /// Check required fields and decode the image.
    pub fn into_pipeline_request(self) -> Result<PipelineRequest, String> {
        let flavor_id = self
            .flavor_id
            .filter(|id| *id != 0)
            .ok_or_else(|| "flavorId is required".to_string())?;

        let encoded = self
            .image_base64
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| "imageBase64 is required".to_string())?;
        let image_bytes = decode_image(&encoded)?;

        let mime = self
            .image_mime
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| "imageMime is required".to_string())?;
        if is_unsupported_mime(&mime) {
            return Err(format!(
                "{} images are not supported; convert to JPEG or PNG first",
                mime
            ));
        }

        let mut request = PipelineRequest::new(flavor_id, image_bytes, mime);
        if let Some(context) = self.image_additional_context {
            request = request.with_additional_context(context);
        }
        Ok(request)
    }
}

/// HEIC/HEIF uploads are accepted by the bucket but fail in caption generation.
fn is_unsupported_mime(mime: &str) -> bool {
    let mime = mime.trim().to_ascii_lowercase();
    mime == "image/heic" || mime == "image/heif"
}

fn decode_image(encoded: &str) -> Result<Vec<u8>, String> {
    let payload = match encoded.split_once("base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| format!("imageBase64 is not valid base64: {}", e))?;
    if bytes.is_empty() {
        return Err("imageBase64 decodes to an empty image".to_string());
    }
    Ok(bytes)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/pipeline
///
/// Run the caption pipeline for one image. Step failures are reported in
/// the body with status 200; only precondition and access problems map to
/// error statuses.
pub async fn run_pipeline(
    State(state): State<Arc<AppState>>,
    AdminIdentity(identity): AdminIdentity,
    payload: Result<Json<RunPipelineRequest>, JsonRejection>,
) -> Result<Json<PipelineOutcome>, ApiError> {
    let token = state.upstream_token(&identity).ok_or_else(|| {
        AUTH_FAILURES_TOTAL
            .with_label_values(&["no_upstream_token"])
            .inc();
        api_error(
            StatusCode::UNAUTHORIZED,
            "No session token available for the caption pipeline",
        )
    })?;

    let Json(body) = payload.map_err(|e| {
        let status = match e.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        api_error(status, e.body_text())
    })?;
    let request = body
        .into_pipeline_request()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;

    info!(
        user_id = %identity.user_id,
        flavor_id = ?request.flavor_id,
        "Caption pipeline requested"
    );

    let outcome = state
        .runner()
        .run(&request, &token)
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    if let Some(failed) = outcome.failed_step() {
        warn!(step = %failed.step, detail = %failed.detail, "Caption pipeline halted");
    }

    Ok(Json(outcome))
}
