//! Flavor catalog API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use humorflow_core::{
    CatalogError, Flavor, FlavorInput, FlavorStep, LookupInput, LookupItem, LookupKind,
    StepInput,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::middleware::{AdminIdentity, CurrentIdentity};
use super::{api_error, ApiError, SuccessResponse};
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct FlavorQueryParams {
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FlavorListResponse {
    pub flavors: Vec<Flavor>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct FlavorStepsResponse {
    pub flavor: Flavor,
    pub steps: Vec<FlavorStep>,
}

#[derive(Debug, Serialize)]
pub struct LookupListResponse {
    pub kind: LookupKind,
    pub items: Vec<LookupItem>,
}

fn catalog_error(e: CatalogError) -> ApiError {
    let status = match &e {
        CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
        CatalogError::Validation(_) => StatusCode::BAD_REQUEST,
        CatalogError::Conflict(_) => StatusCode::CONFLICT,
        CatalogError::Database(_) => {
            error!("Flavor catalog error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    api_error(status, e.to_string())
}

fn parse_kind(kind: &str) -> Result<LookupKind, ApiError> {
    kind.parse::<LookupKind>()
        .map_err(|e| api_error(StatusCode::NOT_FOUND, e))
}

// ============================================================================
// Flavors
// ============================================================================

/// GET /api/v1/flavors
pub async fn list_flavors(
    State(state): State<Arc<AppState>>,
    CurrentIdentity(_): CurrentIdentity,
    Query(params): Query<FlavorQueryParams>,
) -> Result<Json<FlavorListResponse>, ApiError> {
    let flavors = state
        .flavor_store()
        .list_flavors(params.search.as_deref())
        .map_err(catalog_error)?;
    let total = flavors.len();
    Ok(Json(FlavorListResponse { flavors, total }))
}

/// GET /api/v1/flavors/{id}
pub async fn get_flavor(
    State(state): State<Arc<AppState>>,
    CurrentIdentity(_): CurrentIdentity,
    Path(id): Path<i64>,
) -> Result<Json<Flavor>, ApiError> {
    state
        .flavor_store()
        .get_flavor(id)
        .map(Json)
        .map_err(catalog_error)
}

/// POST /api/v1/flavors
pub async fn create_flavor(
    State(state): State<Arc<AppState>>,
    AdminIdentity(identity): AdminIdentity,
    Json(input): Json<FlavorInput>,
) -> Result<(StatusCode, Json<Flavor>), ApiError> {
    let flavor = state
        .flavor_store()
        .create_flavor(&input)
        .map_err(catalog_error)?;
    info!(
        user_id = %identity.user_id,
        flavor_id = flavor.id,
        slug = %flavor.slug,
        "Flavor created"
    );
    Ok((StatusCode::CREATED, Json(flavor)))
}

/// PUT /api/v1/flavors/{id}
pub async fn update_flavor(
    State(state): State<Arc<AppState>>,
    AdminIdentity(identity): AdminIdentity,
    Path(id): Path<i64>,
    Json(input): Json<FlavorInput>,
) -> Result<Json<Flavor>, ApiError> {
    let flavor = state
        .flavor_store()
        .update_flavor(id, &input)
        .map_err(catalog_error)?;
    info!(user_id = %identity.user_id, flavor_id = id, "Flavor updated");
    Ok(Json(flavor))
}

/// DELETE /api/v1/flavors/{id}
///
/// Removes the flavor and all of its steps.
pub async fn delete_flavor(
    State(state): State<Arc<AppState>>,
    AdminIdentity(identity): AdminIdentity,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state
        .flavor_store()
        .delete_flavor(id)
        .map_err(catalog_error)?;
    info!(user_id = %identity.user_id, flavor_id = id, "Flavor deleted");
    Ok(Json(SuccessResponse {
        message: format!("Flavor {} deleted", id),
    }))
}

// ============================================================================
// Steps
// ============================================================================

/// GET /api/v1/flavors/{id}/steps
pub async fn list_steps(
    State(state): State<Arc<AppState>>,
    CurrentIdentity(_): CurrentIdentity,
    Path(id): Path<i64>,
) -> Result<Json<FlavorStepsResponse>, ApiError> {
    let store = state.flavor_store();
    let flavor = store.get_flavor(id).map_err(catalog_error)?;
    let steps = store.list_steps(id).map_err(catalog_error)?;
    Ok(Json(FlavorStepsResponse { flavor, steps }))
}

/// POST /api/v1/flavors/{id}/steps
pub async fn create_step(
    State(state): State<Arc<AppState>>,
    AdminIdentity(identity): AdminIdentity,
    Path(flavor_id): Path<i64>,
    Json(input): Json<StepInput>,
) -> Result<(StatusCode, Json<FlavorStep>), ApiError> {
    let step = state
        .flavor_store()
        .create_step(flavor_id, &input)
        .map_err(catalog_error)?;
    info!(user_id = %identity.user_id, flavor_id, step_id = step.id, "Flavor step created");
    Ok((StatusCode::CREATED, Json(step)))
}

/// GET /api/v1/steps/{id}
pub async fn get_step(
    State(state): State<Arc<AppState>>,
    CurrentIdentity(_): CurrentIdentity,
    Path(id): Path<i64>,
) -> Result<Json<FlavorStep>, ApiError> {
    state
        .flavor_store()
        .get_step(id)
        .map(Json)
        .map_err(catalog_error)
}

/// PUT /api/v1/steps/{id}
///
/// Replaces every editable field; omitted fields are cleared.
pub async fn update_step(
    State(state): State<Arc<AppState>>,
    AdminIdentity(identity): AdminIdentity,
    Path(id): Path<i64>,
    Json(input): Json<StepInput>,
) -> Result<Json<FlavorStep>, ApiError> {
    let step = state
        .flavor_store()
        .update_step(id, &input)
        .map_err(catalog_error)?;
    info!(user_id = %identity.user_id, step_id = id, "Flavor step updated");
    Ok(Json(step))
}

/// DELETE /api/v1/steps/{id}
pub async fn delete_step(
    State(state): State<Arc<AppState>>,
    AdminIdentity(identity): AdminIdentity,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state
        .flavor_store()
        .delete_step(id)
        .map_err(catalog_error)?;
    info!(user_id = %identity.user_id, step_id = id, "Flavor step deleted");
    Ok(Json(SuccessResponse {
        message: format!("Step {} deleted", id),
    }))
}

// ============================================================================
// Lookups
// ============================================================================

/// GET /api/v1/lookups/{kind}
pub async fn list_lookups(
    State(state): State<Arc<AppState>>,
    CurrentIdentity(_): CurrentIdentity,
    Path(kind): Path<String>,
) -> Result<Json<LookupListResponse>, ApiError> {
    let kind = parse_kind(&kind)?;
    let items = state
        .flavor_store()
        .list_lookups(kind)
        .map_err(catalog_error)?;
    Ok(Json(LookupListResponse { kind, items }))
}

/// POST /api/v1/lookups/{kind}
pub async fn add_lookup(
    State(state): State<Arc<AppState>>,
    AdminIdentity(identity): AdminIdentity,
    Path(kind): Path<String>,
    Json(input): Json<LookupInput>,
) -> Result<(StatusCode, Json<LookupItem>), ApiError> {
    let kind = parse_kind(&kind)?;
    let item = state
        .flavor_store()
        .add_lookup(kind, &input)
        .map_err(catalog_error)?;
    info!(user_id = %identity.user_id, %kind, id = item.id, "Lookup entry added");
    Ok((StatusCode::CREATED, Json(item)))
}
