use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::middleware::{auth_middleware, metrics_middleware};
use super::{flavors, handlers, pipeline};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Routes behind authentication
    let protected = Router::new()
        .route("/config", get(handlers::get_config))
        // Caption pipeline; the image arrives base64 encoded in the body
        .route(
            "/pipeline",
            post(pipeline::run_pipeline)
                .layer(DefaultBodyLimit::max(state.pipeline_body_limit())),
        )
        // Flavors
        .route(
            "/flavors",
            get(flavors::list_flavors).post(flavors::create_flavor),
        )
        .route(
            "/flavors/{id}",
            get(flavors::get_flavor)
                .put(flavors::update_flavor)
                .delete(flavors::delete_flavor),
        )
        .route(
            "/flavors/{id}/steps",
            get(flavors::list_steps).post(flavors::create_step),
        )
        // Steps
        .route(
            "/steps/{id}",
            get(flavors::get_step)
                .put(flavors::update_step)
                .delete(flavors::delete_step),
        )
        // Lookup tables
        .route(
            "/lookups/{kind}",
            get(flavors::list_lookups).post(flavors::add_lookup),
        )
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth_middleware,
        ));

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::get_metrics))
        .merge(protected)
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
