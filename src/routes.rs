//! Router wiring. Resource routes are parameterized paths; handlers resolve
//! the resource spec from the first segment. The static `search` segment
//! takes priority over the `:id` capture at the same position.

use crate::auth::require_bearer;
use crate::handlers::{
    create, delete_all, delete_one, get_by_domain_id, get_by_id, list, search, update,
};
use crate::state::AppState;
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Resource CRUD routes, behind the bearer gate.
pub fn resource_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/:resource",
            get(list).post(create).delete(delete_all),
        )
        .route("/:resource/search", get(search))
        .route(
            "/:resource/:id",
            get(get_by_id).put(update).delete(delete_one),
        )
        .route("/:resource/:id/:domain_id", get(get_by_domain_id))
        .layer(middleware::from_fn_with_state(state.clone(), require_bearer))
        .with_state(state)
}

/// The complete application: health/version plus resource routes, with
/// request tracing and a body-size cap.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .merge(resource_routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
}
