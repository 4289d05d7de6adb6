//! Liveness and readiness endpoints.

use crate::openapi::HEALTH_TAG;
use crate::state::AppState;
use crate::users::UserStoreBackend;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use http::StatusCode;
use serde_json::json;

#[utoipa::path(
    get,
    path = "/health",
    tag = HEALTH_TAG,
    responses((status = 200, description = "Server is alive"))
)]
pub(crate) async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[utoipa::path(
    get,
    path = "/ready",
    tag = HEALTH_TAG,
    responses(
        (status = 200, description = "All backing stores are reachable"),
        (status = 503, description = "One or more backing stores are unhealthy")
    )
)]
pub(crate) async fn ready(State(state): State<AppState>) -> Response {
    let mut failed = Vec::new();
    for (component, result) in [
        ("sessions", state.sessions.health_check().await),
        ("login_states", state.login_states.health_check().await),
        ("users", state.users.health_check().await),
    ] {
        if let Err(err) = result {
            log::error!("Readiness check failed for {}: {}", component, err);
            failed.push(component);
        }
    }

    if failed.is_empty() {
        (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable", "failed": failed })),
        )
            .into_response()
    }
}

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
}
