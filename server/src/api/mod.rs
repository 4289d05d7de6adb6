pub(crate) mod auth;
pub(crate) mod guards;
pub(crate) mod health;
pub(crate) mod users;

use crate::state::AppState;
use axum::Router;
use tower_http::services::ServeDir;

/// Combines all API routes into a single router
pub(super) fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router(state))
        .merge(users::router(state))
        // Cached avatar images, served as-is
        .nest_service("/files", ServeDir::new(state.files.root()))
}
