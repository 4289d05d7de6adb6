//! Discord OAuth login, session bridging and token lifecycle.

pub(crate) mod avatars;
pub(crate) mod discord;
pub(crate) mod handlers;
pub(crate) mod login_state;
pub(crate) mod models;
pub(crate) mod token_manager;

use crate::api::guards::{self, RouteAccess};
use crate::cache::CacheError;
use crate::errors::ApiError;
use crate::state::AppState;
use crate::users::UserStoreError;
use axum::routing::{get, post};
use axum::{middleware, Router};
use discord::DiscordError;
use thiserror::Error;

/// Errors raised by the login and token flows
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing, replayed or malformed login state, or disallowed redirects
    #[error("{0}")]
    BadRequest(String),
    /// Authorization code unknown or expired; callers cannot tell which
    #[error("Invalid authorization code.")]
    InvalidCode,
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Discord(#[from] DiscordError),
    #[error(transparent)]
    UserStore(#[from] UserStoreError),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::BadRequest(detail) => ApiError::bad_request(detail),
            AuthError::InvalidCode => ApiError::forbidden("Invalid authorization code."),
            AuthError::Cache(err) => {
                log::error!("Key-value store failure: {}", err);
                ApiError::internal("Key-value store failure")
            }
            AuthError::Discord(err) => {
                log::error!("Discord request failed: {}", err);
                ApiError::internal("Identity provider failure")
            }
            AuthError::UserStore(err) => err.into(),
        }
    }
}

/// Routes for login, callback, token exchange, logout and userinfo.
///
/// The token exchange is the only cookie-guarded route; everything else
/// behind authentication uses the bearer guard.
pub(super) fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/discord/login", get(handlers::login))
        .route("/auth/discord/callback", get(handlers::callback))
        .route("/auth/logout", post(handlers::logout))
        .merge(
            Router::new()
                .route("/auth/token", get(handlers::token))
                .layer(middleware::from_fn_with_state(
                    (state.clone(), RouteAccess::any()),
                    guards::session_guard,
                )),
        )
        .merge(
            Router::new()
                .route("/auth/userinfo", get(handlers::userinfo))
                .layer(middleware::from_fn_with_state(
                    (state.clone(), RouteAccess::any()),
                    guards::bearer_guard,
                )),
        )
}
