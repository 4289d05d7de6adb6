//! Bearer-guarded user directory endpoints.

use crate::api::guards::{self, CurrentUser, RouteAccess};
use crate::errors::ApiError;
use crate::openapi::USERS_TAG;
use crate::state::AppState;
use crate::users::{User, UserStoreBackend};
use axum::extract::{Path, State};
use axum::routing::{get, patch};
use axum::{middleware, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;
use uuid::Uuid;

/// Request body for the super-admin toggle
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SuperAdminStateRequest {
    /// Whether the user may administer other users
    pub is_super_admin: bool,
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = USERS_TAG,
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "The requested user", body = User),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "No user with that id")
    )
)]
pub(crate) async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    match state.users.find_by_id(id).await? {
        Some(user) => Ok(Json(user)),
        None => Err(ApiError::not_found("User not found.")),
    }
}

#[utoipa::path(
    get,
    path = "/users/discord/ids/{discord_id}",
    tag = USERS_TAG,
    params(("discord_id" = String, Path, description = "Discord snowflake id")),
    responses(
        (status = 200, description = "The requested user", body = User),
        (status = 404, description = "No user with that Discord id")
    )
)]
pub(crate) async fn get_user_by_discord_id(
    State(state): State<AppState>,
    Path(discord_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    match state.users.find_by_discord_id(&discord_id).await? {
        Some(user) => Ok(Json(user)),
        None => Err(ApiError::not_found("User not found.")),
    }
}

#[utoipa::path(
    get,
    path = "/users/discord/usernames/{discord_username}",
    tag = USERS_TAG,
    params(("discord_username" = String, Path, description = "Unique Discord username")),
    responses(
        (status = 200, description = "The requested user", body = User),
        (status = 404, description = "No user with that Discord username")
    )
)]
pub(crate) async fn get_user_by_discord_username(
    State(state): State<AppState>,
    Path(discord_username): Path<String>,
) -> Result<Json<User>, ApiError> {
    match state.users.find_by_discord_username(&discord_username).await? {
        Some(user) => Ok(Json(user)),
        None => Err(ApiError::not_found("User not found.")),
    }
}

#[utoipa::path(
    patch,
    path = "/users/{id}/super-admin-state",
    tag = USERS_TAG,
    params(("id" = Uuid, Path, description = "User id")),
    request_body = SuperAdminStateRequest,
    responses(
        (status = 200, description = "The updated user", body = User),
        (status = 403, description = "Caller is not a super admin"),
        (status = 404, description = "No user with that id")
    )
)]
pub(crate) async fn set_super_admin_state(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SuperAdminStateRequest>,
) -> Result<Json<User>, ApiError> {
    let user = state.users.set_super_admin(id, body.is_super_admin).await?;
    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = USERS_TAG,
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 403, description = "Caller may only delete itself"),
        (status = 404, description = "No user with that id")
    )
)]
pub(crate) async fn delete_user(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    if caller.id != id && !caller.is_super_admin {
        return Err(ApiError::forbidden("Not allowed to delete other users."));
    }
    state.users.delete(id).await?;
    log::info!("User {} deleted by {}", id, caller.id);
    Ok(Json(json!({ "status": "ok" })))
}

/// User directory routes; the super-admin toggle carries its own role
/// requirement, everything else admits any authenticated bearer.
pub(super) fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/users/{id}/super-admin-state", patch(set_super_admin_state))
        .layer(middleware::from_fn_with_state(
            (state.clone(), RouteAccess::super_admin()),
            guards::bearer_guard,
        ))
        .merge(
            Router::new()
                .route("/users/{id}", get(get_user).delete(delete_user))
                .route("/users/discord/ids/{discord_id}", get(get_user_by_discord_id))
                .route(
                    "/users/discord/usernames/{discord_username}",
                    get(get_user_by_discord_username),
                )
                .layer(middleware::from_fn_with_state(
                    (state.clone(), RouteAccess::any()),
                    guards::bearer_guard,
                )),
        )
}
