//! Handlers for the OAuth exchange flow and token endpoints.

use super::models::{BearerTokenResponse, CallbackQuery, LoginQuery, TokenQuery};
use super::AuthError;
use crate::api::guards::{self, CurrentUser, SessionContext};
use crate::errors::ApiError;
use crate::ids;
use crate::openapi::AUTH_TAG;
use crate::session::SessionIdentity;
use crate::state::AppState;
use crate::users::{
    AvatarPatch, DiscordIdentity, DiscordIdentityPatch, NewUser, User, UserStoreBackend,
};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Json};
use axum_extra::extract::cookie::Cookie;
use axum_extra::extract::SignedCookieJar;
use log::{debug, info, warn};
use serde_json::{json, Value};

#[utoipa::path(
    get,
    path = "/auth/discord/login",
    tag = AUTH_TAG,
    params(LoginQuery),
    responses(
        (status = 303, description = "Redirect to the Discord authorize endpoint, or straight to the success URL for an already-authenticated session"),
        (status = 400, description = "Missing login intent or disallowed redirect origin")
    )
)]
pub(crate) async fn login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Query(query): Query<LoginQuery>,
) -> Result<Response, ApiError> {
    let intent = query.intent();
    let state_token = state
        .login_states
        .create_state(query.state.as_deref(), intent.as_ref())
        .await?;

    // An authenticated session completes the redirect contract without
    // another provider round-trip
    if let Some((session_id, identity)) = guards::resolve_session(&state, &jar).await? {
        debug!("Short-circuiting login for user {}", identity.user_id);
        return finish_login(&state, jar, session_id, identity, Some(&state_token)).await;
    }

    let url = state
        .discord
        .authorize_url(&state_token)
        .map_err(AuthError::from)?;
    Ok(Redirect::to(&url).into_response())
}

#[utoipa::path(
    get,
    path = "/auth/discord/callback",
    tag = AUTH_TAG,
    params(CallbackQuery),
    responses(
        (status = 303, description = "Redirect to the intent's success URL with a `code` query parameter, or to its fail URL when no identity was established"),
        (status = 400, description = "Missing, replayed or malformed state")
    )
)]
pub(crate) async fn callback(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, ApiError> {
    // Provider-side failures are swallowed at this boundary so the client
    // always gets its redirect-based failure UX instead of a raw error
    let validated = match (&query.error, &query.code) {
        (Some(error), _) => {
            warn!("Discord reported a failed login: {}", error);
            None
        }
        (None, Some(code)) => match validate_login(&state, code).await {
            Ok(identity) => Some(identity),
            Err(err) => {
                warn!("Discord login validation failed: {}", err);
                None
            }
        },
        (None, None) => None,
    };

    let existing = guards::resolve_session(&state, &jar).await?;
    let state_token = query.state.as_deref();

    match (validated, existing) {
        // A fresh validate replaces whatever identity the session carried
        (Some(identity), existing) => {
            let session_id = existing
                .map(|(session_id, _)| session_id)
                .unwrap_or_else(ids::opaque_token);
            finish_login(&state, jar, session_id, identity, state_token).await
        }
        (None, Some((session_id, identity))) => {
            finish_login(&state, jar, session_id, identity, state_token).await
        }
        (None, None) => {
            let intent = state.login_states.consume_state(state_token).await?;
            Ok(Redirect::to(&intent.fail_redirect_url).into_response())
        }
    }
}

/// Consume the login state, mint an authorization code into the session
/// and redirect to the intent's success URL.
async fn finish_login(
    state: &AppState,
    jar: SignedCookieJar,
    session_id: String,
    mut identity: SessionIdentity,
    state_token: Option<&str>,
) -> Result<Response, ApiError> {
    let intent = state.login_states.consume_state(state_token).await?;
    let url = state
        .tokens
        .mint_code(&mut identity, &intent.success_redirect_url)?;
    state
        .sessions
        .save(&session_id, &identity)
        .await
        .map_err(AuthError::from)?;
    let jar = jar.add(guards::session_cookie(state, &session_id));
    Ok((jar, Redirect::to(&url)).into_response())
}

/// Exchange the provider code for a profile and upsert the local user.
async fn validate_login(state: &AppState, code: &str) -> Result<SessionIdentity, AuthError> {
    let access_token = state.discord.exchange_code(code).await?;
    let profile = state.discord.fetch_profile(&access_token).await?;

    let user = match state.users.find_by_discord_id(&profile.id).await? {
        None => {
            let mut avatar_filename = None;
            if let Some(hash) = &profile.avatar {
                if let Some(images) = state.avatars.fetch_avatar_images(&profile.id, hash).await {
                    if state.avatars.persist(&images).await {
                        avatar_filename = Some(images.filename);
                    }
                }
            }
            let user = state
                .users
                .create(NewUser {
                    is_super_admin: false,
                    discord: DiscordIdentity {
                        id: profile.id.clone(),
                        username: profile.unique_username(),
                        display_name: profile.display_name(),
                        avatar_hash: profile.avatar.clone(),
                        avatar_filename,
                    },
                })
                .await?;
            info!("Created user {} for Discord account {}", user.id, profile.id);
            user
        }
        Some(user) => {
            let avatar = match &profile.avatar {
                // The provider dropped the avatar; clear the cache pointer
                None => AvatarPatch::Clear,
                Some(hash) => {
                    let mut filename = None;
                    if let Some(images) = state.avatars.refresh_if_stale(&user, hash).await {
                        if state.avatars.persist(&images).await {
                            filename = Some(images.filename);
                        }
                    }
                    AvatarPatch::Set {
                        hash: hash.clone(),
                        filename,
                    }
                }
            };
            state
                .users
                .update_discord_identity(
                    user.id,
                    DiscordIdentityPatch {
                        username: profile.unique_username(),
                        display_name: profile.display_name(),
                        avatar,
                    },
                )
                .await?
        }
    };

    info!("User {} logged in as {}", user.discord.username, user.id);
    Ok(SessionIdentity::new(user.id))
}

#[utoipa::path(
    get,
    path = "/auth/token",
    tag = AUTH_TAG,
    params(TokenQuery),
    responses(
        (status = 200, description = "Bearer token for the supplied authorization code", body = BearerTokenResponse),
        (status = 401, description = "No authenticated session"),
        (status = 403, description = "Unknown or expired authorization code")
    )
)]
pub(crate) async fn token(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<BearerTokenResponse>, ApiError> {
    let SessionContext {
        session_id,
        mut identity,
    } = session;
    let bearer = state
        .tokens
        .exchange_code(&mut identity, query.code.as_deref().unwrap_or_default())?;
    state
        .sessions
        .save(&session_id, &identity)
        .await
        .map_err(AuthError::from)?;
    Ok(Json(BearerTokenResponse {
        bearer_token: bearer,
    }))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = AUTH_TAG,
    responses((status = 200, description = "Session destroyed and cookie cleared"))
)]
pub(crate) async fn logout(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> (SignedCookieJar, Json<Value>) {
    let cookie_name = state.config.auth.session_cookie_name.clone();
    let jar = match jar.get(&cookie_name) {
        Some(cookie) => {
            if let Err(err) = state.sessions.destroy(cookie.value()).await {
                warn!("Failed to destroy session: {}", err);
            }
            jar.remove(Cookie::build(cookie_name).path("/"))
        }
        None => jar,
    };
    (jar, Json(json!({ "status": "ok" })))
}

#[utoipa::path(
    get,
    path = "/auth/userinfo",
    tag = AUTH_TAG,
    responses(
        (status = 200, description = "The user the bearer token resolves to", body = User),
        (status = 401, description = "Missing or invalid bearer token")
    )
)]
pub(crate) async fn userinfo(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<User> {
    Json(user)
}
