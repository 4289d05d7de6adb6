//! Per-request authorization guards for both credential transports.
//!
//! The cookie-session guard and the bearer-token guard enforce the same
//! capability set (authenticated, optional super-admin role) but differ in
//! error surface: the cookie guard answers with the JSON error body, the
//! bearer guard denies role mismatches with a bare 403.

use crate::api::auth::AuthError;
use crate::errors::ApiError;
use crate::session::SessionIdentity;
use crate::state::AppState;
use crate::users::{User, UserStoreBackend};
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::SignedCookieJar;
use http::header::AUTHORIZATION;
use http::StatusCode;

/// Role requirement attached to a guarded route
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RouteAccess {
    /// Required value of the user's super-admin flag, if any
    pub required_super_admin: Option<bool>,
}

impl RouteAccess {
    /// Any authenticated user may pass
    pub fn any() -> Self {
        Self::default()
    }

    /// Only super admins may pass
    pub fn super_admin() -> Self {
        Self {
            required_super_admin: Some(true),
        }
    }

    fn permits(&self, user: &User) -> bool {
        self.required_super_admin
            .map_or(true, |required| user.is_super_admin == required)
    }
}

/// The user a guard resolved for the current request
#[derive(Debug, Clone)]
pub(crate) struct CurrentUser(pub User);

/// Session record backing the current request, for handlers that mutate
/// the token list and save it back
#[derive(Debug, Clone)]
pub(crate) struct SessionContext {
    pub session_id: String,
    pub identity: SessionIdentity,
}

/// Resolve the session referenced by the signed session cookie, if any
pub(crate) async fn resolve_session(
    state: &AppState,
    jar: &SignedCookieJar,
) -> Result<Option<(String, SessionIdentity)>, AuthError> {
    let Some(cookie) = jar.get(&state.config.auth.session_cookie_name) else {
        return Ok(None);
    };
    let session_id = cookie.value().to_string();
    let identity = state.sessions.load(&session_id).await?;
    Ok(identity.map(|identity| (session_id, identity)))
}

/// Build the signed session cookie carrying a session id
pub(crate) fn session_cookie(state: &AppState, session_id: &str) -> Cookie<'static> {
    let auth = &state.config.auth;
    Cookie::build((auth.session_cookie_name.clone(), session_id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(auth.session_cookie_secure)
        .max_age(time::Duration::milliseconds(
            auth.session_cookie_max_age_ms as i64,
        ))
        .build()
}

/// Cookie-session guard.
///
/// The session cookie alone does not prove the user still exists; the
/// backing record is re-resolved on every request.
pub(crate) async fn session_guard(
    State((state, access)): State<(AppState, RouteAccess)>,
    mut request: Request,
    next: Next,
) -> Response {
    let jar = SignedCookieJar::from_headers(request.headers(), state.cookie_key());
    let resolved = match resolve_session(&state, &jar).await {
        Ok(resolved) => resolved,
        Err(err) => return ApiError::from(err).into_response(),
    };
    let Some((session_id, identity)) = resolved else {
        return ApiError::unauthorized("Not authenticated.").into_response();
    };
    let user = match state.users.find_by_id(identity.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return ApiError::unauthorized("Not authenticated.").into_response(),
        Err(err) => return ApiError::from(err).into_response(),
    };
    if !access.permits(&user) {
        return ApiError::forbidden("Insufficient permissions.").into_response();
    }

    request.extensions_mut().insert(SessionContext {
        session_id,
        identity,
    });
    request.extensions_mut().insert(CurrentUser(user));
    next.run(request).await
}

/// Bearer-token guard.
///
/// Validation slides the token's expiry window, so the session is saved
/// back before the request proceeds.
pub(crate) async fn bearer_guard(
    State((state, access)): State<(AppState, RouteAccess)>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(bearer) = bearer_token(&request) else {
        return ApiError::unauthorized("Not authenticated.").into_response();
    };
    let jar = SignedCookieJar::from_headers(request.headers(), state.cookie_key());
    let resolved = match resolve_session(&state, &jar).await {
        Ok(resolved) => resolved,
        Err(err) => return ApiError::from(err).into_response(),
    };
    let Some((session_id, mut identity)) = resolved else {
        return ApiError::unauthorized("Not authenticated.").into_response();
    };
    let Some(user_id) = state.tokens.validate_bearer(&mut identity, &bearer) else {
        return ApiError::unauthorized("Not authenticated.").into_response();
    };
    if let Err(err) = state.sessions.save(&session_id, &identity).await {
        return ApiError::from(AuthError::from(err)).into_response();
    }
    let user = match state.users.find_by_id(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return ApiError::unauthorized("Not authenticated.").into_response(),
        Err(err) => return ApiError::from(err).into_response(),
    };
    if !access.permits(&user) {
        // Bare status, unlike the cookie guard's JSON error body
        return StatusCode::FORBIDDEN.into_response();
    }

    request.extensions_mut().insert(CurrentUser(user));
    next.run(request).await
}

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::DiscordIdentity;
    use axum::body::Body;
    use chrono::Utc;
    use uuid::Uuid;

    fn user(is_super_admin: bool) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            is_super_admin,
            discord: DiscordIdentity {
                id: "1001".to_string(),
                username: "alice".to_string(),
                display_name: "Alice".to_string(),
                avatar_hash: None,
                avatar_filename: None,
            },
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_route_access_permits() {
        assert!(RouteAccess::any().permits(&user(false)));
        assert!(RouteAccess::any().permits(&user(true)));
        assert!(!RouteAccess::super_admin().permits(&user(false)));
        assert!(RouteAccess::super_admin().permits(&user(true)));

        // Explicitly requiring a non-admin rejects admins
        let non_admin_only = RouteAccess {
            required_super_admin: Some(false),
        };
        assert!(non_admin_only.permits(&user(false)));
        assert!(!non_admin_only.permits(&user(true)));
    }

    #[test]
    fn test_bearer_token_extraction() {
        let request = Request::builder()
            .header(AUTHORIZATION, "Bearer the-token")
            .body(Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&request).as_deref(), Some("the-token"));

        let request = Request::builder()
            .header(AUTHORIZATION, "Basic dXNlcjpwYXNz")
            .body(Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&request), None);

        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(bearer_token(&request), None);
    }
}
