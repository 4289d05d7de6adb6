use utoipa::OpenApi;

pub(crate) const AUTH_TAG: &str = "Auth API";
pub(crate) const USERS_TAG: &str = "Users API";
pub(crate) const HEALTH_TAG: &str = "Health API";

#[derive(OpenApi)]
#[openapi(
    tags(
        (name = AUTH_TAG, description = "Discord OAuth login, session and token endpoints"),
        (name = USERS_TAG, description = "User directory endpoints"),
        (name = HEALTH_TAG, description = "Health check endpoints"),
    ),
    paths(
        crate::api::auth::handlers::login,
        crate::api::auth::handlers::callback,
        crate::api::auth::handlers::token,
        crate::api::auth::handlers::logout,
        crate::api::auth::handlers::userinfo,
        crate::api::users::get_user,
        crate::api::users::get_user_by_discord_id,
        crate::api::users::get_user_by_discord_username,
        crate::api::users::set_super_admin_state,
        crate::api::users::delete_user,
        crate::api::health::health,
        crate::api::health::ready,
    ),
    components(schemas(
        crate::users::User,
        crate::users::DiscordIdentity,
        crate::api::auth::models::BearerTokenResponse,
        crate::api::users::SuperAdminStateRequest,
    )),
    info(
        title = "Rollcall API",
        description = "Discord OAuth login and user directory service",
        version = "1.0.0"
    )
)]
pub(crate) struct ApiDoc;
