//! Session and login-flow configuration

use confique::Config;

/// Session cookie and login-state settings
#[derive(Debug, Config, Clone)]
pub struct AuthConfig {
    /// Secret the session cookie signing key is derived from.
    /// Must be overridden outside local development.
    #[config(
        env = "ROLLCALL_AUTH_SESSION_SECRET",
        default = "rollcall-dev-session-secret"
    )]
    pub session_secret: String,

    /// Name of the session cookie (default: "rollcall_session")
    #[config(
        env = "ROLLCALL_AUTH_SESSION_COOKIE_NAME",
        default = "rollcall_session"
    )]
    pub session_cookie_name: String,

    /// Session cookie max age in milliseconds, also the lifetime of
    /// authorization codes and bearer tokens (default: 14 days)
    #[config(
        env = "ROLLCALL_AUTH_SESSION_COOKIE_MAX_AGE_MS",
        default = 1209600000
    )]
    pub session_cookie_max_age_ms: u64,

    /// Whether the session cookie carries the Secure attribute
    /// (default: false, enable behind TLS)
    #[config(env = "ROLLCALL_AUTH_SESSION_COOKIE_SECURE", default = false)]
    pub session_cookie_secure: bool,

    /// How long a pending login state is honored, in seconds (default: 900)
    #[config(env = "ROLLCALL_AUTH_LOGIN_STATE_TTL_SECS", default = 900)]
    pub login_state_ttl_secs: u64,

    /// Comma-separated allow-list of redirect origins. Entries wrapped in
    /// slashes (`/.../`) are treated as regular expressions, all others
    /// must match the origin exactly. Unset allows every origin.
    #[config(env = "ROLLCALL_AUTH_ALLOWED_ORIGINS")]
    pub allowed_origins: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_secret: "rollcall-dev-session-secret".to_string(),
            session_cookie_name: "rollcall_session".to_string(),
            session_cookie_max_age_ms: 1_209_600_000,
            session_cookie_secure: false,
            login_state_ttl_secs: 900,
            allowed_origins: None,
        }
    }
}

impl AuthConfig {
    /// Get the allow-list entries as a vector, or None for allow-all
    pub fn get_allowed_origins(&self) -> Option<Vec<String>> {
        self.allowed_origins.as_ref().map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
    }
}
