pub(crate) use crate::config::auth::AuthConfig;
pub(crate) use crate::config::cache::{CacheConfig, CacheStore};
pub(crate) use crate::config::database::DatabaseConfig;
pub(crate) use crate::config::discord::DiscordConfig;
pub(crate) use crate::config::files::FilesConfig;
use confique::Config;

pub mod auth;
pub mod cache;
pub mod database;
pub mod discord;
pub mod files;

/// Main configuration structure for the Rollcall server
#[derive(Debug, Config, Clone)]
pub struct AppConfig {
    /// The port the server will listen to (default: 3000)
    #[config(env = "ROLLCALL_PORT", default = 3000)]
    pub port: u16,

    /// Externally reachable base URL of this server; the OAuth callback
    /// URL is derived from it (default: http://localhost:3000)
    #[config(env = "ROLLCALL_PUBLIC_URL", default = "http://localhost:3000")]
    pub public_url: String,

    /// Session and login-flow configuration
    #[config(nested)]
    pub auth: AuthConfig,

    /// Discord OAuth application configuration
    #[config(nested)]
    pub discord: DiscordConfig,

    /// Key-value store configuration
    #[config(nested)]
    pub cache: CacheConfig,

    /// User database configuration
    #[config(nested)]
    pub database: DatabaseConfig,

    /// Avatar file storage configuration
    #[config(nested)]
    pub files: FilesConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            public_url: "http://localhost:3000".to_string(),
            auth: AuthConfig::default(),
            discord: DiscordConfig::default(),
            cache: CacheConfig::default(),
            database: DatabaseConfig::default(),
            files: FilesConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the configuration from environment variables, falling back to
    /// an optional `config.toml` in the working directory, then to defaults.
    pub fn load() -> Result<Self, String> {
        Self::builder()
            .env()
            .file("config.toml")
            .load()
            .map_err(|e| e.to_string())
    }

    /// The OAuth callback URL registered with the identity provider.
    pub fn callback_url(&self) -> String {
        format!(
            "{}/auth/discord/callback",
            self.public_url.trim_end_matches('/')
        )
    }
}
