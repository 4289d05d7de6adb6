//! User database configuration

use confique::Config;

/// Postgres connection settings for the user store. An empty URL selects
/// the in-memory store, which loses all users on restart.
#[derive(Debug, Config, Clone)]
pub struct DatabaseConfig {
    /// Postgres connection string; empty for the in-memory store
    #[config(env = "ROLLCALL_DATABASE_URL", default = "")]
    pub url: String,

    /// Maximum size of the connection pool (default: 5)
    #[config(env = "ROLLCALL_DATABASE_MAX_CONNECTIONS", default = 5)]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "".to_string(),
            max_connections: 5,
        }
    }
}
