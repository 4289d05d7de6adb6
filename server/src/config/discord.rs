//! Discord OAuth application configuration

use confique::Config;

/// Credentials and endpoints for the Discord OAuth application
#[derive(Debug, Config, Clone)]
pub struct DiscordConfig {
    /// OAuth client id issued by the Discord developer portal
    #[config(env = "ROLLCALL_DISCORD_CLIENT_ID", default = "")]
    pub client_id: String,

    /// OAuth client secret issued by the Discord developer portal
    #[config(env = "ROLLCALL_DISCORD_CLIENT_SECRET", default = "")]
    pub client_secret: String,

    /// OAuth scopes requested at login, comma-separated (default: "identify")
    #[config(env = "ROLLCALL_DISCORD_SCOPES", default = "identify")]
    pub scopes: String,

    /// Discord REST API base URL (default: https://discord.com/api)
    #[config(env = "ROLLCALL_DISCORD_API_URL", default = "https://discord.com/api")]
    pub api_url: String,

    /// Discord CDN base URL for avatar downloads
    /// (default: https://cdn.discordapp.com)
    #[config(
        env = "ROLLCALL_DISCORD_CDN_URL",
        default = "https://cdn.discordapp.com"
    )]
    pub cdn_url: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            client_id: "".to_string(),
            client_secret: "".to_string(),
            scopes: "identify".to_string(),
            api_url: "https://discord.com/api".to_string(),
            cdn_url: "https://cdn.discordapp.com".to_string(),
        }
    }
}

impl DiscordConfig {
    /// Get the requested scopes as a vector
    pub fn get_scopes(&self) -> Vec<String> {
        self.scopes
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}
