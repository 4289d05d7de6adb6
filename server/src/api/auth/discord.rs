//! HTTP client for the Discord OAuth and CDN endpoints.

use crate::config::DiscordConfig;
use http::StatusCode;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur when talking to Discord
#[derive(Debug, Error)]
pub enum DiscordError {
    #[error("Failed to send request to Discord: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Discord request failed with status: {0}")]
    InvalidStatus(StatusCode),
    #[error("Failed to build Discord URL: {0}")]
    Url(#[from] url::ParseError),
}

/// The subset of the `users/@me` payload this server consumes
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DiscordProfile {
    /// Discord snowflake id
    pub id: String,
    pub username: String,
    /// `"0"` or absent for accounts migrated off the legacy name system
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub global_name: Option<String>,
    /// Avatar content hash; `a_` prefix marks an animated avatar
    #[serde(default)]
    pub avatar: Option<String>,
}

impl DiscordProfile {
    /// The globally unique username. Legacy accounts carry a non-zero
    /// discriminator and stay `name#1234`, migrated accounts use the bare
    /// username.
    pub fn unique_username(&self) -> String {
        match self.discriminator.as_deref() {
            None | Some("") | Some("0") => self.username.clone(),
            Some(discriminator) => format!("{}#{}", self.username, discriminator),
        }
    }

    /// Display name, falling back to the username when Discord has none
    pub fn display_name(&self) -> String {
        self.global_name
            .clone()
            .unwrap_or_else(|| self.username.clone())
    }

    /// Whether the avatar hash denotes an animated avatar with a GIF rendition
    pub fn is_animated_avatar(hash: &str) -> bool {
        hash.starts_with("a_")
    }
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
}

/// Client for the Discord REST API and CDN.
///
/// Base URLs come from configuration so tests can point the client at a
/// local mock server.
#[derive(Clone)]
pub struct DiscordClient {
    http: Client,
    config: DiscordConfig,
    callback_url: String,
}

impl DiscordClient {
    pub fn new(config: DiscordConfig, callback_url: String) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(2))
            .build()
            .expect("Failed to create Discord client");
        Self {
            http,
            config,
            callback_url,
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
    }

    fn cdn_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.cdn_url.trim_end_matches('/'), path)
    }

    /// The provider authorize endpoint the login flow redirects to
    pub fn authorize_url(&self, state: &str) -> Result<String, DiscordError> {
        let mut url = Url::parse(&self.api_url("oauth2/authorize"))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.callback_url)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.get_scopes().join(" "))
            .append_pair("state", state);
        Ok(url.into())
    }

    /// Exchange an authorization code for an access token
    pub async fn exchange_code(&self, code: &str) -> Result<String, DiscordError> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.callback_url.as_str()),
        ];
        let response = self
            .http
            .post(self.api_url("oauth2/token"))
            .form(&params)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(DiscordError::InvalidStatus(response.status()));
        }
        let token: AccessTokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    /// Fetch the profile of the user the access token belongs to
    pub async fn fetch_profile(&self, access_token: &str) -> Result<DiscordProfile, DiscordError> {
        let response = self
            .http
            .get(self.api_url("users/@me"))
            .bearer_auth(access_token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(DiscordError::InvalidStatus(response.status()));
        }
        Ok(response.json().await?)
    }

    /// Download an avatar rendition from the CDN
    pub async fn fetch_avatar(
        &self,
        discord_user_id: &str,
        avatar_hash: &str,
        extension: &str,
    ) -> Result<Vec<u8>, DiscordError> {
        let url = self.cdn_url(&format!(
            "avatars/{}/{}.{}",
            discord_user_id, avatar_hash, extension
        ));
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(DiscordError::InvalidStatus(response.status()));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> DiscordClient {
        DiscordClient::new(
            DiscordConfig {
                client_id: "client-id".to_string(),
                client_secret: "client-secret".to_string(),
                api_url: server.uri(),
                cdn_url: server.uri(),
                ..Default::default()
            },
            "http://localhost:3000/auth/discord/callback".to_string(),
        )
    }

    #[test]
    fn test_unique_username_discriminator_rules() {
        let mut profile = DiscordProfile {
            id: "1".to_string(),
            username: "foo".to_string(),
            discriminator: None,
            global_name: None,
            avatar: None,
        };
        assert_eq!(profile.unique_username(), "foo");

        profile.discriminator = Some("".to_string());
        assert_eq!(profile.unique_username(), "foo");

        profile.discriminator = Some("0".to_string());
        assert_eq!(profile.unique_username(), "foo");

        profile.discriminator = Some("1234".to_string());
        assert_eq!(profile.unique_username(), "foo#1234");
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let mut profile = DiscordProfile {
            id: "1".to_string(),
            username: "foo".to_string(),
            discriminator: None,
            global_name: Some("Foo Bar".to_string()),
            avatar: None,
        };
        assert_eq!(profile.display_name(), "Foo Bar");

        profile.global_name = None;
        assert_eq!(profile.display_name(), "foo");
    }

    #[tokio::test]
    async fn test_authorize_url_carries_state_and_scopes() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        let url = client.authorize_url("state-token").unwrap();
        let parsed = Url::parse(&url).unwrap();
        assert!(parsed.path().ends_with("/oauth2/authorize"));
        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert!(pairs.contains(&("client_id".to_string(), "client-id".to_string())));
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
        assert!(pairs.contains(&("scope".to_string(), "identify".to_string())));
        assert!(pairs.contains(&("state".to_string(), "state-token".to_string())));
    }

    #[tokio::test]
    async fn test_exchange_code_posts_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=the-code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "the-access-token",
                "token_type": "Bearer",
                "expires_in": 604800,
                "scope": "identify"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let token = client.exchange_code("the-code").await.unwrap();
        assert_eq!(token, "the-access-token");
    }

    #[tokio::test]
    async fn test_exchange_code_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.exchange_code("bad-code").await.unwrap_err();
        assert!(matches!(
            err,
            DiscordError::InvalidStatus(StatusCode::BAD_REQUEST)
        ));
    }

    #[tokio::test]
    async fn test_fetch_profile_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/@me"))
            .and(header("authorization", "Bearer the-access-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "80351110224678912",
                "username": "nelly",
                "discriminator": "0",
                "global_name": "Nelly",
                "avatar": "8342729096ea3675442027381ff50dfe"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let profile = client.fetch_profile("the-access-token").await.unwrap();
        assert_eq!(profile.id, "80351110224678912");
        assert_eq!(profile.unique_username(), "nelly");
        assert_eq!(
            profile.avatar.as_deref(),
            Some("8342729096ea3675442027381ff50dfe")
        );
    }

    #[tokio::test]
    async fn test_fetch_avatar_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/avatars/123/abc.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png bytes".to_vec()))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let bytes = client.fetch_avatar("123", "abc", "png").await.unwrap();
        assert_eq!(bytes, b"png bytes");

        let err = client.fetch_avatar("123", "missing", "png").await.unwrap_err();
        assert!(matches!(
            err,
            DiscordError::InvalidStatus(StatusCode::NOT_FOUND)
        ));
    }
}
