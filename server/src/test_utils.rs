//! Test fixture for driving the full application over mocked collaborators.
//!
//! The fixture runs the real router against in-memory session, state and
//! user stores, a tempdir-backed file store, and a wiremock server standing
//! in for both the Discord API and its CDN.

use crate::config::{AppConfig, DiscordConfig};
use crate::create_app;
use crate::state::AppState;
use axum::body::Body;
use axum::Router;
use http::{header, HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use log::LevelFilter;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Success redirect URL every fixture login asks for
pub(crate) const SUCCESS_URL: &str = "https://app.example.com/welcome";
/// Fail redirect URL every fixture login asks for
pub(crate) const FAIL_URL: &str = "https://app.example.com/sorry";

/// Credentials captured from a completed login flow
pub(crate) struct LoginSession {
    /// `name=value` pair for the Cookie request header
    pub cookie: String,
    /// Authorization code from the success redirect
    pub code: String,
}

/// Minimal Discord profile payload without an avatar
pub(crate) fn discord_profile(id: &str, username: &str) -> Value {
    json!({
        "id": id,
        "username": username,
        "discriminator": "0",
        "global_name": username,
        "avatar": null
    })
}

pub(crate) struct TestFixture {
    /// The application router
    pub app: Router,
    /// Application state, for direct store access in assertions
    pub state: AppState,
    /// Mock server standing in for the Discord API and CDN
    pub discord_mock: MockServer,
    _files_dir: TempDir,
}

impl TestFixture {
    /// Fixture with the default test configuration (allow-all origins)
    pub async fn new() -> Self {
        Self::with_config(Self::test_config()).await
    }

    /// Fixture with a caller-adjusted configuration. The Discord base URLs
    /// are always overwritten to point at the mock server.
    pub async fn with_config(mut config: AppConfig) -> Self {
        let _ = env_logger::builder()
            .filter_level(LevelFilter::Debug)
            .is_test(true)
            .try_init();

        let discord_mock = MockServer::start().await;
        config.discord.api_url = discord_mock.uri();
        config.discord.cdn_url = discord_mock.uri();

        let files_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let state = AppState::for_testing(config, files_dir.path());
        let app = create_app(state.clone()).await;

        Self {
            app,
            state,
            discord_mock,
            _files_dir: files_dir,
        }
    }

    /// Baseline configuration for tests; Discord URLs are filled in later
    pub fn test_config() -> AppConfig {
        AppConfig {
            discord: DiscordConfig {
                client_id: "client-id".to_string(),
                client_secret: "client-secret".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Login endpoint URI with the fixture's redirect intent
    pub fn login_uri() -> String {
        format!(
            "/auth/discord/login?successRedirectUrl={}&failRedirectUrl={}",
            SUCCESS_URL, FAIL_URL
        )
    }

    /// Creates a request builder for the given method and URI
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> http::request::Builder {
        Request::builder().method(method).uri(uri.as_ref())
    }

    /// Sends a request through the router and collects the response
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes()
            .to_vec();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        TestResponse {
            status,
            headers,
            body,
            json,
        }
    }

    /// Sends a GET request without credentials
    pub async fn get(&self, uri: impl AsRef<str>) -> TestResponse {
        let request = self
            .request(Method::GET, uri)
            .body(Body::empty())
            .expect("Failed to build request");
        self.send(request).await
    }

    /// Sends a GET request with session cookie and bearer credential
    pub async fn get_bearer(
        &self,
        uri: impl AsRef<str>,
        session: &LoginSession,
        bearer: &str,
    ) -> TestResponse {
        let request = self
            .request(Method::GET, uri)
            .header(header::COOKIE, &session.cookie)
            .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
            .body(Body::empty())
            .expect("Failed to build request");
        self.send(request).await
    }

    /// Sends a DELETE request with session cookie and bearer credential
    pub async fn delete_bearer(
        &self,
        uri: impl AsRef<str>,
        session: &LoginSession,
        bearer: &str,
    ) -> TestResponse {
        let request = self
            .request(Method::DELETE, uri)
            .header(header::COOKIE, &session.cookie)
            .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
            .body(Body::empty())
            .expect("Failed to build request");
        self.send(request).await
    }

    /// Sends a JSON body with session cookie and bearer credential
    pub async fn send_json_bearer<T: Serialize>(
        &self,
        http_method: Method,
        uri: impl AsRef<str>,
        body: &T,
        session: &LoginSession,
        bearer: &str,
    ) -> TestResponse {
        let json_body = serde_json::to_vec(body).expect("Failed to serialize body to JSON");
        let request = self
            .request(http_method, uri)
            .header(header::COOKIE, &session.cookie)
            .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json_body))
            .expect("Failed to build request");
        self.send(request).await
    }

    /// Mounts the Discord code-exchange and profile endpoints
    pub async fn mock_discord_login(&self, profile: Value) {
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "mock-access-token",
                "token_type": "Bearer"
            })))
            .mount(&self.discord_mock)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/@me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(profile))
            .mount(&self.discord_mock)
            .await;
    }

    /// Like [`mock_discord_login`](Self::mock_discord_login) but asserts
    /// an exact number of provider round-trips
    pub async fn mock_discord_login_expecting(&self, profile: Value, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "mock-access-token",
                "token_type": "Bearer"
            })))
            .expect(expected_calls)
            .mount(&self.discord_mock)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/@me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(profile))
            .expect(expected_calls)
            .mount(&self.discord_mock)
            .await;
    }

    /// Mounts one CDN avatar rendition with a call-count expectation
    pub async fn mock_avatar(
        &self,
        discord_id: &str,
        hash: &str,
        extension: &str,
        body: &[u8],
        expected_calls: u64,
    ) {
        Mock::given(method("GET"))
            .and(path(format!(
                "/avatars/{}/{}.{}",
                discord_id, hash, extension
            )))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
            .expect(expected_calls)
            .mount(&self.discord_mock)
            .await;
    }

    /// Drives the full login flow (login redirect, provider callback) and
    /// returns the session cookie plus the minted authorization code.
    /// Requires [`mock_discord_login`](Self::mock_discord_login) first.
    pub async fn login(&self) -> LoginSession {
        let login = self.get(&Self::login_uri()).await;
        login.assert_status(StatusCode::SEE_OTHER);
        let state_token = query_param(login.location(), "state").expect("state parameter");

        let callback = self
            .get(&format!(
                "/auth/discord/callback?code=provider-code&state={}",
                state_token
            ))
            .await;
        callback.assert_status(StatusCode::SEE_OTHER);
        let cookie = callback.session_cookie();
        let code = query_param(callback.location(), "code").expect("code parameter");

        LoginSession { cookie, code }
    }

    /// Exchanges a login's authorization code for a bearer token
    pub async fn bearer_token(&self, session: &LoginSession) -> String {
        let request = self
            .request(Method::GET, format!("/auth/token?code={}", session.code))
            .header(header::COOKIE, &session.cookie)
            .body(Body::empty())
            .expect("Failed to build request");
        let response = self.send(request).await;
        response.assert_ok();
        response.json["bearerToken"]
            .as_str()
            .expect("bearerToken field")
            .to_string()
    }
}

fn query_param(url: &str, name: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.to_string())
}

/// Response from a test request with convenient access to status, headers
/// and body.
pub(crate) struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers (Location, Set-Cookie)
    pub headers: HeaderMap,
    /// Raw response body
    pub body: Vec<u8>,
    /// Response body as JSON, `Null` when the body is not JSON
    pub json: Value,
}

impl TestResponse {
    /// Asserts that the response has the expected status code
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {} but got {} with body: {}",
            expected,
            self.status,
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    /// Asserts that the response status is OK (200)
    pub fn assert_ok(&self) -> &Self {
        self.assert_status(StatusCode::OK)
    }

    /// Converts the response body to the specified type
    pub fn json_as<T: DeserializeOwned>(&self) -> T {
        serde_json::from_value(self.json.clone()).expect("Failed to deserialize response JSON")
    }

    /// The Location header of a redirect response
    pub fn location(&self) -> &str {
        self.headers
            .get(header::LOCATION)
            .expect("missing Location header")
            .to_str()
            .expect("non-UTF8 Location header")
    }

    /// The `name=value` pair of the Set-Cookie header, for replaying the
    /// session cookie on subsequent requests
    pub fn session_cookie(&self) -> String {
        let set_cookie = self
            .headers
            .get(header::SET_COOKIE)
            .expect("missing Set-Cookie header")
            .to_str()
            .expect("non-UTF8 Set-Cookie header");
        set_cookie
            .split(';')
            .next()
            .expect("empty Set-Cookie header")
            .to_string()
    }
}
