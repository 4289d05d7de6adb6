//! Pending-login state records and the redirect origin allow-list.

use super::AuthError;
use crate::cache::{Cache, CacheBackend, CacheError};
use crate::ids;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// The redirect URLs a client wants honored once its login completes.
/// Stored as JSON under the state token for the duration of the flow.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoginIntent {
    pub success_redirect_url: String,
    pub fail_redirect_url: String,
}

/// Stored form of [`LoginIntent`] with unvalidated fields. A record that
/// lost a URL is rejected as invalid instead of crashing deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredIntent {
    #[serde(default)]
    success_redirect_url: Option<String>,
    #[serde(default)]
    fail_redirect_url: Option<String>,
}

/// One entry of the redirect origin allow-list
#[derive(Debug, Clone)]
enum OriginRule {
    Exact(String),
    Pattern(Regex),
}

impl OriginRule {
    /// Entries wrapped in slashes compile as regular expressions, all
    /// others match the origin exactly
    fn parse(entry: &str) -> Result<Self, String> {
        if entry.len() >= 2 && entry.starts_with('/') && entry.ends_with('/') {
            let pattern = &entry[1..entry.len() - 1];
            let regex = Regex::new(pattern)
                .map_err(|e| format!("Invalid origin pattern {}: {}", entry, e))?;
            Ok(Self::Pattern(regex))
        } else {
            Ok(Self::Exact(entry.to_string()))
        }
    }

    fn matches(&self, origin: &str) -> bool {
        match self {
            Self::Exact(expected) => expected == origin,
            Self::Pattern(regex) => regex.is_match(origin),
        }
    }
}

/// Checks client-supplied redirect URLs against the configured allow-list
#[derive(Debug, Clone)]
pub struct RedirectUrlValidator {
    /// None allows every origin
    rules: Option<Vec<OriginRule>>,
}

impl RedirectUrlValidator {
    /// Compile the configured allow-list entries once at startup
    pub fn new(allowed_origins: Option<Vec<String>>) -> Result<Self, String> {
        let rules = match allowed_origins {
            Some(entries) => Some(
                entries
                    .iter()
                    .map(|entry| OriginRule::parse(entry))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            None => None,
        };
        Ok(Self { rules })
    }

    /// True iff both URLs parse and each of their origins satisfies at
    /// least one allow-list entry
    pub fn validate(&self, success_url: &str, fail_url: &str) -> bool {
        let Some(rules) = &self.rules else {
            return true;
        };
        [success_url, fail_url].iter().all(|raw| {
            Url::parse(raw)
                .map(|url| {
                    let origin = url.origin().ascii_serialization();
                    rules.iter().any(|rule| rule.matches(&origin))
                })
                .unwrap_or(false)
        })
    }
}

fn state_key(token: &str) -> String {
    format!("login_state:{}", token)
}

/// Pending login intents in the key-value store, keyed by state token.
///
/// Consumption is exactly-once: the record is removed with an atomic take,
/// so a replayed callback cannot observe it a second time.
#[derive(Clone)]
pub struct LoginStateStore {
    cache: Cache,
    validator: RedirectUrlValidator,
}

impl LoginStateStore {
    pub fn new(cache: Cache, validator: RedirectUrlValidator) -> Self {
        Self { cache, validator }
    }

    pub fn validator(&self) -> &RedirectUrlValidator {
        &self.validator
    }

    /// Register a login intent and return its state token.
    ///
    /// A non-empty supplied state is returned unchanged; the caller is
    /// resuming a flow that was registered earlier. An empty `state=` query
    /// value counts as absent and mints a fresh token, since the query layer
    /// surfaces it as `Some("")`.
    pub async fn create_state(
        &self,
        supplied_state: Option<&str>,
        intent: Option<&LoginIntent>,
    ) -> Result<String, AuthError> {
        if let Some(state) = supplied_state.filter(|s| !s.is_empty()) {
            return Ok(state.to_string());
        }

        let intent = intent.ok_or_else(invalid_redirect_urls)?;
        if !self
            .validator
            .validate(&intent.success_redirect_url, &intent.fail_redirect_url)
        {
            return Err(invalid_redirect_urls());
        }

        let token = ids::opaque_token();
        self.cache.set(&state_key(&token), intent).await?;
        Ok(token)
    }

    /// Resolve and delete the intent stored for a state token.
    ///
    /// The redirect URLs are validated again here; an allow-list change
    /// while the flow was in flight invalidates the stored intent.
    pub async fn consume_state(&self, state: Option<&str>) -> Result<LoginIntent, AuthError> {
        let state = state
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::BadRequest("State not found in request.".to_string()))?;

        let stored: Option<StoredIntent> = match self.cache.take(&state_key(state)).await {
            Ok(stored) => stored,
            // The record is gone either way; a corrupt payload reads as an
            // invalid state rather than a server failure
            Err(CacheError::Deserialization(_)) => {
                return Err(AuthError::BadRequest("Invalid state.".to_string()))
            }
            Err(err) => return Err(err.into()),
        };
        let stored =
            stored.ok_or_else(|| AuthError::BadRequest("State not found.".to_string()))?;

        let success = stored.success_redirect_url.filter(|s| !s.is_empty());
        let fail = stored.fail_redirect_url.filter(|s| !s.is_empty());
        let intent = match (success, fail) {
            (Some(success_redirect_url), Some(fail_redirect_url)) => LoginIntent {
                success_redirect_url,
                fail_redirect_url,
            },
            _ => return Err(AuthError::BadRequest("Invalid state.".to_string())),
        };

        if !self
            .validator
            .validate(&intent.success_redirect_url, &intent.fail_redirect_url)
        {
            return Err(invalid_redirect_urls());
        }
        Ok(intent)
    }

    pub async fn health_check(&self) -> Result<(), String> {
        self.cache.health_check().await
    }
}

fn invalid_redirect_urls() -> AuthError {
    AuthError::BadRequest("Invalid redirect URLs.".to_string())
}
