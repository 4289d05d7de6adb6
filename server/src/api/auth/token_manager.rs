//! Authorization-code and bearer-token lifecycle over a session's tokens.

use super::AuthError;
use crate::ids;
use crate::session::{AuthToken, SessionIdentity};
use chrono::{Duration, Utc};
use log::debug;
use url::Url;
use uuid::Uuid;

/// Mints, exchanges and validates the tokens a session carries.
///
/// All three operations mutate the identity in place; callers persist the
/// session afterwards. Codes and bearers share one lifetime, the session
/// cookie max-age.
#[derive(Clone)]
pub struct TokenManager {
    token_ttl: Duration,
}

impl TokenManager {
    pub fn new(token_ttl_ms: u64) -> Self {
        Self {
            token_ttl: Duration::milliseconds(token_ttl_ms as i64),
        }
    }

    /// Mint a fresh authorization code into the session and return the
    /// success URL with the code appended as a query parameter.
    ///
    /// Appends a new token entry rather than replacing existing ones, so
    /// logins from several devices coexist on one session.
    pub fn mint_code(
        &self,
        identity: &mut SessionIdentity,
        success_redirect_url: &str,
    ) -> Result<String, AuthError> {
        let code = ids::opaque_token();
        identity.tokens.push(AuthToken {
            authorization_code: code.clone(),
            bearer_token: String::new(),
            expires_at: Utc::now() + self.token_ttl,
        });

        let mut url = Url::parse(success_redirect_url)
            .map_err(|_| AuthError::BadRequest("Invalid redirect URLs.".to_string()))?;
        url.query_pairs_mut().append_pair("code", &code);
        debug!("Minted authorization code for user {}", identity.user_id);
        Ok(url.into())
    }

    /// Exchange an unexpired authorization code for a bearer token.
    ///
    /// The bearer is written into the matching entry in place. The entry's
    /// expiry is not refreshed here; only bearer validation slides the
    /// window. The code stays valid for further exchanges until it expires.
    pub fn exchange_code(
        &self,
        identity: &mut SessionIdentity,
        code: &str,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let token = identity
            .tokens
            .iter_mut()
            .find(|token| now < token.expires_at && token.authorization_code == code)
            .ok_or(AuthError::InvalidCode)?;

        let bearer = ids::opaque_token();
        token.bearer_token = bearer.clone();
        debug!("Exchanged authorization code for user {}", identity.user_id);
        Ok(bearer)
    }

    /// Resolve a bearer token to the session's user and slide the token's
    /// expiry window. Returns None for unknown or expired tokens.
    pub fn validate_bearer(
        &self,
        identity: &mut SessionIdentity,
        bearer_token: &str,
    ) -> Option<Uuid> {
        // Entries that were never exchanged hold an empty bearer; an empty
        // credential must not match them
        if bearer_token.is_empty() {
            return None;
        }
        let now = Utc::now();
        let token = identity
            .tokens
            .iter_mut()
            .find(|token| now < token.expires_at && token.bearer_token == bearer_token)?;
        token.expires_at = now + self.token_ttl;
        Some(identity.user_id)
    }
}
