//! Wire models for the auth endpoints.

use super::login_state::LoginIntent;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query parameters accepted by the login endpoint
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub(crate) struct LoginQuery {
    /// Where to send the client after a successful login
    pub success_redirect_url: Option<String>,
    /// Where to send the client after a failed login
    pub fail_redirect_url: Option<String>,
    /// State token of a flow registered earlier
    pub state: Option<String>,
}

impl LoginQuery {
    /// The login intent, when both redirect URLs were supplied
    pub fn intent(&self) -> Option<LoginIntent> {
        match (&self.success_redirect_url, &self.fail_redirect_url) {
            (Some(success), Some(fail)) => Some(LoginIntent {
                success_redirect_url: success.clone(),
                fail_redirect_url: fail.clone(),
            }),
            _ => None,
        }
    }
}

/// Query parameters Discord sends to the callback endpoint
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct CallbackQuery {
    /// Provider authorization code to exchange for an access token
    pub code: Option<String>,
    /// State token minted when the flow started
    pub state: Option<String>,
    /// Set instead of `code` when the provider reports a failure
    pub error: Option<String>,
}

/// Query parameters for the token exchange endpoint
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct TokenQuery {
    /// Authorization code from the login redirect
    pub code: Option<String>,
}

/// Response of the token exchange endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BearerTokenResponse {
    /// Credential for `Authorization: Bearer` requests
    pub bearer_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_query_intent_requires_both_urls() {
        let query = LoginQuery {
            success_redirect_url: Some("https://app.example.com/welcome".to_string()),
            fail_redirect_url: Some("https://app.example.com/sorry".to_string()),
            state: None,
        };
        let intent = query.intent().unwrap();
        assert_eq!(intent.success_redirect_url, "https://app.example.com/welcome");
        assert_eq!(intent.fail_redirect_url, "https://app.example.com/sorry");

        let query = LoginQuery {
            success_redirect_url: Some("https://app.example.com/welcome".to_string()),
            fail_redirect_url: None,
            state: None,
        };
        assert!(query.intent().is_none());
    }
}
