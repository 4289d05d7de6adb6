use crate::cache::{Cache, CacheBackend, CacheError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One authorization-code/bearer-token pair held by a session.
///
/// A session accumulates one entry per device that completed a login; the
/// bearer token is written into the entry when the code is exchanged.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthToken {
    pub authorization_code: String,
    pub bearer_token: String,
    pub expires_at: DateTime<Utc>,
}

/// The identity a server-side session carries: a user reference and the
/// tokens minted for it. The full user row is never stored here, it is
/// re-resolved on every guarded request.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdentity {
    pub user_id: Uuid,
    #[serde(default)]
    pub tokens: Vec<AuthToken>,
}

impl SessionIdentity {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            tokens: Vec::new(),
        }
    }

    /// Drop every token whose expiry has passed. Runs on every load and
    /// every save, so expired entries never accumulate.
    pub fn prune_expired(&mut self, now: DateTime<Utc>) {
        self.tokens.retain(|token| now < token.expires_at);
    }
}

fn session_key(session_id: &str) -> String {
    format!("session:{}", session_id)
}

/// Server-side session records in the key-value store.
///
/// Every save rewrites the record and re-arms its TTL, which makes the
/// session window slide while the client stays active.
#[derive(Clone)]
pub struct SessionStore {
    cache: Cache,
}

impl SessionStore {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    pub async fn load(&self, session_id: &str) -> Result<Option<SessionIdentity>, CacheError> {
        let identity: Option<SessionIdentity> = self.cache.get(&session_key(session_id)).await?;
        Ok(identity.map(|mut identity| {
            identity.prune_expired(Utc::now());
            identity
        }))
    }

    pub async fn save(
        &self,
        session_id: &str,
        identity: &SessionIdentity,
    ) -> Result<(), CacheError> {
        let mut stored = identity.clone();
        stored.prune_expired(Utc::now());
        self.cache.set(&session_key(session_id), &stored).await
    }

    pub async fn destroy(&self, session_id: &str) -> Result<(), CacheError> {
        self.cache.delete(&session_key(session_id)).await
    }

    pub async fn health_check(&self) -> Result<(), String> {
        self.cache.health_check().await
    }
}
