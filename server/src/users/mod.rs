use crate::errors::ApiError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

/// A registered user and the Discord identity it was created from
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier for the user
    pub id: Uuid,
    /// Whether the user may administer other users
    pub is_super_admin: bool,
    /// Discord identity snapshot from the most recent login
    pub discord: DiscordIdentity,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Discord profile fields mirrored into the user record
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiscordIdentity {
    /// Discord snowflake id
    pub id: String,
    /// Unique username, `name#discriminator` for legacy accounts
    pub username: String,
    /// Display name shown to other users
    pub display_name: String,
    /// Avatar content hash as reported by Discord
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_hash: Option<String>,
    /// Local filename of the cached avatar images
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_filename: Option<String>,
}

/// Fields for creating a user record
#[derive(Debug, Clone)]
pub struct NewUser {
    pub is_super_admin: bool,
    pub discord: DiscordIdentity,
}

/// Identity fields rewritten on every login of an existing user
#[derive(Debug, Clone)]
pub struct DiscordIdentityPatch {
    pub username: String,
    pub display_name: String,
    pub avatar: AvatarPatch,
}

/// What happens to the stored avatar pointer during an identity update
#[derive(Debug, Clone)]
pub enum AvatarPatch {
    /// Write the reported hash; a filename is written only when fresh
    /// images were cached, otherwise the stored filename stays
    Set {
        hash: String,
        filename: Option<String>,
    },
    /// The provider reports no avatar, drop hash and filename
    Clear,
}

/// Errors surfaced by the user store
#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("{0}")]
    Conflict(String),
    #[error("User not found.")]
    NotFound,
    #[error("Database error: {0}")]
    Database(String),
}

impl UserStoreError {
    pub fn duplicate_identity() -> Self {
        Self::Conflict("Discord ID/username is already in use.".to_string())
    }

    pub fn duplicate_username() -> Self {
        Self::Conflict("Discord username already taken.".to_string())
    }
}

impl From<UserStoreError> for ApiError {
    fn from(err: UserStoreError) -> Self {
        match err {
            UserStoreError::Conflict(detail) => ApiError::conflict(detail),
            UserStoreError::NotFound => ApiError::not_found("User not found."),
            UserStoreError::Database(_) => ApiError::internal("User store failure"),
        }
    }
}

/// Persistence contract for user records.
///
/// Both implementations enforce uniqueness of the Discord id and the unique
/// username; violations surface as [`UserStoreError::Conflict`] so handlers
/// can answer 409 instead of 500.
#[async_trait::async_trait]
pub trait UserStoreBackend: Send + Sync {
    /// Insert a new user record
    async fn create(&self, new_user: NewUser) -> Result<User, UserStoreError>;

    /// Look up a user by internal id
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserStoreError>;

    /// Look up a user by Discord snowflake id
    async fn find_by_discord_id(&self, discord_id: &str) -> Result<Option<User>, UserStoreError>;

    /// Look up a user by unique Discord username
    async fn find_by_discord_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, UserStoreError>;

    /// Rewrite the Discord identity fields of an existing user
    async fn update_discord_identity(
        &self,
        id: Uuid,
        patch: DiscordIdentityPatch,
    ) -> Result<User, UserStoreError>;

    /// Grant or revoke the super admin flag
    async fn set_super_admin(&self, id: Uuid, is_super_admin: bool)
        -> Result<User, UserStoreError>;

    /// Remove a user record
    async fn delete(&self, id: Uuid) -> Result<(), UserStoreError>;

    /// Verify the backing store is reachable
    async fn health_check(&self) -> Result<(), String>;
}

/// User store wrapper dispatching to the configured backend
#[derive(Clone)]
pub enum UserStore {
    /// Postgres-backed store used in production
    Postgres(postgres::PostgresUserStore),
    /// Process-local store for development and tests
    Memory(memory::MemoryUserStore),
}

#[async_trait::async_trait]
impl UserStoreBackend for UserStore {
    async fn create(&self, new_user: NewUser) -> Result<User, UserStoreError> {
        match self {
            Self::Postgres(store) => store.create(new_user).await,
            Self::Memory(store) => store.create(new_user).await,
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserStoreError> {
        match self {
            Self::Postgres(store) => store.find_by_id(id).await,
            Self::Memory(store) => store.find_by_id(id).await,
        }
    }

    async fn find_by_discord_id(&self, discord_id: &str) -> Result<Option<User>, UserStoreError> {
        match self {
            Self::Postgres(store) => store.find_by_discord_id(discord_id).await,
            Self::Memory(store) => store.find_by_discord_id(discord_id).await,
        }
    }

    async fn find_by_discord_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, UserStoreError> {
        match self {
            Self::Postgres(store) => store.find_by_discord_username(username).await,
            Self::Memory(store) => store.find_by_discord_username(username).await,
        }
    }

    async fn update_discord_identity(
        &self,
        id: Uuid,
        patch: DiscordIdentityPatch,
    ) -> Result<User, UserStoreError> {
        match self {
            Self::Postgres(store) => store.update_discord_identity(id, patch).await,
            Self::Memory(store) => store.update_discord_identity(id, patch).await,
        }
    }

    async fn set_super_admin(
        &self,
        id: Uuid,
        is_super_admin: bool,
    ) -> Result<User, UserStoreError> {
        match self {
            Self::Postgres(store) => store.set_super_admin(id, is_super_admin).await,
            Self::Memory(store) => store.set_super_admin(id, is_super_admin).await,
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), UserStoreError> {
        match self {
            Self::Postgres(store) => store.delete(id).await,
            Self::Memory(store) => store.delete(id).await,
        }
    }

    async fn health_check(&self) -> Result<(), String> {
        match self {
            Self::Postgres(store) => store.health_check().await,
            Self::Memory(store) => store.health_check().await,
        }
    }
}

/// Factory function to create the user store selected by configuration.
///
/// An empty database URL selects the in-memory store; anything else is
/// treated as a Postgres connection string and migrations run on startup.
pub async fn create_user_store(
    config: &crate::config::DatabaseConfig,
) -> Result<UserStore, UserStoreError> {
    if config.url.is_empty() {
        log::warn!("No database URL configured, user records will not survive restarts");
        return Ok(UserStore::Memory(memory::MemoryUserStore::new()));
    }
    let store = postgres::PostgresUserStore::connect(&config.url, config.max_connections).await?;
    Ok(UserStore::Postgres(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_identity(discord_id: &str, username: &str) -> DiscordIdentity {
        DiscordIdentity {
            id: discord_id.to_string(),
            username: username.to_string(),
            display_name: username.to_string(),
            avatar_hash: None,
            avatar_filename: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_lookups() {
        let store = UserStore::Memory(memory::MemoryUserStore::new());
        let created = store
            .create(NewUser {
                is_super_admin: false,
                discord: sample_identity("1001", "alice"),
            })
            .await
            .unwrap();

        assert!(!created.is_super_admin);
        assert_eq!(created.discord.username, "alice");

        let by_id = store.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id, created);
        let by_discord = store.find_by_discord_id("1001").await.unwrap().unwrap();
        assert_eq!(by_discord, created);
        let by_username = store
            .find_by_discord_username("alice")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_username, created);
        assert!(store.find_by_discord_id("9999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_discord_id_conflicts() {
        let store = UserStore::Memory(memory::MemoryUserStore::new());
        store
            .create(NewUser {
                is_super_admin: false,
                discord: sample_identity("1001", "alice"),
            })
            .await
            .unwrap();

        let err = store
            .create(NewUser {
                is_super_admin: false,
                discord: sample_identity("1001", "someone-else"),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, UserStoreError::Conflict(_)));
        assert_eq!(err.to_string(), "Discord ID/username is already in use.");
    }

    #[tokio::test]
    async fn test_update_identity_patch_semantics() {
        let store = UserStore::Memory(memory::MemoryUserStore::new());
        let user = store
            .create(NewUser {
                is_super_admin: false,
                discord: DiscordIdentity {
                    avatar_hash: Some("abc".to_string()),
                    avatar_filename: Some("deadbeef".to_string()),
                    ..sample_identity("1001", "alice")
                },
            })
            .await
            .unwrap();

        // New hash without fresh images keeps the stored filename
        let updated = store
            .update_discord_identity(
                user.id,
                DiscordIdentityPatch {
                    username: "alice".to_string(),
                    display_name: "Alice".to_string(),
                    avatar: AvatarPatch::Set {
                        hash: "abc".to_string(),
                        filename: None,
                    },
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.discord.avatar_hash.as_deref(), Some("abc"));
        assert_eq!(updated.discord.avatar_filename.as_deref(), Some("deadbeef"));
        assert_eq!(updated.discord.display_name, "Alice");

        // Clearing drops both pointer fields
        let cleared = store
            .update_discord_identity(
                user.id,
                DiscordIdentityPatch {
                    username: "alice".to_string(),
                    display_name: "Alice".to_string(),
                    avatar: AvatarPatch::Clear,
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.discord.avatar_hash, None);
        assert_eq!(cleared.discord.avatar_filename, None);
    }

    #[tokio::test]
    async fn test_update_missing_user_is_not_found() {
        let store = UserStore::Memory(memory::MemoryUserStore::new());
        let err = store
            .update_discord_identity(
                Uuid::new_v4(),
                DiscordIdentityPatch {
                    username: "ghost".to_string(),
                    display_name: "Ghost".to_string(),
                    avatar: AvatarPatch::Clear,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UserStoreError::NotFound));
    }

    #[tokio::test]
    async fn test_update_missing_user_stays_not_found_when_username_taken() {
        let store = UserStore::Memory(memory::MemoryUserStore::new());
        store
            .create(NewUser {
                is_super_admin: false,
                discord: sample_identity("1001", "alice"),
            })
            .await
            .unwrap();

        // The missing row wins over the username collision, like the SQL
        // UPDATE that matches no rows before any constraint can fire.
        let err = store
            .update_discord_identity(
                Uuid::new_v4(),
                DiscordIdentityPatch {
                    username: "alice".to_string(),
                    display_name: "Alice".to_string(),
                    avatar: AvatarPatch::Clear,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UserStoreError::NotFound));
    }

    #[tokio::test]
    async fn test_set_super_admin_and_delete() {
        let store = UserStore::Memory(memory::MemoryUserStore::new());
        let user = store
            .create(NewUser {
                is_super_admin: false,
                discord: sample_identity("1001", "alice"),
            })
            .await
            .unwrap();

        let promoted = store.set_super_admin(user.id, true).await.unwrap();
        assert!(promoted.is_super_admin);

        store.delete(user.id).await.unwrap();
        assert!(store.find_by_id(user.id).await.unwrap().is_none());
        assert!(matches!(
            store.delete(user.id).await.unwrap_err(),
            UserStoreError::NotFound
        ));
    }
}
