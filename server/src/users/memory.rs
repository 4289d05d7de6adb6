use super::{
    AvatarPatch, DiscordIdentityPatch, NewUser, User, UserStoreBackend, UserStoreError,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local user store. Enforces the same uniqueness rules as the
/// Postgres store so tests exercise identical conflict behavior.
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStoreBackend for MemoryUserStore {
    async fn create(&self, new_user: NewUser) -> Result<User, UserStoreError> {
        let mut users = self.users.write().await;
        let duplicate = users.values().any(|user| {
            user.discord.id == new_user.discord.id
                || user.discord.username == new_user.discord.username
        });
        if duplicate {
            return Err(UserStoreError::duplicate_identity());
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            is_super_admin: new_user.is_super_admin,
            discord: new_user.discord,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserStoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_discord_id(&self, discord_id: &str) -> Result<Option<User>, UserStoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.discord.id == discord_id)
            .cloned())
    }

    async fn find_by_discord_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, UserStoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.discord.username == username)
            .cloned())
    }

    async fn update_discord_identity(
        &self,
        id: Uuid,
        patch: DiscordIdentityPatch,
    ) -> Result<User, UserStoreError> {
        let mut users = self.users.write().await;
        // Existence first: an update of a missing row is NotFound even when the
        // new username collides, matching the Postgres UPDATE behavior.
        if !users.contains_key(&id) {
            return Err(UserStoreError::NotFound);
        }
        let username_taken = users
            .values()
            .any(|user| user.id != id && user.discord.username == patch.username);
        if username_taken {
            return Err(UserStoreError::duplicate_username());
        }

        let user = users.get_mut(&id).ok_or(UserStoreError::NotFound)?;
        user.discord.username = patch.username;
        user.discord.display_name = patch.display_name;
        match patch.avatar {
            AvatarPatch::Set { hash, filename } => {
                user.discord.avatar_hash = Some(hash);
                if let Some(filename) = filename {
                    user.discord.avatar_filename = Some(filename);
                }
            }
            AvatarPatch::Clear => {
                user.discord.avatar_hash = None;
                user.discord.avatar_filename = None;
            }
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn set_super_admin(
        &self,
        id: Uuid,
        is_super_admin: bool,
    ) -> Result<User, UserStoreError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(UserStoreError::NotFound)?;
        user.is_super_admin = is_super_admin;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), UserStoreError> {
        let mut users = self.users.write().await;
        users.remove(&id).map(|_| ()).ok_or(UserStoreError::NotFound)
    }

    async fn health_check(&self) -> Result<(), String> {
        Ok(())
    }
}
