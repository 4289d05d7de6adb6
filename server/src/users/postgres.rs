use super::{
    AvatarPatch, DiscordIdentity, DiscordIdentityPatch, NewUser, User, UserStoreBackend,
    UserStoreError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, is_super_admin, discord_id, discord_username, \
     discord_display_name, discord_avatar_hash, discord_avatar_filename, created_at, updated_at";

/// Row type for user queries
#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    is_super_admin: bool,
    discord_id: String,
    discord_username: String,
    discord_display_name: String,
    discord_avatar_hash: Option<String>,
    discord_avatar_filename: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            is_super_admin: row.is_super_admin,
            discord: DiscordIdentity {
                id: row.discord_id,
                username: row.discord_username,
                display_name: row.discord_display_name,
                avatar_hash: row.discord_avatar_hash,
                avatar_filename: row.discord_avatar_filename,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Postgres-backed user store
#[derive(Clone)]
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    /// Connect to Postgres and bring the schema up to date
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, UserStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| UserStoreError::Database(format!("Failed to connect: {}", e)))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| UserStoreError::Database(format!("Migration failed: {}", e)))?;

        Ok(Self { pool })
    }

    fn map_conflict(err: sqlx::Error, conflict: UserStoreError) -> UserStoreError {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.code().as_deref() == Some("23505") {
                return conflict;
            }
        }
        UserStoreError::Database(err.to_string())
    }

    async fn fetch_one_by(&self, column: &str, value: &str) -> Result<Option<User>, UserStoreError> {
        let query = format!(
            "SELECT {} FROM users WHERE {} = $1",
            USER_COLUMNS, column
        );
        let row: Option<UserRow> = sqlx::query_as(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| UserStoreError::Database(e.to_string()))?;
        Ok(row.map(User::from))
    }
}

#[async_trait]
impl UserStoreBackend for PostgresUserStore {
    async fn create(&self, new_user: NewUser) -> Result<User, UserStoreError> {
        let now = Utc::now();
        let query = format!(
            "INSERT INTO users ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
            USER_COLUMNS, USER_COLUMNS
        );
        let row: UserRow = sqlx::query_as(&query)
            .bind(Uuid::new_v4())
            .bind(new_user.is_super_admin)
            .bind(&new_user.discord.id)
            .bind(&new_user.discord.username)
            .bind(&new_user.discord.display_name)
            .bind(&new_user.discord.avatar_hash)
            .bind(&new_user.discord.avatar_filename)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Self::map_conflict(e, UserStoreError::duplicate_identity()))?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserStoreError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row: Option<UserRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| UserStoreError::Database(e.to_string()))?;
        Ok(row.map(User::from))
    }

    async fn find_by_discord_id(&self, discord_id: &str) -> Result<Option<User>, UserStoreError> {
        self.fetch_one_by("discord_id", discord_id).await
    }

    async fn find_by_discord_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, UserStoreError> {
        self.fetch_one_by("discord_username", username).await
    }

    async fn update_discord_identity(
        &self,
        id: Uuid,
        patch: DiscordIdentityPatch,
    ) -> Result<User, UserStoreError> {
        let row: Option<UserRow> = match patch.avatar {
            AvatarPatch::Set { hash, filename } => {
                // COALESCE keeps the stored filename when no fresh images
                // were cached for this login
                let query = format!(
                    "UPDATE users SET discord_username = $2, discord_display_name = $3, \
                     discord_avatar_hash = $4, \
                     discord_avatar_filename = COALESCE($5, discord_avatar_filename), \
                     updated_at = $6 WHERE id = $1 RETURNING {}",
                    USER_COLUMNS
                );
                sqlx::query_as(&query)
                    .bind(id)
                    .bind(&patch.username)
                    .bind(&patch.display_name)
                    .bind(&hash)
                    .bind(&filename)
                    .bind(Utc::now())
                    .fetch_optional(&self.pool)
                    .await
            }
            AvatarPatch::Clear => {
                let query = format!(
                    "UPDATE users SET discord_username = $2, discord_display_name = $3, \
                     discord_avatar_hash = NULL, discord_avatar_filename = NULL, \
                     updated_at = $4 WHERE id = $1 RETURNING {}",
                    USER_COLUMNS
                );
                sqlx::query_as(&query)
                    .bind(id)
                    .bind(&patch.username)
                    .bind(&patch.display_name)
                    .bind(Utc::now())
                    .fetch_optional(&self.pool)
                    .await
            }
        }
        .map_err(|e| Self::map_conflict(e, UserStoreError::duplicate_username()))?;

        row.map(User::from).ok_or(UserStoreError::NotFound)
    }

    async fn set_super_admin(
        &self,
        id: Uuid,
        is_super_admin: bool,
    ) -> Result<User, UserStoreError> {
        let query = format!(
            "UPDATE users SET is_super_admin = $2, updated_at = $3 WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        let row: Option<UserRow> = sqlx::query_as(&query)
            .bind(id)
            .bind(is_super_admin)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| UserStoreError::Database(e.to_string()))?;
        row.map(User::from).ok_or(UserStoreError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<(), UserStoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| UserStoreError::Database(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(UserStoreError::NotFound);
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), String> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| format!("Postgres health check failed: {}", e))
    }
}
