use crate::api::auth::avatars::AvatarCache;
use crate::api::auth::discord::DiscordClient;
use crate::api::auth::login_state::{LoginStateStore, RedirectUrlValidator};
use crate::api::auth::token_manager::TokenManager;
use crate::cache::{create_cache, Cache};
use crate::config::AppConfig;
use crate::files::FileStore;
use crate::session::SessionStore;
use crate::users::{create_user_store, UserStore};
use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};
use std::sync::Arc;

/// Shared application state handed to every handler.
///
/// Two cache instances are created from the same configuration: sessions
/// live as long as the cookie max-age, login states only for the state TTL.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: SessionStore,
    pub login_states: LoginStateStore,
    pub tokens: TokenManager,
    pub users: UserStore,
    pub discord: Arc<DiscordClient>,
    pub avatars: AvatarCache,
    pub files: Arc<FileStore>,
    cookie_key: Key,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Key {
        state.cookie_key.clone()
    }
}

impl AppState {
    pub async fn new(config: AppConfig) -> Result<Self, String> {
        let session_ttl_secs = config.auth.session_cookie_max_age_ms.div_ceil(1000);
        let session_cache = create_cache(&config.cache, session_ttl_secs)
            .await
            .map_err(|e| format!("Failed to create session store: {}", e))?;
        let state_cache = create_cache(&config.cache, config.auth.login_state_ttl_secs)
            .await
            .map_err(|e| format!("Failed to create login-state store: {}", e))?;
        let validator = RedirectUrlValidator::new(config.auth.get_allowed_origins())?;
        let users = create_user_store(&config.database)
            .await
            .map_err(|e| format!("Failed to create user store: {}", e))?;
        let discord = Arc::new(DiscordClient::new(
            config.discord.clone(),
            config.callback_url(),
        ));
        let files = Arc::new(FileStore::new(config.files.directory.clone()));
        Ok(Self::assemble(
            config,
            session_cache,
            state_cache,
            validator,
            users,
            discord,
            files,
        ))
    }

    fn assemble(
        config: AppConfig,
        session_cache: Cache,
        state_cache: Cache,
        validator: RedirectUrlValidator,
        users: UserStore,
        discord: Arc<DiscordClient>,
        files: Arc<FileStore>,
    ) -> Self {
        Self {
            sessions: SessionStore::new(session_cache),
            login_states: LoginStateStore::new(state_cache, validator),
            tokens: TokenManager::new(config.auth.session_cookie_max_age_ms),
            avatars: AvatarCache::new(discord.clone(), files.clone()),
            cookie_key: derive_cookie_key(&config.auth.session_secret),
            users,
            discord,
            files,
            config: Arc::new(config),
        }
    }

    /// Key the session cookie is signed with
    pub(crate) fn cookie_key(&self) -> Key {
        self.cookie_key.clone()
    }
}

/// Stretch the configured session secret into signing key material.
/// `Key::from` wants at least 64 bytes; a SHA-512 digest is exactly that.
fn derive_cookie_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

#[cfg(test)]
impl AppState {
    /// State wired entirely to in-process backends, for tests
    pub(crate) fn for_testing(config: AppConfig, files_root: &std::path::Path) -> Self {
        use crate::cache::memory::InMemoryCache;
        use crate::users::memory::MemoryUserStore;

        let session_ttl_secs = config.auth.session_cookie_max_age_ms.div_ceil(1000);
        let session_cache =
            Cache::InMemory(InMemoryCache::new(session_ttl_secs, 16).expect("session cache"));
        let state_cache = Cache::InMemory(
            InMemoryCache::new(config.auth.login_state_ttl_secs, 16).expect("state cache"),
        );
        let validator =
            RedirectUrlValidator::new(config.auth.get_allowed_origins()).expect("validator");
        let users = UserStore::Memory(MemoryUserStore::new());
        let discord = Arc::new(DiscordClient::new(
            config.discord.clone(),
            config.callback_url(),
        ));
        let files = Arc::new(FileStore::new(files_root));
        Self::assemble(
            config, session_cache, state_cache, validator, users, discord, files,
        )
    }
}
