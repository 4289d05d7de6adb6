//! Avatar image caching keyed by Discord's avatar content hash.

use super::discord::{DiscordClient, DiscordProfile};
use crate::files::{FileStore, AVATARS_SUBDIR};
use crate::ids;
use crate::users::User;
use log::warn;
use std::sync::Arc;

/// Freshly downloaded avatar renditions, not yet written to storage
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarImages {
    /// Generated base filename shared by the renditions
    pub filename: String,
    pub png_data: Vec<u8>,
    /// Present only for animated avatars
    pub gif_data: Option<Vec<u8>>,
}

/// Keeps locally cached avatar images in sync with the hash Discord
/// reports. Everything here is best-effort: a login never fails because an
/// image could not be downloaded, written or removed.
#[derive(Clone)]
pub struct AvatarCache {
    discord: Arc<DiscordClient>,
    files: Arc<FileStore>,
}

impl AvatarCache {
    pub fn new(discord: Arc<DiscordClient>, files: Arc<FileStore>) -> Self {
        Self { discord, files }
    }

    /// Download all renditions for an avatar hash under a fresh filename.
    ///
    /// All-or-nothing: if the GIF of an animated avatar fails after the PNG
    /// succeeded, the whole download counts as failed.
    pub async fn fetch_avatar_images(
        &self,
        discord_user_id: &str,
        avatar_hash: &str,
    ) -> Option<AvatarImages> {
        let filename = ids::opaque_token();

        let png_data = match self
            .discord
            .fetch_avatar(discord_user_id, avatar_hash, "png")
            .await
        {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(
                    "Failed to download avatar {} for {}: {}",
                    avatar_hash, discord_user_id, err
                );
                return None;
            }
        };

        let gif_data = if DiscordProfile::is_animated_avatar(avatar_hash) {
            match self
                .discord
                .fetch_avatar(discord_user_id, avatar_hash, "gif")
                .await
            {
                Ok(bytes) => Some(bytes),
                Err(err) => {
                    warn!(
                        "Failed to download animated avatar {} for {}: {}",
                        avatar_hash, discord_user_id, err
                    );
                    return None;
                }
            }
        } else {
            None
        };

        Some(AvatarImages {
            filename,
            png_data,
            gif_data,
        })
    }

    /// Whether the cached images no longer match the reported hash
    async fn is_stale(&self, user: &User, avatar_hash: &str) -> bool {
        if user.discord.avatar_hash.as_deref() != Some(avatar_hash) {
            return true;
        }
        let Some(filename) = user.discord.avatar_filename.as_deref() else {
            return true;
        };
        if !self
            .files
            .exists(AVATARS_SUBDIR, &format!("{}.png", filename))
            .await
        {
            return true;
        }
        if DiscordProfile::is_animated_avatar(avatar_hash)
            && !self
                .files
                .exists(AVATARS_SUBDIR, &format!("{}.gif", filename))
                .await
        {
            return true;
        }
        false
    }

    /// Fetch replacement images when the cache is stale, removing the old
    /// renditions. Returns None when the cache is current or the download
    /// failed; the old files are removed only after a successful download
    /// so a flaky CDN never leaves the user without an avatar.
    pub async fn refresh_if_stale(&self, user: &User, avatar_hash: &str) -> Option<AvatarImages> {
        if !self.is_stale(user, avatar_hash).await {
            return None;
        }

        let images = self
            .fetch_avatar_images(&user.discord.id, avatar_hash)
            .await?;

        if let Some(old_filename) = user.discord.avatar_filename.as_deref() {
            self.delete_renditions(old_filename).await;
        }
        Some(images)
    }

    /// Write the renditions to storage. Returns false when any write
    /// failed; the caller then leaves the filename pointer out of the user
    /// record and the next login re-fetches.
    pub async fn persist(&self, images: &AvatarImages) -> bool {
        let png_name = format!("{}.png", images.filename);
        if let Err(err) = self
            .files
            .save(AVATARS_SUBDIR, &png_name, &images.png_data)
            .await
        {
            warn!("Failed to save avatar {}: {}", png_name, err);
            return false;
        }

        if let Some(gif_data) = &images.gif_data {
            let gif_name = format!("{}.gif", images.filename);
            if let Err(err) = self.files.save(AVATARS_SUBDIR, &gif_name, gif_data).await {
                warn!("Failed to save avatar {}: {}", gif_name, err);
                return false;
            }
        }
        true
    }

    async fn delete_renditions(&self, filename: &str) {
        for extension in ["png", "gif"] {
            let name = format!("{}.{}", filename, extension);
            if let Err(err) = self.files.delete(AVATARS_SUBDIR, &name).await {
                warn!("Failed to remove stale avatar {}: {}", name, err);
            }
        }
    }
}
