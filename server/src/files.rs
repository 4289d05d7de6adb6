use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Sub-directory for cached avatar images, served as `/files/avatars/...`
pub const AVATARS_SUBDIR: &str = "avatars";

/// Blob storage on the local filesystem, rooted at the configured files
/// directory. Filenames are generated server-side, so paths never contain
/// client input.
#[derive(Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory the static file routes serve from
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_path(&self, subdir: &str, filename: &str) -> PathBuf {
        self.root.join(subdir).join(filename)
    }

    /// Write a blob, creating the sub-directory on first use
    pub async fn save(&self, subdir: &str, filename: &str, bytes: &[u8]) -> io::Result<()> {
        fs::create_dir_all(self.root.join(subdir)).await?;
        fs::write(self.file_path(subdir, filename), bytes).await
    }

    /// Whether a previously saved blob is still present
    pub async fn exists(&self, subdir: &str, filename: &str) -> bool {
        fs::try_exists(self.file_path(subdir, filename))
            .await
            .unwrap_or(false)
    }

    /// Remove a blob; removing a missing blob is not an error
    pub async fn delete(&self, subdir: &str, filename: &str) -> io::Result<()> {
        match fs::remove_file(self.file_path(subdir, filename)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}
