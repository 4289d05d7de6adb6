//! Avatar file storage configuration

use confique::Config;

/// Where cached avatar images are written and served from
#[derive(Debug, Config, Clone)]
pub struct FilesConfig {
    /// Root directory for stored files (default: "files")
    #[config(env = "ROLLCALL_FILES_DIRECTORY", default = "files")]
    pub directory: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            directory: "files".to_string(),
        }
    }
}
