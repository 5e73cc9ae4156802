use directories::{ProjectDirs, UserDirs};
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join("solostudy"),
            )
        } else {
            ProjectDirs::from("", "", "solostudy")
                .map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
        }
    }

    pub fn state_db_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("state.db"))
    }

    pub fn log_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("solostudy.log"))
    }

    /// Where exports land when nothing else is configured.
    pub fn default_export_dir() -> PathBuf {
        UserDirs::new()
            .and_then(|dirs| dirs.document_dir().map(|d| d.join("solostudy")))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
