use crate::app_dirs::AppDirs;
use crate::session::DEFAULT_SESSION_NAME;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub default_minutes: i64,
    pub default_session_name: String,
    pub export_dir: Option<PathBuf>,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_minutes: 60,
            default_session_name: DEFAULT_SESSION_NAME.to_string(),
            export_dir: None,
            log_filter: "info".to_string(),
        }
    }
}

/// Effective settings for one run: config file values with command line
/// overrides applied.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeSettings {
    pub session_name: String,
    pub minutes: i64,
    pub export_dir: PathBuf,
    pub state_db: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub log_filter: String,
}

impl RuntimeSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            session_name: cfg.default_session_name.clone(),
            minutes: cfg.default_minutes,
            export_dir: cfg
                .export_dir
                .clone()
                .unwrap_or_else(AppDirs::default_export_dir),
            state_db: None,
            log_file: AppDirs::log_path(),
            log_filter: cfg.log_filter.clone(),
        }
    }
}

impl From<&RuntimeSettings> for Config {
    fn from(rs: &RuntimeSettings) -> Self {
        Self {
            default_minutes: rs.minutes,
            default_session_name: rs.session_name.clone(),
            export_dir: Some(rs.export_dir.clone()),
            log_filter: rs.log_filter.clone(),
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "solostudy") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("solostudy_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(cfg) = serde_json::from_slice::<Config>(&bytes) {
                return cfg;
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
