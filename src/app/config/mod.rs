use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub mod settings;
pub mod user;

pub use settings::{ActionKind, ActionSettings, DialAction, DisplayMode, GlobalSettings, RatingDisplay, RatingMode};
pub use user::{Timing, UserConfig};

pub struct AppConfig;

impl AppConfig {
    pub fn get_config_dir() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config").join("ampdeck")
    }

    pub fn get_config_path() -> PathBuf {
        Self::get_config_dir().join("config.toml")
    }

    /// Log files live under the platform data directory.
    pub fn get_log_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("ampdeck")
            .join("logs")
    }

    pub fn read(path: &Path) -> Result<UserConfig, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Missing or malformed files fall back to defaults.
    pub fn load(path: Option<&Path>) -> UserConfig {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::get_config_path);
        if !path.exists() {
            return UserConfig::default();
        }
        match Self::read(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring config {}: {}", path.display(), e);
                UserConfig::default()
            }
        }
    }

    /// The default config, for `--generate-config`.
    pub fn generate() -> String {
        toml::to_string_pretty(&UserConfig::default()).unwrap_or_default()
    }
}
