//! Application configuration
//!
//! Read from `<config_dir>/photo-wall/config.json` (or the file named by
//! `PHOTO_WALL_CONFIG`). A missing file means defaults; individual
//! settings can be overridden from the environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::ConfigError;

const APP_DIR: &str = "photo-wall";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the catalog and blobs live; defaults to the user data dir
    pub data_dir: Option<PathBuf>,
    /// Uploader id recorded on every photo
    pub account_uid: String,
    /// Hex SHA-256 of the shared password
    pub shared_password_sha256: Option<String>,
    pub max_upload_bytes: u64,
    /// Overrides the window's scale factor for source selection
    pub device_pixel_ratio: Option<f32>,
    /// `tracing` filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            account_uid: "shared".to_string(),
            shared_password_sha256: None,
            max_upload_bytes: 10 * 1024 * 1024,
            device_pixel_ratio: None,
            log_filter: "photo_wall=info".to_string(),
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os("PHOTO_WALL_CONFIG")
            .map(PathBuf::from)
            .or_else(default_config_path);

        let mut config = match path {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a config file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read { path: path.display().to_string(), source })
            }
        };

        let config = serde_json::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.display().to_string(), source })?;
        info!("⚙️  Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply `PHOTO_WALL_*` overrides looked up through `var`
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = var("PHOTO_WALL_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(hash) = var("PHOTO_WALL_PASSWORD_SHA256") {
            self.shared_password_sha256 = Some(hash);
        }
        if let Some(uid) = var("PHOTO_WALL_UID") {
            self.account_uid = uid;
        }
        if let Some(ratio) = var("PHOTO_WALL_PIXEL_RATIO") {
            match ratio.parse::<f32>() {
                Ok(ratio) => self.device_pixel_ratio = Some(ratio),
                Err(e) => warn!("Invalid PHOTO_WALL_PIXEL_RATIO value: {e}"),
            }
        }
    }

    /// Resolved data directory
    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let mut path = dirs::data_dir()
            .or_else(dirs::home_dir)
            .ok_or(ConfigError::NoDataDir)?;
        path.push(APP_DIR);
        Ok(path)
    }
}

/// `<config_dir>/photo-wall/config.json`
fn default_config_path() -> Option<PathBuf> {
    let mut path = dirs::config_dir()?;
    path.push(APP_DIR);
    path.push("config.json");
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "account_uid": "q", "max_upload_bytes": 5 }"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.account_uid, "q");
        assert_eq!(config.max_upload_bytes, 5);
        assert_eq!(config.log_filter, Config::default().log_filter);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_environment_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PHOTO_WALL_DATA_DIR", "/srv/wall"),
            ("PHOTO_WALL_UID", "qs"),
            ("PHOTO_WALL_PIXEL_RATIO", "not-a-number"),
        ]);
        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/srv/wall"));
        assert_eq!(config.account_uid, "qs");
        assert_eq!(config.device_pixel_ratio, None);
    }
}
