//! User settings stored as JSON next to the application.

use crate::stroke::Rgb;
use crate::tools::{Brush, DEFAULT_RADIUS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name used inside the configuration directory.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Settings errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Could not determine configuration directory")]
    NoConfigDir,
}

/// Result type for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Window and brush preferences.
///
/// Every field has a default, so a partial or older file still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub fixed_time_step: bool,
    pub vsync: bool,
    pub fullscreen: bool,
    pub borderless: bool,
    /// Brush radius in screen pixels.
    pub brush_radius: f64,
    pub brush_color: Rgb,
    /// Background color for new drawings.
    pub background_color: Rgb,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            x: 320,
            y: 180,
            width: 1280,
            height: 720,
            fixed_time_step: true,
            vsync: false,
            fullscreen: false,
            borderless: false,
            brush_radius: DEFAULT_RADIUS,
            brush_color: Rgb::pen_default(),
            background_color: Rgb::black(),
        }
    }
}

impl Settings {
    /// Default settings path.
    ///
    /// On Unix: `~/.config/strokeplane/settings.json`
    /// On Windows: `%APPDATA%\strokeplane\settings.json`
    pub fn default_path() -> SettingsResult<PathBuf> {
        let base = dirs::config_dir()
            .or_else(dirs::home_dir)
            .ok_or(SettingsError::NoConfigDir)?;
        Ok(base.join("strokeplane").join(SETTINGS_FILE_NAME))
    }

    /// Read settings from `path`, creating the file with defaults if it is missing.
    ///
    /// A file that exists but cannot be parsed is left alone and the defaults
    /// are used for this run.
    pub fn load_or_create(path: &Path) -> SettingsResult<Self> {
        if !path.exists() {
            let settings = Self::default();
            settings.save(path)?;
            log::info!("wrote default settings to {}", path.display());
            return Ok(settings);
        }

        let json = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match serde_json::from_str(&json) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                log::warn!("ignoring unreadable settings {}: {e}", path.display());
                Ok(Self::default())
            }
        }
    }

    /// Write settings to `path`, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> SettingsResult<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| SettingsError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The brush new sessions start with.
    pub fn brush(&self) -> Brush {
        Brush {
            radius: self.brush_radius,
            color: self.brush_color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_or_create_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE_NAME);

        let settings = Settings::load_or_create(&path).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(path.exists());

        let reloaded = Settings::load_or_create(&path).unwrap();
        assert_eq!(reloaded, settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, r#"{ "width": 800, "vsync": true, "unknown": 1 }"#).unwrap();

        let settings = Settings::load_or_create(&path).unwrap();
        assert_eq!(settings.width, 800);
        assert!(settings.vsync);
        assert_eq!(settings.height, 720);
        assert_eq!(settings.brush_color, Rgb::pen_default());
    }

    #[test]
    fn test_unreadable_file_is_kept() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, "not json").unwrap();

        let settings = Settings::load_or_create(&path).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(fs::read_to_string(&path).unwrap(), "not json");
    }

    #[test]
    fn test_save_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        let settings = Settings {
            fullscreen: true,
            brush_radius: 3.5,
            background_color: Rgb::white(),
            ..Settings::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load_or_create(&path).unwrap(), settings);
        assert!((settings.brush().radius - 3.5).abs() < f64::EPSILON);
    }
}
