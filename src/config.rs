//! Application-level configuration
//!
//! Captured once at first run and rarely edited afterwards: the panel's
//! native metrics (used to resolve "reset" requests), whether the device is
//! landscape-natural, and the safe/debug mode switches.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::info;

use crate::constants;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Native panel width in portrait orientation, pixels
    #[serde(default)]
    pub native_width: u32,

    /// Native panel height in portrait orientation, pixels
    #[serde(default)]
    pub native_height: u32,

    /// Native panel density, dpi
    #[serde(default)]
    pub native_density: u32,

    /// True when the device's natural orientation is landscape
    #[serde(default)]
    pub landscape: bool,

    /// Mirror resolution/density changes into the forced-compatibility
    /// slots so a degraded rendering path also picks up the new metrics
    #[serde(default)]
    pub safe_mode: bool,

    /// Log privileged commands instead of executing them
    #[serde(default)]
    pub debug_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            native_width: 0,
            native_height: 0,
            native_density: 0,
            landscape: false,
            safe_mode: false,
            debug_mode: false,
        }
    }
}

impl AppConfig {
    pub fn path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(constants::config::APP_DIR);
        path.push(constants::config::CONFIG_FILENAME);
        path
    }

    /// Load configuration from TOML file or create default
    pub fn load() -> Result<Self> {
        Self::load_from(Self::path())
    }

    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "config file not found, creating default");
            let config = AppConfig::default();
            config.save_to(&path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse TOML from {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
        }
        let toml_string = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    /// The native resolution string in the device's natural orientation
    pub fn native_resolution(&self) -> String {
        if self.landscape {
            format!("{}x{}", self.native_height, self.native_width)
        } else {
            format!("{}x{}", self.native_width, self.native_height)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_resolution_respects_natural_orientation() {
        let mut config = AppConfig {
            native_width: 1080,
            native_height: 1920,
            ..AppConfig::default()
        };
        assert_eq!(config.native_resolution(), "1080x1920");

        config.landscape = true;
        assert_eq!(config.native_resolution(), "1920x1080");
    }

    #[test]
    fn test_load_creates_default_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = AppConfig::load_from(path.clone()).unwrap();
        assert!(!config.safe_mode);
        assert!(path.exists());

        let mut edited = config;
        edited.safe_mode = true;
        edited.native_density = 320;
        edited.save_to(&path).unwrap();

        let reloaded = AppConfig::load_from(path).unwrap();
        assert!(reloaded.safe_mode);
        assert_eq!(reloaded.native_density, 320);
    }
}
