//! Saved profiles and the profile store
//!
//! A profile is a declarative bundle of desired display/system settings,
//! persisted as one TOML file per name. The store is read-only from the
//! engine's perspective except for the ephemeral quick-actions bundle,
//! which the quick-action surface rewrites before each load.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::constants;
use crate::types::{ImmersiveMode, RotationLock, ScreenTimeout, ToggleTarget, UiRefreshStrategy};

/// A named bundle of desired device settings.
///
/// Immutable once loaded for a reconciliation pass. Every field has a
/// do-nothing default so partial profile files stay loadable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Display title shown in profile lists
    #[serde(default)]
    pub profile_name: String,

    /// Requested resolution, "WxH" or "reset"
    #[serde(default = "default_reset")]
    pub size: String,

    /// Requested density in dpi, or "reset"
    #[serde(default = "default_reset")]
    pub density: String,

    #[serde(default)]
    pub overscan: bool,
    #[serde(default = "default_inset")]
    pub overscan_left: i32,
    #[serde(default = "default_inset")]
    pub overscan_right: i32,
    #[serde(default = "default_inset")]
    pub overscan_top: i32,
    #[serde(default = "default_inset")]
    pub overscan_bottom: i32,

    #[serde(default)]
    pub rotation_lock: RotationLock,

    #[serde(default)]
    pub screen_timeout: ScreenTimeout,

    #[serde(default)]
    pub chrome_desktop: bool,

    #[serde(default)]
    pub daydreams_on: bool,

    #[serde(default)]
    pub vibration_off: bool,

    #[serde(default)]
    pub backlight_off: bool,

    #[serde(default)]
    pub show_touches: bool,

    /// Force-show the navigation bar; only honored on vendor builds that
    /// expose the setting
    #[serde(default)]
    pub navbar_forced: bool,

    #[serde(default)]
    pub immersive: ImmersiveMode,

    #[serde(default)]
    pub ui_refresh: UiRefreshStrategy,

    #[serde(default)]
    pub wifi_on: bool,

    #[serde(default)]
    pub bluetooth_on: bool,

    /// Set only on the quick-actions pseudo-profile: the boolean category
    /// whose applied value should be negated at the start of the next load
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_action_toggle: Option<ToggleTarget>,
}

fn default_reset() -> String {
    "reset".to_string()
}

fn default_inset() -> i32 {
    constants::defaults::OVERSCAN_INSET
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            profile_name: String::new(),
            size: default_reset(),
            density: default_reset(),
            overscan: false,
            overscan_left: default_inset(),
            overscan_right: default_inset(),
            overscan_top: default_inset(),
            overscan_bottom: default_inset(),
            rotation_lock: RotationLock::DoNothing,
            screen_timeout: ScreenTimeout::DoNothing,
            chrome_desktop: false,
            daydreams_on: false,
            vibration_off: false,
            backlight_off: false,
            show_touches: false,
            navbar_forced: false,
            immersive: ImmersiveMode::DoNothing,
            ui_refresh: UiRefreshStrategy::DoNothing,
            wifi_on: false,
            bluetooth_on: false,
            quick_action_toggle: None,
        }
    }
}

impl Profile {
    /// True for the reserved ephemeral quick-actions name
    pub fn is_quick_actions(name: &str) -> bool {
        name == constants::config::QUICK_ACTIONS
    }
}

/// One TOML file per named profile under the app config dir
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn open_default() -> Result<Self> {
        let mut dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        dir.push(constants::config::APP_DIR);
        dir.push(constants::config::PROFILE_DIR);
        Self::open(dir)
    }

    pub fn open(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create profile directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.toml"))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).exists()
    }

    pub fn get(&self, name: &str) -> Result<Profile> {
        let path = self.path_for(name);
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read profile `{name}` from {}", path.display()))?;
        let profile: Profile = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse profile `{name}`"))?;
        Ok(profile)
    }

    pub fn save(&self, name: &str, profile: &Profile) -> Result<()> {
        let path = self.path_for(name);
        let toml_string =
            toml::to_string_pretty(profile).context("Failed to serialize profile")?;
        fs::write(&path, toml_string)
            .with_context(|| format!("Failed to write profile `{name}` to {}", path.display()))?;
        debug!(profile = %name, "saved profile");
        Ok(())
    }

    /// All saved profiles as (name, display title), sorted by title.
    /// The quick-actions bundle is internal and not listed.
    pub fn list(&self) -> Result<Vec<(String, String)>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list profiles in {}", self.dir.display()))?
        {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if Profile::is_quick_actions(name) {
                continue;
            }
            match self.get(name) {
                Ok(profile) => entries.push((name.to_string(), profile.profile_name)),
                Err(e) => debug!(profile = %name, error = %e, "skipping unreadable profile"),
            }
        }
        entries.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(entries)
    }

    /// Drop the ephemeral quick-actions bundle. Called when a normal
    /// profile loads and on turn-off.
    pub fn clear_quick_actions(&self) -> Result<()> {
        let path = self.path_for(constants::config::QUICK_ACTIONS);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
            info!("cleared quick actions");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, ProfileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::open(dir.path().join("profiles")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_profile_round_trip() {
        let (_tmp, store) = store();
        let profile = Profile {
            profile_name: "External 1080p".into(),
            size: "1920x1080".into(),
            density: "240".into(),
            rotation_lock: RotationLock::Landscape,
            ui_refresh: UiRefreshStrategy::RestartCompositor,
            chrome_desktop: true,
            ..Profile::default()
        };
        store.save("external_1080p", &profile).unwrap();

        let loaded = store.get("external_1080p").unwrap();
        assert_eq!(loaded, profile);
    }

    #[test]
    fn test_partial_profile_uses_do_nothing_defaults() {
        let (_tmp, store) = store();
        fs::write(
            store.path_for("minimal"),
            "profile_name = \"Minimal\"\nsize = \"1280x720\"\n",
        )
        .unwrap();

        let loaded = store.get("minimal").unwrap();
        assert_eq!(loaded.size, "1280x720");
        assert_eq!(loaded.density, "reset");
        assert_eq!(loaded.rotation_lock, RotationLock::DoNothing);
        assert_eq!(loaded.overscan_left, 20);
        assert!(!loaded.chrome_desktop);
    }

    #[test]
    fn test_list_sorts_by_title_and_hides_quick_actions() {
        let (_tmp, store) = store();
        let mut p = Profile::default();
        p.profile_name = "Zebra".into();
        store.save("zzz", &p).unwrap();
        p.profile_name = "Alpha".into();
        store.save("aaa", &p).unwrap();
        p.profile_name = "Quick".into();
        store.save(constants::config::QUICK_ACTIONS, &p).unwrap();

        let list = store.list().unwrap();
        assert_eq!(
            list,
            vec![
                ("aaa".to_string(), "Alpha".to_string()),
                ("zzz".to_string(), "Zebra".to_string())
            ]
        );
    }

    #[test]
    fn test_clear_quick_actions_is_idempotent() {
        let (_tmp, store) = store();
        store.clear_quick_actions().unwrap();
        store
            .save(constants::config::QUICK_ACTIONS, &Profile::default())
            .unwrap();
        store.clear_quick_actions().unwrap();
        assert!(!store.exists(constants::config::QUICK_ACTIONS));
    }
}
