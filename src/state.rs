//! Current-state snapshot and its persisted store
//!
//! The snapshot is the sole source of truth for "what to undo": it mirrors
//! every profile key as the last applied value and carries the pre-profile
//! system captures consumed on turn-off. It survives process restarts and
//! is read and written by a single owner, the reconciliation engine.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::constants;
use crate::profile::Profile;
use crate::types::{DockMode, ImmersiveMode, RotationLock, ScreenTimeout, UiRefreshStrategy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentStateSnapshot {
    /// True while no profile is applied (baseline state)
    #[serde(default = "default_true")]
    pub not_active: bool,

    // Last applied profile values, mirrored from the loaded profile
    #[serde(default)]
    pub profile_name: String,
    #[serde(default = "default_reset")]
    pub size: String,
    #[serde(default = "default_reset")]
    pub density: String,
    #[serde(default)]
    pub ui_refresh: UiRefreshStrategy,
    #[serde(default)]
    pub screen_timeout: ScreenTimeout,
    #[serde(default)]
    pub rotation_lock: RotationLock,
    #[serde(default)]
    pub immersive: ImmersiveMode,
    #[serde(default)]
    pub overscan: bool,
    #[serde(default)]
    pub overscan_left: i32,
    #[serde(default)]
    pub overscan_right: i32,
    #[serde(default)]
    pub overscan_top: i32,
    #[serde(default)]
    pub overscan_bottom: i32,
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
    #[serde(default)]
    pub navbar_forced: bool,
    #[serde(default)]
    pub wifi_on: bool,
    #[serde(default)]
    pub bluetooth_on: bool,

    // Pre-profile system captures, meaningful only while the matching
    // override is active; reset to defaults once restored
    #[serde(default)]
    pub wifi_on_system: bool,
    #[serde(default)]
    pub bluetooth_on_system: bool,
    #[serde(default)]
    pub daydreams_on_system: bool,
    #[serde(default)]
    pub daydreams_charging_system: bool,
    #[serde(default)]
    pub show_touches_system: bool,
    #[serde(default)]
    pub navbar_system: bool,
    #[serde(default = "default_screen_timeout")]
    pub screen_timeout_system: i32,
    #[serde(default)]
    pub stay_on_system: i32,
    #[serde(default)]
    pub user_rotation: i32,
    #[serde(default = "default_one")]
    pub rotation_setting: i32,

    /// Dock mode the system had before any profile, restored on turn-off
    #[serde(default)]
    pub dock_mode: DockMode,
    /// Dock mode last computed by a load pass
    #[serde(default)]
    pub dock_mode_current: DockMode,

    /// Captured vibration amplitude, or -1 when not overridden
    #[serde(default = "default_unset")]
    pub vibration_value: i32,
    /// Captured backlight value, or -1 when not overridden
    #[serde(default = "default_unset")]
    pub backlight_value: i32,
    /// Captured auto-brightness mode, consumed with `backlight_value`
    #[serde(default)]
    pub auto_brightness: i32,

    // One-shot flags set by external collaborators, cleared when consumed
    #[serde(default)]
    pub force_safe_mode: bool,
    #[serde(default)]
    pub force_ui_refresh: bool,

    /// Identity of the active profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Identity to fall back to when a turn-off fails for lack of privilege
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename_backup: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_one() -> i32 {
    1
}

fn default_reset() -> String {
    "reset".to_string()
}

fn default_screen_timeout() -> i32 {
    constants::defaults::SCREEN_TIMEOUT_MS
}

fn default_unset() -> i32 {
    constants::defaults::VALUE_UNSET
}

impl Default for CurrentStateSnapshot {
    fn default() -> Self {
        // serde defaults are the single definition of the baseline state
        toml::from_str("").expect("empty snapshot deserializes")
    }
}

impl CurrentStateSnapshot {
    /// Mirror a loaded profile's values as the applied state and leave the
    /// baseline. Captures and dock bookkeeping are written by the engine
    /// during the pass itself.
    pub fn record_applied(&mut self, profile: &Profile) {
        self.profile_name = profile.profile_name.clone();
        self.size = profile.size.clone();
        self.density = profile.density.clone();
        self.ui_refresh = profile.ui_refresh;
        self.screen_timeout = profile.screen_timeout;
        self.rotation_lock = profile.rotation_lock;
        self.immersive = profile.immersive;
        self.overscan = profile.overscan;
        self.overscan_left = profile.overscan_left;
        self.overscan_right = profile.overscan_right;
        self.overscan_top = profile.overscan_top;
        self.overscan_bottom = profile.overscan_bottom;
        self.chrome_desktop = profile.chrome_desktop;
        self.daydreams_on = profile.daydreams_on;
        self.vibration_off = profile.vibration_off;
        self.backlight_off = profile.backlight_off;
        self.show_touches = profile.show_touches;
        self.navbar_forced = profile.navbar_forced;
        self.wifi_on = profile.wifi_on;
        self.bluetooth_on = profile.bluetooth_on;
        self.not_active = false;
    }

}

/// Persisted snapshot record under the app config dir
pub struct CurrentStateStore {
    path: PathBuf,
}

impl CurrentStateStore {
    pub fn open_default() -> Result<Self> {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(constants::config::APP_DIR);
        path.push(constants::config::STATE_FILENAME);
        Ok(Self { path })
    }

    pub fn open(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load the persisted snapshot, or the baseline default when none has
    /// been written yet
    pub fn load(&self) -> Result<CurrentStateSnapshot> {
        if !self.path.exists() {
            return Ok(CurrentStateSnapshot::default());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state from {}", self.path.display()))?;
        let snapshot: CurrentStateSnapshot = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse state file {}", self.path.display()))?;
        Ok(snapshot)
    }

    pub fn save(&self, snapshot: &CurrentStateSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create state directory {}", parent.display()))?;
        }
        let toml_string = toml::to_string_pretty(snapshot).context("Failed to serialize state")?;
        fs::write(&self.path, toml_string)
            .with_context(|| format!("Failed to write state to {}", self.path.display()))?;
        debug!(path = %self.path.display(), "saved current state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_snapshot_is_baseline() {
        let snapshot = CurrentStateSnapshot::default();
        assert!(snapshot.not_active);
        assert_eq!(snapshot.vibration_value, -1);
        assert_eq!(snapshot.backlight_value, -1);
        assert_eq!(snapshot.rotation_setting, 1);
        assert_eq!(snapshot.screen_timeout_system, 60_000);
        assert_eq!(snapshot.size, "reset");
        assert!(snapshot.filename.is_none());
    }

    #[test]
    fn test_record_applied_mirrors_profile_and_activates() {
        let mut snapshot = CurrentStateSnapshot::default();
        let profile = Profile {
            profile_name: "Desk".into(),
            size: "1920x1080".into(),
            chrome_desktop: true,
            ..Profile::default()
        };
        snapshot.record_applied(&profile);
        assert!(!snapshot.not_active);
        assert_eq!(snapshot.size, "1920x1080");
        assert!(snapshot.chrome_desktop);
    }

    #[test]
    fn test_store_round_trip_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = CurrentStateStore::open(dir.path().join("current.toml"));

        assert_eq!(store.load().unwrap(), CurrentStateSnapshot::default());

        let mut snapshot = CurrentStateSnapshot::default();
        snapshot.record_applied(&Profile {
            profile_name: "Desk".into(),
            ..Profile::default()
        });
        snapshot.filename = Some("desk".into());
        store.save(&snapshot).unwrap();

        assert_eq!(store.load().unwrap(), snapshot);
    }
}
