//! Core value types shared across the engine, stores and CLI

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rotation handling requested by a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RotationLock {
    #[default]
    DoNothing,
    AutoRotate,
    Landscape,
}

/// Screen timeout handling requested by a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScreenTimeout {
    #[default]
    DoNothing,
    AlwaysOn,
    AlwaysOnCharging,
}

/// Immersive-mode handling requested by a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImmersiveMode {
    #[default]
    DoNothing,
    StatusOnly,
    #[serde(rename = "immersive-mode")]
    Immersive,
}

/// How the UI is refreshed after a display-metric change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UiRefreshStrategy {
    #[default]
    DoNothing,
    /// Restart the system chrome / compositor process
    RestartCompositor,
    /// Restart the window manager runtime. Invalidates the running process,
    /// so part of the command plan is deferred to the boot completion step.
    RestartWindowManager,
}

/// Virtual dock state used to drive rotation via a dock broadcast.
///
/// Forcing rotation through a dock event is more reliable across OS
/// revisions than writing the rotation setting directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DockMode {
    #[default]
    Undocked,
    Desk,
    Car,
}

impl DockMode {
    /// Numeric dock state as carried by the platform dock broadcast
    pub fn broadcast_extra(self) -> i32 {
        match self {
            DockMode::Undocked => 0,
            DockMode::Desk => 1,
            DockMode::Car => 2,
        }
    }
}

/// Radio hardware toggled through the unprivileged surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Radio {
    Wifi,
    Bluetooth,
}

impl fmt::Display for Radio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Radio::Wifi => write!(f, "wifi"),
            Radio::Bluetooth => write!(f, "bluetooth"),
        }
    }
}

/// Release channel of the optional desktop-mode browser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromeChannel {
    Stable,
    Beta,
    Dev,
}

impl ChromeChannel {
    pub fn package(self) -> &'static str {
        match self {
            ChromeChannel::Dev => "com.chrome.dev",
            ChromeChannel::Beta => "com.chrome.beta",
            ChromeChannel::Stable => "com.android.chrome",
        }
    }
}

/// Namespace of a settings key on the platform surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingDomain {
    System,
    Secure,
    Global,
}

impl fmt::Display for SettingDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingDomain::System => write!(f, "system"),
            SettingDomain::Secure => write!(f, "secure"),
            SettingDomain::Global => write!(f, "global"),
        }
    }
}

/// A value requested through the quick-actions surface: either a literal,
/// or a request to negate whatever is currently applied. The toggle variant
/// is resolved by the engine before any category is evaluated; it is never
/// smuggled further down as a sentinel string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestedValue {
    Literal(String),
    ToggleCurrent,
}

impl RequestedValue {
    /// Parse a user-supplied value; the word "toggle" is the only
    /// non-literal spelling
    pub fn from_arg(arg: &str) -> Self {
        if arg.eq_ignore_ascii_case("toggle") {
            RequestedValue::ToggleCurrent
        } else {
            RequestedValue::Literal(arg.to_string())
        }
    }
}

/// Boolean-like categories a quick-action toggle may target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleTarget {
    ChromeDesktop,
    VibrationOff,
    BacklightOff,
    Overscan,
    Immersive,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_wire_names_are_kebab_case() {
        assert_eq!(
            toml::Value::try_from(RotationLock::AutoRotate).unwrap(),
            toml::Value::String("auto-rotate".into())
        );
        let v: ImmersiveMode = toml::Value::String("immersive-mode".into()).try_into().unwrap();
        assert_eq!(v, ImmersiveMode::Immersive);
        let v: UiRefreshStrategy =
            toml::Value::String("restart-window-manager".into()).try_into().unwrap();
        assert_eq!(v, UiRefreshStrategy::RestartWindowManager);
    }

    #[test]
    fn test_dock_mode_broadcast_extras() {
        assert_eq!(DockMode::Undocked.broadcast_extra(), 0);
        assert_eq!(DockMode::Desk.broadcast_extra(), 1);
        assert_eq!(DockMode::Car.broadcast_extra(), 2);
    }

    #[test]
    fn test_requested_value_parses_toggle_sentinel() {
        assert_eq!(RequestedValue::from_arg("Toggle"), RequestedValue::ToggleCurrent);
        assert_eq!(RequestedValue::from_arg("480"), RequestedValue::Literal("480".into()));
    }
}
