//! Platform surfaces
//!
//! Two seams separate the engine from the live device: `SettingsSurface`
//! (typed get/put of settings keys and radio toggles, the unprivileged
//! side) and `SystemProbe` (read-only discovery: display metrics, package
//! versions, pids, sysfs controls). Probes never fail loudly: an
//! unreadable value yields its documented default, and an absent resource
//! yields `None` so the affected category becomes a no-op.

use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

use crate::error::SettingError;
use crate::types::{DockMode, Radio, SettingDomain};

/// Live display metrics in the current orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayMetrics {
    pub width_px: u32,
    pub height_px: u32,
    pub density_dpi: u32,
    /// True when the display is currently in landscape orientation
    pub landscape: bool,
}

pub trait SettingsSurface {
    /// Read an integer setting, substituting `default` when the key is
    /// absent or unreadable
    fn get_int(&self, domain: SettingDomain, key: &str, default: i32) -> i32;

    fn put_int(&mut self, domain: SettingDomain, key: &str, value: i32)
    -> Result<(), SettingError>;

    /// Radio state, `None` when the radio is not present on this device
    fn radio_enabled(&self, radio: Radio) -> Option<bool>;

    fn set_radio(&mut self, radio: Radio, on: bool) -> Result<(), SettingError>;
}

pub trait SystemProbe {
    fn api_level(&self) -> u32;

    fn display_metrics(&self) -> DisplayMetrics;

    /// Current dock state as reported by the UI-mode service
    fn dock_state(&self) -> DockMode;

    /// Panel density from the build properties, if exposed
    fn native_density(&self) -> Option<u32>;

    fn has_feature(&self, feature: &str) -> bool;

    /// Installed version of a package, `None` when not installed
    fn package_version(&self, package: &str) -> Option<String>;

    fn pid_of(&self, process: &str) -> Option<u32>;

    fn launcher_package(&self) -> Option<String>;

    /// First of the candidate control files present on this device
    fn first_existing_path(&self, candidates: &[&str]) -> Option<PathBuf>;

    /// Read an integer from a control file
    fn read_value(&self, path: &Path) -> Option<i32>;

    fn external_display_connected(&self) -> bool;

    fn cast_screen_active(&self) -> bool;
}

/// Everything the engine needs from the platform
pub trait System: SettingsSurface + SystemProbe {}
impl<T: SettingsSurface + SystemProbe> System for T {}

/// Run a command and return stdout on success
fn sh(program: &str, args: &[&str]) -> Option<String> {
    match Command::new(program).args(args).output() {
        Ok(output) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        Ok(output) => {
            debug!(program, ?args, status = %output.status, "command failed");
            None
        }
        Err(e) => {
            debug!(program, ?args, error = %e, "command not runnable");
            None
        }
    }
}

/// Shell-backed implementation for a live device
pub struct ShellSystem;

impl ShellSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ShellSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsSurface for ShellSystem {
    fn get_int(&self, domain: SettingDomain, key: &str, default: i32) -> i32 {
        let Some(out) = sh("settings", &["get", &domain.to_string(), key]) else {
            return default;
        };
        let trimmed = out.trim();
        if trimmed == "null" {
            return default;
        }
        trimmed.parse().unwrap_or_else(|_| {
            debug!(%domain, key, value = trimmed, "non-numeric setting value");
            default
        })
    }

    fn put_int(
        &mut self,
        domain: SettingDomain,
        key: &str,
        value: i32,
    ) -> Result<(), SettingError> {
        let value = value.to_string();
        let output = Command::new("settings")
            .args(["put", &domain.to_string(), key, &value])
            .output()?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("denied") || stderr.contains("SecurityException") {
            return Err(SettingError::WriteDenied {
                domain,
                key: key.to_string(),
            });
        }
        Err(SettingError::Absent {
            domain,
            key: key.to_string(),
        })
    }

    fn radio_enabled(&self, radio: Radio) -> Option<bool> {
        let key = match radio {
            Radio::Wifi => "wifi_on",
            Radio::Bluetooth => "bluetooth_on",
        };
        let out = sh("settings", &["get", "global", key])?;
        match out.trim() {
            "0" => Some(false),
            "1" => Some(true),
            _ => None,
        }
    }

    fn set_radio(&mut self, radio: Radio, on: bool) -> Result<(), SettingError> {
        let service = match radio {
            Radio::Wifi => "wifi",
            Radio::Bluetooth => "bluetooth",
        };
        let state = if on { "enable" } else { "disable" };
        let status = Command::new("svc").args([service, state]).status()?;
        if !status.success() {
            debug!(%radio, on, "svc call failed");
        }
        Ok(())
    }
}

impl SystemProbe for ShellSystem {
    fn api_level(&self) -> u32 {
        sh("getprop", &["ro.build.version.sdk"])
            .and_then(|out| out.trim().parse().ok())
            .unwrap_or(19)
    }

    fn display_metrics(&self) -> DisplayMetrics {
        // Prefer the override lines (they reflect the applied state);
        // `wm size` prints "Physical size: WxH" and optionally
        // "Override size: WxH"
        let parse_dim = |out: &str| {
            out.lines()
                .filter_map(|line| line.rsplit_once(": ").map(|(_, v)| v.trim().to_string()))
                .next_back()
        };
        let size = sh("wm", &["size"]).and_then(|out| parse_dim(&out));
        let (width_px, height_px) = size
            .as_deref()
            .and_then(|s| s.split_once('x'))
            .and_then(|(w, h)| Some((w.trim().parse().ok()?, h.trim().parse().ok()?)))
            .unwrap_or((0, 0));

        let density_dpi = sh("wm", &["density"])
            .and_then(|out| parse_dim(&out))
            .and_then(|d| d.trim().parse().ok())
            .unwrap_or(0);

        // The surface rotation tells us the current orientation
        let rotation = sh("dumpsys", &["input"])
            .and_then(|out| {
                out.lines()
                    .find_map(|line| line.trim().strip_prefix("SurfaceOrientation: "))
                    .and_then(|v| v.trim().parse::<u32>().ok())
            })
            .unwrap_or(0);

        DisplayMetrics {
            width_px,
            height_px,
            density_dpi,
            landscape: rotation % 2 == 1,
        }
    }

    fn dock_state(&self) -> DockMode {
        let state = sh("dumpsys", &["uimode"]).and_then(|out| {
            out.lines().find_map(|line| {
                line.trim()
                    .strip_prefix("mDockState=")
                    .and_then(|v| v.trim().parse::<i32>().ok())
            })
        });
        match state {
            Some(1) => DockMode::Desk,
            Some(2) => DockMode::Car,
            _ => DockMode::Undocked,
        }
    }

    fn native_density(&self) -> Option<u32> {
        sh("getprop", &["ro.sf.lcd_density"]).and_then(|out| out.trim().parse().ok())
    }

    fn has_feature(&self, feature: &str) -> bool {
        sh("pm", &["list", "features"])
            .map(|out| out.lines().any(|line| line.trim() == format!("feature:{feature}")))
            .unwrap_or(false)
    }

    fn package_version(&self, package: &str) -> Option<String> {
        let out = sh("dumpsys", &["package", package])?;
        out.lines()
            .find_map(|line| line.trim().strip_prefix("versionName="))
            .map(str::to_string)
    }

    fn pid_of(&self, process: &str) -> Option<u32> {
        let out = sh("pidof", &["-s", process])?;
        out.trim().parse().ok()
    }

    fn launcher_package(&self) -> Option<String> {
        let out = sh(
            "cmd",
            &[
                "package",
                "resolve-activity",
                "--brief",
                "-a",
                "android.intent.action.MAIN",
                "-c",
                "android.intent.category.HOME",
            ],
        )?;
        let component = out.lines().last()?.trim();
        let (package, _) = component.split_once('/')?;
        Some(package.to_string())
    }

    fn first_existing_path(&self, candidates: &[&str]) -> Option<PathBuf> {
        candidates
            .iter()
            .copied()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    fn read_value(&self, path: &Path) -> Option<i32> {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|contents| contents.trim().parse().ok())
    }

    fn external_display_connected(&self) -> bool {
        sh("dumpsys", &["display"])
            .map(|out| out.matches("DisplayDeviceInfo").count() > 1)
            .unwrap_or(false)
    }

    fn cast_screen_active(&self) -> bool {
        // The cast service only runs while screen mirroring is active
        sh("dumpsys", &["activity", "services", "CastRemoteDisplay"])
            .map(|out| out.contains("ServiceRecord"))
            .unwrap_or(false)
    }
}
