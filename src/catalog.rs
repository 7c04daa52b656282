//! Privileged command catalog
//!
//! Pure formatting functions mapping a semantic setting value to the
//! literal command string that enacts it. Where the spelling changed
//! across OS releases the caller passes the API level and the catalog
//! picks the right variant. No state, no side effects.

use std::path::Path;

use crate::constants::{api, commands, processes};
use crate::types::{ChromeChannel, DockMode, ImmersiveMode};

fn on_off(prefix: &str, enabled: bool) -> String {
    format!("{prefix}{}", if enabled { "1" } else { "0" })
}

pub fn navbar(enabled: bool) -> String {
    on_off(commands::NAVBAR, enabled)
}

pub fn show_touches(enabled: bool) -> String {
    on_off(commands::SHOW_TOUCHES, enabled)
}

pub fn daydreams(enabled: bool) -> String {
    on_off(commands::DAYDREAMS, enabled)
}

pub fn daydreams_charging(enabled: bool) -> String {
    on_off(commands::DAYDREAMS_CHARGING, enabled)
}

/// Resolution override; `args` is "WxH" or "reset"
pub fn size(args: &str, api_level: u32) -> String {
    if api_level >= api::WM_TOOLING {
        format!("wm size {args}")
    } else {
        format!("am display-size {args}")
    }
}

/// Density override; `args` is a dpi value or "reset"
pub fn density(args: &str, api_level: u32) -> String {
    if api_level >= api::WM_TOOLING {
        format!("wm density {args}")
    } else {
        format!("am display-density {args}")
    }
}

/// Forced-compatibility resolution used by the safe-mode path; `None`
/// clears the override
pub fn safe_mode_size(args: Option<&str>) -> String {
    match args {
        Some(res) => format!("{}{}", commands::SAFE_MODE_SIZE, res.replace('x', ",")),
        None => format!("{}null", commands::SAFE_MODE_SIZE),
    }
}

pub fn safe_mode_density(args: Option<&str>) -> String {
    match args {
        Some(dpi) => format!("{}{dpi}", commands::SAFE_MODE_DENSITY),
        None => format!("{}null", commands::SAFE_MODE_DENSITY),
    }
}

pub fn overscan(bottom: i32, left: i32, top: i32, right: i32) -> String {
    format!("{}{bottom},{left},{top},{right}", commands::OVERSCAN)
}

pub fn overscan_reset() -> String {
    format!("{}reset", commands::OVERSCAN)
}

pub fn stay_on(mask: i32) -> String {
    format!("{}{mask}", commands::STAY_ON)
}

/// Rotation is driven by broadcasting a dock event rather than writing the
/// rotation setting; see `DockMode`
pub fn rotation(dock: DockMode) -> String {
    format!("{}{}", commands::ROTATION, dock.broadcast_extra())
}

pub fn rotation_pre_post(enabled: bool) -> String {
    on_off(commands::ROTATION_PRE_POST, enabled)
}

pub fn immersive(mode: ImmersiveMode) -> String {
    let policy = match mode {
        ImmersiveMode::StatusOnly => "immersive.navigation=*",
        ImmersiveMode::Immersive => "immersive.full=*",
        ImmersiveMode::DoNothing => "null",
    };
    format!("settings put global policy_control {policy}")
}

/// Write the browser command-line flag file advertising a desktop
/// user-agent, world-readable so the browser process can pick it up
pub fn chrome_flag_file(version: &str) -> String {
    format!(
        "echo 'chrome --user-agent=\"Mozilla/5.0 (X11; Linux x86_64) \
         AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{version} Safari/537.36\"' \
         > /data/local/chrome-command-line && chmod 644 /data/local/chrome-command-line"
    )
}

pub fn chrome_remove() -> String {
    commands::CHROME_REMOVE.to_string()
}

/// Force-stop the detected browser channel so it rereads the flag file
pub fn chrome_force_stop(channel: ChromeChannel) -> String {
    format!("am force-stop {}", channel.package())
}

/// Restart the window-manager runtime. Modern levels support a structured
/// restart; older ones get there by killing the compositor process. The
/// sleep lets prior writes settle first.
pub fn window_manager_restart(api_level: u32, compositor_pid: Option<u32>) -> String {
    if api_level >= api::STRUCTURED_RESTART {
        "sleep 1 && am restart".to_string()
    } else {
        format!("sleep 1 && kill {}", compositor_pid.unwrap_or(0))
    }
}

/// Restart the system chrome process
pub fn compositor_restart(api_level: u32, system_ui_pid: Option<u32>) -> String {
    if api_level >= api::PKILL {
        format!("sleep 2 && pkill {}", processes::SYSTEM_UI)
    } else {
        format!("sleep 2 && kill {}", system_ui_pid.unwrap_or(0))
    }
}

/// Companion refresh: force-stop the launcher so the home screen redraws
/// with the new metrics
pub fn refresh_launcher(launcher_package: &str) -> String {
    format!("sleep 1 && am force-stop {launcher_package}")
}

/// Write a raw value into a sysfs control file
pub fn sysfs_write(path: &Path, value: i32) -> String {
    format!("echo {value} > {}", path.display())
}

/// Delay a command until prior writes in the batch have settled
pub fn with_settle_delay(command: &str) -> String {
    format!("sleep 2 && {command}")
}
