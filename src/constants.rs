//! Application-wide constants
//!
//! This module contains the command prefixes, settings keys, sysfs paths and
//! magic numbers used throughout the application, providing a single source
//! of truth for constant values.

/// Locations of persisted application data
pub mod config {
    /// Directory under the user config dir holding all persisted state
    pub const APP_DIR: &str = "profilectl";

    /// Subdirectory holding one TOML file per saved profile
    pub const PROFILE_DIR: &str = "profiles";

    /// Application-level configuration file
    pub const CONFIG_FILENAME: &str = "config.toml";

    /// Snapshot of the currently applied profile state
    pub const STATE_FILENAME: &str = "current.toml";

    /// Reserved profile name for the ephemeral quick-actions bundle
    pub const QUICK_ACTIONS: &str = "quick_actions";
}

/// Shell command prefixes handed to the privileged executor.
///
/// Boolean-valued commands append "1"/"0"; the rest append their payload
/// verbatim.
pub mod commands {
    /// Force-show the software navigation bar (vendor builds only)
    pub const NAVBAR: &str = "settings put secure dev_force_show_navbar ";

    /// Visualize touch input
    pub const SHOW_TOUCHES: &str = "settings put system show_touches ";

    /// Enable/disable the screensaver
    pub const DAYDREAMS: &str = "settings put secure screensaver_enabled ";

    /// Screensaver activation while charging
    pub const DAYDREAMS_CHARGING: &str = "settings put secure screensaver_activate_on_sleep ";

    /// Delete the browser command-line flag file
    pub const CHROME_REMOVE: &str = "rm /data/local/chrome-command-line";

    /// Broadcast a dock event; payload is the numeric dock state
    pub const ROTATION: &str =
        "am broadcast -a android.intent.action.DOCK_EVENT --ei android.intent.extra.DOCK_STATE ";

    /// Temporarily suppress screensaver-on-dock around a dock broadcast
    pub const ROTATION_PRE_POST: &str = "settings put secure screensaver_activate_on_dock ";

    /// Forced-compatibility display size, used by the safe-mode path
    pub const SAFE_MODE_SIZE: &str = "settings put global display_size_forced ";

    /// Forced-compatibility display density, used by the safe-mode path
    pub const SAFE_MODE_DENSITY: &str = "settings put global display_density_forced ";

    /// Overscan insets; payload is "bottom,left,top,right" or "reset"
    pub const OVERSCAN: &str = "wm overscan ";

    /// Keep-screen-on-while-plugged-in mask
    pub const STAY_ON: &str = "settings put global stay_on_while_plugged_in ";
}

/// Keys read and written through the unprivileged settings surface
pub mod settings {
    pub const USER_ROTATION: &str = "user_rotation";
    pub const ACCELEROMETER_ROTATION: &str = "accelerometer_rotation";
    pub const SCREEN_OFF_TIMEOUT: &str = "screen_off_timeout";
    pub const STAY_ON_WHILE_PLUGGED_IN: &str = "stay_on_while_plugged_in";
    pub const SCREEN_BRIGHTNESS: &str = "screen_brightness";
    pub const SCREEN_BRIGHTNESS_MODE: &str = "screen_brightness_mode";
    pub const SHOW_TOUCHES: &str = "show_touches";
    pub const FORCE_SHOW_NAVBAR: &str = "dev_force_show_navbar";
    pub const SCREENSAVER_ENABLED: &str = "screensaver_enabled";
    pub const SCREENSAVER_ON_SLEEP: &str = "screensaver_activate_on_sleep";
    pub const SCREENSAVER_ON_DOCK: &str = "screensaver_activate_on_dock";

    /// Manual value for `screen_brightness_mode`
    pub const BRIGHTNESS_MODE_MANUAL: i32 = 0;
}

/// Candidate sysfs control files, probed in order.
///
/// Add new files to the end of the respective list to support the hardware
/// of additional devices.
pub mod sysfs {
    /// Files that drive the panel backlight directly
    pub const BACKLIGHT: &[&str] = &[
        "/sys/class/leds/lcd-backlight/brightness",
        "/sys/class/backlight/pwm-backlight/brightness",
        "/sys/class/backlight/intel_backlight/brightness",
        "/sys/class/backlight/tegra-dsi-backlight.0/brightness",
        "/sys/devices/platform/i2c-gpio.24/i2c-24/24-002c/backlight/panel/brightness",
    ];

    /// Files that set the vibration amplitude
    pub const VIBRATION: &[&str] = &[
        "/sys/class/timed_output/vibrator/amp",
        "/sys/drv2605/rtp_strength",
    ];
}

/// OS API-level gates selecting between command spellings
pub mod api {
    /// First level shipping the `wm` tool (`wm size`/`wm density`);
    /// older levels spell these `am display-size`/`am display-density`
    pub const WM_TOOLING: u32 = 18;

    /// First level supporting a structured runtime restart (`am restart`);
    /// older levels restart the compositor by killing its process
    pub const STRUCTURED_RESTART: u32 = 19;

    /// First level shipping `pkill`; older levels need a pid lookup
    pub const PKILL: u32 = 23;

    /// First level supporting overscan insets
    pub const OVERSCAN: u32 = 18;
}

/// Well-known process and package identities
pub mod processes {
    /// The display compositor process on legacy builds
    pub const COMPOSITOR: &str = "/system/bin/surfaceflinger";

    /// The system chrome (status/navigation bar) package
    pub const SYSTEM_UI: &str = "com.android.systemui";
}

/// Vendor feature identifiers checked before touching gated categories
pub mod features {
    pub const WIFI: &str = "android.hardware.wifi";
    pub const BLUETOOTH: &str = "android.hardware.bluetooth";

    /// Vendor builds exposing the force-show-navbar setting
    pub const NAVBAR_VENDOR: &str = "com.cyanogenmod.android";
}

/// Fallback and sentinel values
pub mod defaults {
    /// Screen-off timeout assumed when the key cannot be read (ms)
    pub const SCREEN_TIMEOUT_MS: i32 = 60_000;

    /// Effectively-infinite screen-off timeout for always-on (ms)
    pub const ALWAYS_ON_TIMEOUT_MS: i32 = 2_147_482_000;

    /// Overscan inset applied when a profile enables overscan without
    /// explicit insets
    pub const OVERSCAN_INSET: i32 = 20;

    /// Sentinel for "no captured value / unsupported device"
    pub const VALUE_UNSET: i32 = -1;

    /// Backlight values at or below this are restored through sysfs as
    /// well as the brightness setting, which alone may not relight the
    /// panel
    pub const BACKLIGHT_SYSFS_THRESHOLD: i32 = 10;

    /// Display rotation values as exposed by the platform
    pub const ROTATION_0: i32 = 0;
    pub const ROTATION_90: i32 = 1;
}
