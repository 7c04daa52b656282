//! Reconciliation engine
//!
//! Given a target profile (or the turn-off target) and the current-state
//! snapshot, computes the minimal ordered privileged command plan and the
//! unprivileged direct-apply actions that move the live system to the
//! target, and the updated snapshot that makes the change reversible.
//!
//! The uniform decision rule: from the baseline, capture the live system
//! value for a category, then apply the desired value; with a profile
//! already active, apply only when the desired value differs from the
//! recorded applied value. Some applied actions (compositor restart,
//! forced resolution change) are visibly disruptive, so the idempotence
//! rule is load-bearing, not an optimization.

mod load;
mod off;

pub use load::reconcile_load;
pub use off::reconcile_off;

use crate::config::AppConfig;
use crate::plan::{CommandPlan, DirectAction};
use crate::profile::Profile;
use crate::state::CurrentStateSnapshot;
use crate::system::System;
use crate::types::{ChromeChannel, ImmersiveMode, ToggleTarget};

/// Result of one reconciliation pass
#[derive(Debug)]
pub struct PassOutcome {
    pub plan: CommandPlan,
    pub actions: Vec<DirectAction>,
    pub snapshot: CurrentStateSnapshot,
}

/// Detect the installed release channel of the desktop-mode browser,
/// most-featureful first. When no channel is installed the force-stop
/// still targets the stable identity, with an empty version string.
pub(crate) fn detect_chrome(system: &dyn System) -> (ChromeChannel, String) {
    for channel in [ChromeChannel::Dev, ChromeChannel::Beta, ChromeChannel::Stable] {
        if let Some(version) = system.package_version(channel.package()) {
            return (channel, version);
        }
    }
    (ChromeChannel::Stable, String::new())
}

/// Whether applying `requested` ("WxH" or "reset") would actually change
/// the live resolution. "reset" resolves to the native resolution; the
/// live metrics are swapped when the current orientation differs from the
/// device's natural one.
pub(crate) fn should_change_resolution(
    system: &dyn System,
    config: &AppConfig,
    snapshot: &CurrentStateSnapshot,
    requested: &str,
) -> bool {
    let native = config.native_resolution();
    let current = if config.debug_mode {
        // Debug mode has no real display to ask; trust the snapshot
        if snapshot.size == "reset" {
            native.clone()
        } else {
            snapshot.size.clone()
        }
    } else {
        let metrics = system.display_metrics();
        if metrics.landscape == config.landscape {
            format!("{}x{}", metrics.width_px, metrics.height_px)
        } else {
            format!("{}x{}", metrics.height_px, metrics.width_px)
        }
    };

    let requested = if requested == "reset" { native } else { requested.to_string() };
    requested != current
}

/// Resolution-change check for density, same rules
pub(crate) fn should_change_density(
    system: &dyn System,
    config: &AppConfig,
    snapshot: &CurrentStateSnapshot,
    requested: &str,
) -> bool {
    let native = system
        .native_density()
        .unwrap_or(config.native_density)
        .to_string();
    let current = if config.debug_mode {
        if snapshot.density == "reset" {
            native.clone()
        } else {
            snapshot.density.clone()
        }
    } else {
        system.display_metrics().density_dpi.to_string()
    };

    let requested = if requested == "reset" { native } else { requested.to_string() };
    requested != current
}

/// Resolve a quick-action toggle against the currently recorded applied
/// value. Runs once, before any category is evaluated, and leaves the
/// profile carrying only literals.
pub(crate) fn resolve_quick_toggle(profile: &mut Profile, snapshot: &CurrentStateSnapshot) {
    let Some(target) = profile.quick_action_toggle.take() else {
        return;
    };
    match target {
        ToggleTarget::ChromeDesktop => profile.chrome_desktop = !snapshot.chrome_desktop,
        ToggleTarget::VibrationOff => profile.vibration_off = !snapshot.vibration_off,
        ToggleTarget::BacklightOff => profile.backlight_off = !snapshot.backlight_off,
        ToggleTarget::Overscan => profile.overscan = !snapshot.overscan,
        ToggleTarget::Immersive => {
            profile.immersive = if snapshot.immersive == ImmersiveMode::Immersive {
                ImmersiveMode::DoNothing
            } else {
                ImmersiveMode::Immersive
            };
        }
    }
}
