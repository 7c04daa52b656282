//! Turn-off direction: restore the pre-profile state
//!
//! Computes the inverse of every category the snapshot records as applied,
//! consuming the `*_system`/`*_value` captures, then clears the snapshot
//! to the baseline unconditionally. Turn-off is a best-effort restoration,
//! not a negotiated transaction.

use tracing::info;

use super::{PassOutcome, detect_chrome, should_change_density, should_change_resolution};
use crate::catalog;
use crate::config::AppConfig;
use crate::constants::{api, defaults, features, processes, settings, sysfs};
use crate::plan::{CommandPlan, CommandSlot, DirectAction, PlanOrdering};
use crate::state::CurrentStateSnapshot;
use crate::system::System;
use crate::types::{DockMode, ImmersiveMode, Radio, ScreenTimeout, SettingDomain, UiRefreshStrategy};

/// Compute the plan, direct actions and cleared snapshot for turning the
/// active profile off.
pub fn reconcile_off(
    snapshot: &CurrentStateSnapshot,
    system: &dyn System,
    config: &AppConfig,
) -> PassOutcome {
    let mut plan = CommandPlan::new();
    let mut actions: Vec<DirectAction> = Vec::new();
    let api_level = system.api_level();
    let prev = snapshot;

    // Radios
    if prev.bluetooth_on {
        actions.push(DirectAction::SetRadio {
            radio: Radio::Bluetooth,
            on: prev.bluetooth_on_system,
        });
    }
    if prev.wifi_on {
        actions.push(DirectAction::SetRadio {
            radio: Radio::Wifi,
            on: prev.wifi_on_system,
        });
    }

    // Resolution and density revert to native
    let wm_restart = prev.ui_refresh == UiRefreshStrategy::RestartWindowManager;
    if should_change_resolution(system, config, prev, "reset") {
        if wm_restart {
            plan.set(CommandSlot::Size, catalog::safe_mode_size(None));
        } else {
            plan.set(CommandSlot::Size, catalog::size("reset", api_level));
        }
    }
    if should_change_density(system, config, prev, "reset") {
        if wm_restart {
            plan.set(CommandSlot::Density, catalog::safe_mode_density(None));
        } else {
            let command = catalog::density("reset", api_level);
            plan.set(CommandSlot::DensityRepeat, command.clone());
            plan.set(CommandSlot::Density, command);
        }
    }

    // Overscan
    if api_level >= api::OVERSCAN && prev.overscan {
        plan.set(CommandSlot::Overscan, catalog::overscan_reset());
    }

    // Rotation settings go back to their captures; the dock mode goes back
    // to the pre-profile one when a pass moved it
    actions.push(DirectAction::put(
        SettingDomain::System,
        settings::USER_ROTATION,
        prev.user_rotation,
    ));
    actions.push(DirectAction::put(
        SettingDomain::System,
        settings::ACCELEROMETER_ROTATION,
        prev.rotation_setting,
    ));
    if prev.dock_mode != prev.dock_mode_current {
        plan.set(CommandSlot::Rotation, catalog::rotation(prev.dock_mode));
        if prev.dock_mode == DockMode::Desk
            && system.get_int(SettingDomain::Secure, settings::SCREENSAVER_ENABLED, 0) == 1
            && system.get_int(SettingDomain::Secure, settings::SCREENSAVER_ON_DOCK, 0) == 1
        {
            plan.set(CommandSlot::RotationPre, catalog::rotation_pre_post(false));
            plan.set(CommandSlot::RotationPost, catalog::rotation_pre_post(true));
        }
    }

    // Screen timeout
    match prev.screen_timeout {
        ScreenTimeout::AlwaysOn => {
            actions.push(DirectAction::put(
                SettingDomain::System,
                settings::SCREEN_OFF_TIMEOUT,
                prev.screen_timeout_system,
            ));
        }
        ScreenTimeout::AlwaysOnCharging => {
            plan.set(CommandSlot::StayOn, catalog::stay_on(prev.stay_on_system));
        }
        ScreenTimeout::DoNothing => {}
    }

    // Chrome desktop mode
    if prev.chrome_desktop {
        let (channel, _) = detect_chrome(system);
        plan.set(CommandSlot::ChromeSet, catalog::chrome_remove());
        plan.set(CommandSlot::ChromeRestart, catalog::chrome_force_stop(channel));
    }

    // Daydreams
    if prev.daydreams_on {
        actions.push(DirectAction::put_with_fallback(
            SettingDomain::Secure,
            settings::SCREENSAVER_ENABLED,
            prev.daydreams_on_system as i32,
            CommandSlot::Daydream,
            catalog::daydreams(prev.daydreams_on_system),
        ));
        actions.push(DirectAction::put_with_fallback(
            SettingDomain::Secure,
            settings::SCREENSAVER_ON_SLEEP,
            prev.daydreams_charging_system as i32,
            CommandSlot::DaydreamCharging,
            catalog::daydreams_charging(prev.daydreams_charging_system),
        ));
    }

    // Vibration
    if prev.vibration_off && prev.vibration_value != defaults::VALUE_UNSET {
        if let Some(path) = system.first_existing_path(sysfs::VIBRATION) {
            plan.set(
                CommandSlot::Vibration,
                catalog::sysfs_write(&path, prev.vibration_value),
            );
        }
    }

    // Backlight
    if prev.backlight_off && prev.backlight_value != defaults::VALUE_UNSET {
        if prev.backlight_value <= defaults::BACKLIGHT_SYSFS_THRESHOLD {
            if let Some(path) = system.first_existing_path(sysfs::BACKLIGHT) {
                plan.set(
                    CommandSlot::Backlight,
                    catalog::sysfs_write(&path, prev.backlight_value),
                );
            }
        }
        actions.push(DirectAction::put(
            SettingDomain::System,
            settings::SCREEN_BRIGHTNESS,
            prev.backlight_value,
        ));
        actions.push(DirectAction::put(
            SettingDomain::System,
            settings::SCREEN_BRIGHTNESS_MODE,
            prev.auto_brightness,
        ));
    }

    // Show touches
    if prev.show_touches {
        plan.set(
            CommandSlot::ShowTouches,
            catalog::show_touches(prev.show_touches_system),
        );
    }

    // Navigation bar
    if system.has_feature(features::NAVBAR_VENDOR) && prev.navbar_forced {
        actions.push(DirectAction::put_with_fallback(
            SettingDomain::Secure,
            settings::FORCE_SHOW_NAVBAR,
            prev.navbar_system as i32,
            CommandSlot::Navbar,
            catalog::navbar(prev.navbar_system),
        ));
    }

    // Immersive mode
    if prev.immersive != ImmersiveMode::DoNothing {
        plan.set(CommandSlot::Immersive, catalog::immersive(ImmersiveMode::DoNothing));
    }

    // UI refresh
    match prev.ui_refresh {
        UiRefreshStrategy::RestartCompositor => {
            plan.set(
                CommandSlot::RefreshPrimary,
                catalog::compositor_restart(api_level, system.pid_of(processes::SYSTEM_UI)),
            );
            if let Some(launcher) = system.launcher_package() {
                plan.set(CommandSlot::RefreshSecondary, catalog::refresh_launcher(&launcher));
            }
        }
        UiRefreshStrategy::RestartWindowManager => {
            plan.set(
                CommandSlot::RefreshPrimary,
                catalog::window_manager_restart(api_level, system.pid_of(processes::COMPOSITOR)),
            );
            plan.set_ordering(PlanOrdering::Flattened);
        }
        UiRefreshStrategy::DoNothing => {}
    }

    info!(
        profile = %prev.profile_name,
        commands = plan.commands().len(),
        actions = actions.len(),
        "computed turn-off plan"
    );

    // Cleared unconditionally, whether or not the batch later succeeds
    PassOutcome {
        plan,
        actions,
        snapshot: CurrentStateSnapshot::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::reconcile_load;
    use crate::profile::Profile;
    use crate::system::testing::MockSystem;
    use crate::types::RotationLock;
    use std::path::PathBuf;

    fn config() -> AppConfig {
        AppConfig {
            native_width: 1080,
            native_height: 1920,
            native_density: 480,
            debug_mode: true,
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_round_trip_restores_captures_and_baseline() {
        let mut system = MockSystem::default();
        system.wifi = Some(false);
        system.bluetooth = Some(true);
        system.set_setting(SettingDomain::System, settings::SCREEN_OFF_TIMEOUT, 45_000);
        system.set_setting(SettingDomain::System, settings::USER_ROTATION, 0);
        system.set_setting(SettingDomain::System, settings::ACCELEROMETER_ROTATION, 1);
        let config = config();

        let mut profile = Profile {
            profile_name: "Desk".into(),
            size: "1280x720".into(),
            wifi_on: true,
            bluetooth_on: true,
            screen_timeout: ScreenTimeout::AlwaysOn,
            rotation_lock: RotationLock::AutoRotate,
            show_touches: true,
            ..Profile::default()
        };
        let loaded = reconcile_load(
            &mut profile,
            &CurrentStateSnapshot::default(),
            &system,
            &config,
        );

        let off = reconcile_off(&loaded.snapshot, &system, &config);

        // Radios and rotation go back to the captured system values
        assert!(off.actions.contains(&DirectAction::SetRadio {
            radio: Radio::Wifi,
            on: false
        }));
        assert!(off.actions.contains(&DirectAction::SetRadio {
            radio: Radio::Bluetooth,
            on: true
        }));
        assert!(off.actions.contains(&DirectAction::put(
            SettingDomain::System,
            settings::SCREEN_OFF_TIMEOUT,
            45_000
        )));
        assert!(off.actions.contains(&DirectAction::put(
            SettingDomain::System,
            settings::USER_ROTATION,
            0
        )));
        assert!(off.actions.contains(&DirectAction::put(
            SettingDomain::System,
            settings::ACCELEROMETER_ROTATION,
            1
        )));
        // Size reverts, dock mode goes back to undocked
        assert_eq!(off.plan.get(CommandSlot::Size), Some("wm size reset"));
        assert_eq!(
            off.plan.get(CommandSlot::Rotation),
            Some(
                "am broadcast -a android.intent.action.DOCK_EVENT \
                 --ei android.intent.extra.DOCK_STATE 0"
            )
        );
        assert_eq!(
            off.plan.get(CommandSlot::ShowTouches),
            Some("settings put system show_touches 0")
        );
        // Snapshot is back to the full baseline, sentinels included
        assert_eq!(off.snapshot, CurrentStateSnapshot::default());
    }

    #[test]
    fn test_off_is_minimal_for_do_nothing_profile() {
        let system = MockSystem::default();
        let config = config();

        let mut profile = Profile {
            profile_name: "Plain".into(),
            ..Profile::default()
        };
        let loaded = reconcile_load(
            &mut profile,
            &CurrentStateSnapshot::default(),
            &system,
            &config,
        );
        let off = reconcile_off(&loaded.snapshot, &system, &config);

        // Only the unconditional rotation-setting restore remains
        assert!(off.plan.is_empty());
        assert_eq!(off.actions.len(), 2);
    }

    #[test]
    fn test_off_restores_vibration_and_backlight_values() {
        let mut system = MockSystem::default();
        let vibrator = PathBuf::from("/sys/class/timed_output/vibrator/amp");
        let backlight = PathBuf::from("/sys/class/leds/lcd-backlight/brightness");
        system.sysfs.insert(vibrator.clone(), 90);
        system.sysfs.insert(backlight.clone(), 3);
        let config = config();

        let mut snapshot = CurrentStateSnapshot::default();
        snapshot.not_active = false;
        snapshot.vibration_off = true;
        snapshot.vibration_value = 90;
        snapshot.backlight_off = true;
        snapshot.backlight_value = 3;
        snapshot.auto_brightness = 1;

        let off = reconcile_off(&snapshot, &system, &config);

        assert_eq!(
            off.plan.get(CommandSlot::Vibration),
            Some("echo 90 > /sys/class/timed_output/vibrator/amp")
        );
        // Captured value is below the threshold: restored through sysfs too
        assert_eq!(
            off.plan.get(CommandSlot::Backlight),
            Some("echo 3 > /sys/class/leds/lcd-backlight/brightness")
        );
        assert!(off.actions.contains(&DirectAction::put(
            SettingDomain::System,
            settings::SCREEN_BRIGHTNESS,
            3
        )));
        assert!(off.actions.contains(&DirectAction::put(
            SettingDomain::System,
            settings::SCREEN_BRIGHTNESS_MODE,
            1
        )));
    }

    #[test]
    fn test_off_from_window_manager_restart_profile_flattens() {
        let system = MockSystem::default();
        let config = config();

        let mut snapshot = CurrentStateSnapshot::default();
        snapshot.not_active = false;
        snapshot.size = "1920x1080".into();
        snapshot.ui_refresh = UiRefreshStrategy::RestartWindowManager;

        let off = reconcile_off(&snapshot, &system, &config);

        assert_eq!(off.plan.ordering(), PlanOrdering::Flattened);
        assert_eq!(
            off.plan.get(CommandSlot::Size),
            Some("settings put global display_size_forced null")
        );
        assert_eq!(off.plan.get(CommandSlot::RefreshPrimary), Some("sleep 1 && am restart"));
    }

    #[test]
    fn test_off_skips_dock_broadcast_when_never_moved() {
        let system = MockSystem::default();
        let config = config();

        let mut snapshot = CurrentStateSnapshot::default();
        snapshot.not_active = false;
        snapshot.dock_mode = DockMode::Desk;
        snapshot.dock_mode_current = DockMode::Desk;

        let off = reconcile_off(&snapshot, &system, &config);
        assert!(off.plan.get(CommandSlot::Rotation).is_none());
    }

    #[test]
    fn test_off_restores_chrome_and_immersive() {
        let mut system = MockSystem::default();
        system.packages.insert("com.chrome.beta".into(), "112.0".into());
        let config = config();

        let mut snapshot = CurrentStateSnapshot::default();
        snapshot.not_active = false;
        snapshot.chrome_desktop = true;
        snapshot.immersive = ImmersiveMode::Immersive;

        let off = reconcile_off(&snapshot, &system, &config);

        assert_eq!(off.plan.get(CommandSlot::ChromeSet), Some("rm /data/local/chrome-command-line"));
        assert_eq!(off.plan.get(CommandSlot::ChromeRestart), Some("am force-stop com.chrome.beta"));
        assert_eq!(
            off.plan.get(CommandSlot::Immersive),
            Some("settings put global policy_control null")
        );
    }
}
