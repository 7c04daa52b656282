//! Load direction: reconcile the live system toward a requested profile

use tracing::{debug, info};

use super::{
    PassOutcome, detect_chrome, resolve_quick_toggle, should_change_density,
    should_change_resolution,
};
use crate::catalog;
use crate::config::AppConfig;
use crate::constants::{api, defaults, features, processes, settings, sysfs};
use crate::plan::{CommandPlan, CommandSlot, DirectAction, PlanOrdering};
use crate::profile::Profile;
use crate::state::CurrentStateSnapshot;
use crate::system::System;
use crate::types::{DockMode, ImmersiveMode, Radio, RotationLock, ScreenTimeout, SettingDomain, UiRefreshStrategy};

/// Compute the plan, direct actions and updated snapshot for loading
/// `profile`. Quick-action toggles are resolved against the snapshot
/// before any category is evaluated, mutating `profile` to carry only
/// literals. No side effects beyond that: applying the result is the
/// caller's job.
pub fn reconcile_load(
    profile: &mut Profile,
    snapshot: &CurrentStateSnapshot,
    system: &dyn System,
    config: &AppConfig,
) -> PassOutcome {
    resolve_quick_toggle(profile, snapshot);

    let mut pass = LoadPass {
        profile,
        prev: snapshot,
        next: snapshot.clone(),
        system,
        config,
        plan: CommandPlan::new(),
        actions: Vec::new(),
        baseline: snapshot.not_active,
        api_level: system.api_level(),
        size_changed: false,
        density_changed: false,
    };

    pass.radios();
    pass.display_metrics();
    pass.overscan();
    pass.rotation();
    pass.screen_timeout();
    pass.chrome();
    pass.daydreams();
    pass.vibration();
    pass.backlight();
    pass.show_touches();
    pass.navbar();
    pass.immersive();
    pass.ui_refresh();
    pass.backlight_settle_delay();
    pass.one_shots();

    pass.next.record_applied(pass.profile);
    info!(
        profile = %pass.profile.profile_name,
        commands = pass.plan.commands().len(),
        actions = pass.actions.len(),
        "computed load plan"
    );

    PassOutcome {
        plan: pass.plan,
        actions: pass.actions,
        snapshot: pass.next,
    }
}

struct LoadPass<'a> {
    profile: &'a Profile,
    prev: &'a CurrentStateSnapshot,
    next: CurrentStateSnapshot,
    system: &'a dyn System,
    config: &'a AppConfig,
    plan: CommandPlan,
    actions: Vec<DirectAction>,
    baseline: bool,
    api_level: u32,
    size_changed: bool,
    density_changed: bool,
}

impl LoadPass<'_> {
    fn put(&mut self, domain: SettingDomain, key: &str, value: i32) {
        self.actions.push(DirectAction::put(domain, key, value));
    }

    fn radios(&mut self) {
        self.radio(
            Radio::Bluetooth,
            features::BLUETOOTH,
            self.profile.bluetooth_on,
            self.prev.bluetooth_on,
        );
        self.radio(Radio::Wifi, features::WIFI, self.profile.wifi_on, self.prev.wifi_on);
    }

    fn radio(&mut self, radio: Radio, feature: &str, wanted: bool, prev_applied: bool) {
        if !self.system.has_feature(feature) {
            return;
        }
        let Some(current) = self.system.radio_enabled(radio) else {
            return;
        };
        if self.baseline {
            match radio {
                Radio::Wifi => self.next.wifi_on_system = current,
                Radio::Bluetooth => self.next.bluetooth_on_system = current,
            }
        }
        if wanted {
            if self.baseline || !prev_applied {
                self.actions.push(DirectAction::SetRadio { radio, on: true });
            }
        } else if !self.baseline && prev_applied {
            let on = match radio {
                Radio::Wifi => self.next.wifi_on_system,
                Radio::Bluetooth => self.next.bluetooth_on_system,
            };
            self.actions.push(DirectAction::SetRadio { radio, on });
        }
    }

    fn display_metrics(&mut self) {
        self.size_changed =
            should_change_resolution(self.system, self.config, self.prev, &self.profile.size);
        self.density_changed =
            should_change_density(self.system, self.config, self.prev, &self.profile.density);

        let wm_restart = self.profile.ui_refresh == UiRefreshStrategy::RestartWindowManager;

        if self.size_changed {
            if wm_restart {
                // The forced-compatibility spelling survives the restart
                let arg = (self.profile.size != "reset").then_some(self.profile.size.as_str());
                self.plan.set(CommandSlot::Size, catalog::safe_mode_size(arg));
            } else {
                self.plan
                    .set(CommandSlot::Size, catalog::size(&self.profile.size, self.api_level));
            }
        }

        if self.density_changed {
            if wm_restart {
                let arg =
                    (self.profile.density != "reset").then_some(self.profile.density.as_str());
                self.plan.set(CommandSlot::Density, catalog::safe_mode_density(arg));
            } else {
                let command = catalog::density(&self.profile.density, self.api_level);
                self.plan.set(CommandSlot::DensityRepeat, command.clone());
                self.plan.set(CommandSlot::Density, command);
            }
        }
    }

    fn overscan(&mut self) {
        if self.api_level < api::OVERSCAN {
            return;
        }
        let p = self.profile;
        if p.overscan {
            let insets_differ = p.overscan_bottom != self.prev.overscan_bottom
                || p.overscan_left != self.prev.overscan_left
                || p.overscan_top != self.prev.overscan_top
                || p.overscan_right != self.prev.overscan_right;
            if self.baseline || !self.prev.overscan || insets_differ {
                self.plan.set(
                    CommandSlot::Overscan,
                    catalog::overscan(
                        p.overscan_bottom,
                        p.overscan_left,
                        p.overscan_top,
                        p.overscan_right,
                    ),
                );
            }
        } else if !self.baseline && self.prev.overscan {
            self.plan.set(CommandSlot::Overscan, catalog::overscan_reset());
        }
    }

    fn rotation(&mut self) {
        if self.baseline {
            self.next.user_rotation = self.system.get_int(
                SettingDomain::System,
                settings::USER_ROTATION,
                defaults::ROTATION_0,
            );
            self.next.rotation_setting =
                self.system
                    .get_int(SettingDomain::System, settings::ACCELEROMETER_ROTATION, 1);
            let dock = self.system.dock_state();
            self.next.dock_mode = dock;
            self.next.dock_mode_current = dock;
        }

        // The desired rotation is expressed as a dock-mode transition
        let desired_dock = match self.profile.rotation_lock {
            RotationLock::DoNothing => self.prev.dock_mode,
            RotationLock::AutoRotate => DockMode::Desk,
            RotationLock::Landscape => DockMode::Undocked,
        };

        if self.baseline || self.prev.rotation_lock != self.profile.rotation_lock {
            match self.profile.rotation_lock {
                RotationLock::DoNothing => {
                    // Nothing to restore from the baseline; otherwise put
                    // the captured pre-profile rotation back
                    if !self.baseline {
                        self.put(
                            SettingDomain::System,
                            settings::USER_ROTATION,
                            self.next.user_rotation,
                        );
                        self.put(
                            SettingDomain::System,
                            settings::ACCELEROMETER_ROTATION,
                            self.next.rotation_setting,
                        );
                    }
                }
                RotationLock::AutoRotate => {
                    self.put(SettingDomain::System, settings::ACCELEROMETER_ROTATION, 1);
                }
                RotationLock::Landscape => {
                    let rotation = if self.config.landscape {
                        defaults::ROTATION_0
                    } else {
                        defaults::ROTATION_90
                    };
                    self.put(SettingDomain::System, settings::USER_ROTATION, rotation);
                    self.put(SettingDomain::System, settings::ACCELEROMETER_ROTATION, 0);
                }
            }
        }

        // Only broadcast when the computed dock mode actually moves
        if desired_dock != self.prev.dock_mode_current {
            self.next.dock_mode_current = desired_dock;
            self.plan.set(CommandSlot::Rotation, catalog::rotation(desired_dock));

            // A screensaver configured to trigger on docking would fire on
            // the broadcast; suppress it around the transition
            if desired_dock == DockMode::Desk
                && self.system.get_int(SettingDomain::Secure, settings::SCREENSAVER_ENABLED, 0) == 1
                && self.system.get_int(SettingDomain::Secure, settings::SCREENSAVER_ON_DOCK, 0) == 1
            {
                self.plan.set(CommandSlot::RotationPre, catalog::rotation_pre_post(false));
                self.plan.set(CommandSlot::RotationPost, catalog::rotation_pre_post(true));
            }
        }
    }

    fn screen_timeout(&mut self) {
        if self.baseline {
            self.next.screen_timeout_system = self.system.get_int(
                SettingDomain::System,
                settings::SCREEN_OFF_TIMEOUT,
                defaults::SCREEN_TIMEOUT_MS,
            );
            self.next.stay_on_system =
                self.system
                    .get_int(SettingDomain::Global, settings::STAY_ON_WHILE_PLUGGED_IN, 0);
        }

        match self.profile.screen_timeout {
            ScreenTimeout::AlwaysOn => {
                if self.baseline || self.prev.screen_timeout != ScreenTimeout::AlwaysOn {
                    self.put(
                        SettingDomain::System,
                        settings::SCREEN_OFF_TIMEOUT,
                        defaults::ALWAYS_ON_TIMEOUT_MS,
                    );
                    if !self.baseline {
                        // The previous profile may have set the plugged-in mask
                        self.plan
                            .set(CommandSlot::StayOn, catalog::stay_on(self.next.stay_on_system));
                    }
                }
            }
            ScreenTimeout::AlwaysOnCharging => {
                if self.baseline || self.prev.screen_timeout != ScreenTimeout::AlwaysOnCharging {
                    self.plan.set(CommandSlot::StayOn, catalog::stay_on(1));
                    if !self.baseline {
                        self.put(
                            SettingDomain::System,
                            settings::SCREEN_OFF_TIMEOUT,
                            self.next.screen_timeout_system,
                        );
                    }
                }
            }
            ScreenTimeout::DoNothing => {
                if !self.baseline && self.prev.screen_timeout != ScreenTimeout::DoNothing {
                    self.put(
                        SettingDomain::System,
                        settings::SCREEN_OFF_TIMEOUT,
                        self.next.screen_timeout_system,
                    );
                    self.plan
                        .set(CommandSlot::StayOn, catalog::stay_on(self.next.stay_on_system));
                }
            }
        }
    }

    fn chrome(&mut self) {
        if self.profile.chrome_desktop {
            if self.baseline || !self.prev.chrome_desktop {
                let (channel, version) = detect_chrome(self.system);
                self.plan.set(CommandSlot::ChromeSet, catalog::chrome_flag_file(&version));
                self.plan.set(CommandSlot::ChromeRestart, catalog::chrome_force_stop(channel));
            }
        } else if !self.baseline && self.prev.chrome_desktop {
            let (channel, _) = detect_chrome(self.system);
            self.plan.set(CommandSlot::ChromeSet, catalog::chrome_remove());
            self.plan.set(CommandSlot::ChromeRestart, catalog::chrome_force_stop(channel));
        }
    }

    fn daydreams(&mut self) {
        if self.baseline {
            self.next.daydreams_on_system =
                self.system
                    .get_int(SettingDomain::Secure, settings::SCREENSAVER_ENABLED, 0)
                    == 1;
            self.next.daydreams_charging_system =
                self.system
                    .get_int(SettingDomain::Secure, settings::SCREENSAVER_ON_SLEEP, 0)
                    == 1;
        }

        let desired = if self.profile.daydreams_on {
            (self.baseline || !self.prev.daydreams_on).then_some((true, true))
        } else if !self.baseline && self.prev.daydreams_on {
            Some((self.next.daydreams_on_system, self.next.daydreams_charging_system))
        } else {
            None
        };

        if let Some((on, charging)) = desired {
            // Secure writes need an elevated grant on most builds; attempt
            // the direct write and fall back to the privileged slot
            self.actions.push(DirectAction::put_with_fallback(
                SettingDomain::Secure,
                settings::SCREENSAVER_ENABLED,
                on as i32,
                CommandSlot::Daydream,
                catalog::daydreams(on),
            ));
            self.actions.push(DirectAction::put_with_fallback(
                SettingDomain::Secure,
                settings::SCREENSAVER_ON_SLEEP,
                charging as i32,
                CommandSlot::DaydreamCharging,
                catalog::daydreams_charging(charging),
            ));
        }
    }

    fn vibration(&mut self) {
        if self.profile.vibration_off {
            // Absent control file: the category is a no-op on this device
            let Some(path) = self.system.first_existing_path(sysfs::VIBRATION) else {
                debug!("no vibration control file on this device");
                return;
            };
            if self.baseline || !self.prev.vibration_off {
                self.plan.set(CommandSlot::Vibration, catalog::sysfs_write(&path, 0));
            }
            // Keep the original amplitude for the eventual restore; 0 means
            // vibration was already off, so there is nothing new to capture
            if let Some(value) = self.system.read_value(&path) {
                if value != 0 && value != defaults::VALUE_UNSET {
                    self.next.vibration_value = value;
                }
            }
        } else if self.prev.vibration_value != defaults::VALUE_UNSET {
            if let Some(path) = self.system.first_existing_path(sysfs::VIBRATION) {
                self.plan.set(
                    CommandSlot::Vibration,
                    catalog::sysfs_write(&path, self.prev.vibration_value),
                );
            }
            self.next.vibration_value = defaults::VALUE_UNSET;
        }
    }

    fn backlight(&mut self) {
        if self.profile.backlight_off {
            if !self.prev.backlight_off {
                self.next.auto_brightness = self.system.get_int(
                    SettingDomain::System,
                    settings::SCREEN_BRIGHTNESS_MODE,
                    settings::BRIGHTNESS_MODE_MANUAL,
                );
                self.next.backlight_value = self.system.get_int(
                    SettingDomain::System,
                    settings::SCREEN_BRIGHTNESS,
                    defaults::VALUE_UNSET,
                );
            }

            // Dimming only makes sense with an external display attached,
            // and never under a window-manager restart (the boot completion
            // step picks it up instead)
            if self.profile.ui_refresh == UiRefreshStrategy::RestartWindowManager
                || !self.system.external_display_connected()
            {
                return;
            }

            let refresh_gate = self.size_changed
                || self.density_changed
                || self.baseline
                || self.prev.force_ui_refresh;

            if self.system.cast_screen_active()
                && self.profile.ui_refresh == UiRefreshStrategy::RestartCompositor
                && refresh_gate
            {
                // Screen mirroring with a compositor restart ahead: undim
                // temporarily so the restart does not freeze a black frame
                if self.prev.backlight_off && self.prev.backlight_value != defaults::VALUE_UNSET {
                    self.restore_backlight_values();
                }
            } else if self.baseline || !self.prev.backlight_off {
                self.put(
                    SettingDomain::System,
                    settings::SCREEN_BRIGHTNESS_MODE,
                    settings::BRIGHTNESS_MODE_MANUAL,
                );
                self.put(SettingDomain::System, settings::SCREEN_BRIGHTNESS, 0);
                if let Some(path) = self.system.first_existing_path(sysfs::BACKLIGHT) {
                    self.plan.set(CommandSlot::Backlight, catalog::sysfs_write(&path, 0));
                }
            }
        } else if self.prev.backlight_value != defaults::VALUE_UNSET {
            self.restore_backlight_values();
            self.next.backlight_value = defaults::VALUE_UNSET;
        }
    }

    fn restore_backlight_values(&mut self) {
        if self.prev.backlight_value <= defaults::BACKLIGHT_SYSFS_THRESHOLD {
            // A near-zero brightness setting alone may not relight the
            // panel; write the sysfs value as well
            if let Some(path) = self.system.first_existing_path(sysfs::BACKLIGHT) {
                self.plan.set(
                    CommandSlot::Backlight,
                    catalog::sysfs_write(&path, self.prev.backlight_value),
                );
            }
        }
        self.put(
            SettingDomain::System,
            settings::SCREEN_BRIGHTNESS,
            self.prev.backlight_value,
        );
        self.put(
            SettingDomain::System,
            settings::SCREEN_BRIGHTNESS_MODE,
            self.prev.auto_brightness,
        );
    }

    fn show_touches(&mut self) {
        if self.baseline {
            self.next.show_touches_system =
                self.system.get_int(SettingDomain::System, settings::SHOW_TOUCHES, 0) == 1;
        }
        if self.profile.show_touches {
            if self.baseline || !self.prev.show_touches {
                self.plan.set(CommandSlot::ShowTouches, catalog::show_touches(true));
            }
        } else if !self.baseline && self.prev.show_touches {
            self.plan.set(
                CommandSlot::ShowTouches,
                catalog::show_touches(self.next.show_touches_system),
            );
        }
    }

    fn navbar(&mut self) {
        if !self.system.has_feature(features::NAVBAR_VENDOR) {
            return;
        }
        if self.baseline {
            self.next.navbar_system =
                self.system
                    .get_int(SettingDomain::Secure, settings::FORCE_SHOW_NAVBAR, 0)
                    == 1;
        }
        if self.profile.navbar_forced {
            if self.baseline || !self.prev.navbar_forced {
                self.actions.push(DirectAction::put_with_fallback(
                    SettingDomain::Secure,
                    settings::FORCE_SHOW_NAVBAR,
                    1,
                    CommandSlot::Navbar,
                    catalog::navbar(true),
                ));
            }
        } else if !self.baseline && self.prev.navbar_forced {
            let on = self.next.navbar_system;
            self.actions.push(DirectAction::put_with_fallback(
                SettingDomain::Secure,
                settings::FORCE_SHOW_NAVBAR,
                on as i32,
                CommandSlot::Navbar,
                catalog::navbar(on),
            ));
        }
    }

    fn immersive(&mut self) {
        match self.profile.immersive {
            ImmersiveMode::StatusOnly | ImmersiveMode::Immersive => {
                if self.baseline || self.prev.immersive != self.profile.immersive {
                    self.plan
                        .set(CommandSlot::Immersive, catalog::immersive(self.profile.immersive));
                }
            }
            ImmersiveMode::DoNothing => {
                if !self.baseline && self.prev.immersive != ImmersiveMode::DoNothing {
                    self.plan
                        .set(CommandSlot::Immersive, catalog::immersive(ImmersiveMode::DoNothing));
                }
            }
        }
    }

    fn ui_refresh(&mut self) {
        let mut effective = self.profile.ui_refresh;

        // Moving to a profile without a refresh strategy while one was in
        // effect: rerun the previous strategy once to restore normal state
        if !self.baseline
            && self.prev.ui_refresh != UiRefreshStrategy::DoNothing
            && effective == UiRefreshStrategy::DoNothing
        {
            effective = self.prev.ui_refresh;
        }

        // A profile differing only in non-visual settings must not trigger
        // a disruptive refresh
        let refresh_gate = self.size_changed
            || self.density_changed
            || self.baseline
            || self.prev.force_ui_refresh;
        if !refresh_gate {
            return;
        }

        match effective {
            UiRefreshStrategy::DoNothing => self.safe_mode_slots(),
            UiRefreshStrategy::RestartCompositor => {
                self.safe_mode_slots();
                self.plan.set(
                    CommandSlot::RefreshPrimary,
                    catalog::compositor_restart(
                        self.api_level,
                        self.system.pid_of(processes::SYSTEM_UI),
                    ),
                );
                if let Some(launcher) = self.system.launcher_package() {
                    self.plan
                        .set(CommandSlot::RefreshSecondary, catalog::refresh_launcher(&launcher));
                }
            }
            UiRefreshStrategy::RestartWindowManager => {
                self.plan.set(
                    CommandSlot::RefreshPrimary,
                    catalog::window_manager_restart(
                        self.api_level,
                        self.system.pid_of(processes::COMPOSITOR),
                    ),
                );
                // The restart invalidates the process that would run the
                // remaining slots; defer them to the boot completion step
                self.plan.set_ordering(PlanOrdering::Flattened);
            }
        }
    }

    /// Mirror metric changes into the forced-compatibility slots so a
    /// degraded rendering path re-derives the new metrics
    fn safe_mode_slots(&mut self) {
        if !self.config.safe_mode {
            return;
        }
        if self.size_changed {
            self.plan.set(CommandSlot::SafeModeSize, catalog::safe_mode_size(None));
        }
        if self.density_changed {
            self.plan.set(CommandSlot::SafeModeDensity, catalog::safe_mode_density(None));
        }
    }

    fn backlight_settle_delay(&mut self) {
        if self.profile.backlight_off
            && self.profile.ui_refresh != UiRefreshStrategy::RestartWindowManager
            && self.plan.get(CommandSlot::RefreshPrimary).is_none()
        {
            if let Some(command) = self.plan.get(CommandSlot::Backlight).map(str::to_string) {
                self.plan
                    .set(CommandSlot::Backlight, catalog::with_settle_delay(&command));
            }
        }
    }

    fn one_shots(&mut self) {
        if self.prev.force_safe_mode {
            self.next.force_safe_mode = false;
            if self.profile.ui_refresh != UiRefreshStrategy::RestartWindowManager {
                self.plan.set(CommandSlot::SafeModeSize, catalog::safe_mode_size(None));
                self.plan.set(CommandSlot::SafeModeDensity, catalog::safe_mode_density(None));
            }
        }
        if self.prev.force_ui_refresh {
            self.next.force_ui_refresh = false;
        }
    }
}
