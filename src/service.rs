//! Pass orchestration
//!
//! Owns the stores and platform surfaces and runs reconciliation passes to
//! completion: capability check, engine computation, direct-apply actions,
//! privileged batch, state persistence, downstream notify. A single worker
//! thread serializes passes; a second request queues behind the first,
//! because both read-modify-write the one state snapshot.

use std::sync::mpsc;
use std::thread;
use tracing::{debug, info, warn};

use crate::blacklist;
use crate::config::AppConfig;
use crate::constants;
use crate::engine::{PassOutcome, reconcile_load, reconcile_off};
use crate::error::{PassError, SettingError};
use crate::executor::{LoggingExecutor, PrivilegedExecutor, SuExecutor};
use crate::notify::{Notifier, ProfileEvent, SocketNotifier};
use crate::plan::{CommandPlan, CommandSlot, DirectAction};
use crate::profile::{Profile, ProfileStore};
use crate::state::{CurrentStateSnapshot, CurrentStateStore};
use crate::system::{ShellSystem, System, SystemProbe};
use crate::types::{ImmersiveMode, RequestedValue, RotationLock, ToggleTarget};

/// What a completed pass did, for display and logging
#[derive(Debug)]
pub struct PassReport {
    /// Profile now active, `None` after a turn-off
    pub active: Option<String>,
    /// Privileged commands handed to the executor, in order
    pub commands: Vec<String>,
    /// Slots deferred to the boot completion step (window-manager restart)
    pub deferred: Vec<(CommandSlot, String)>,
    /// Direct-apply actions that went through
    pub actions_applied: usize,
}

/// A load or turn-off request for the worker queue
#[derive(Debug)]
pub enum Request {
    Load(String),
    TurnOff,
    QuickAction { key: String, value: RequestedValue },
}

pub struct ProfileService {
    config: AppConfig,
    profiles: ProfileStore,
    state: CurrentStateStore,
    system: Box<dyn System + Send>,
    executor: Box<dyn PrivilegedExecutor + Send>,
    notifier: Box<dyn Notifier + Send>,
}

impl ProfileService {
    pub fn new(
        config: AppConfig,
        profiles: ProfileStore,
        state: CurrentStateStore,
        system: Box<dyn System + Send>,
        executor: Box<dyn PrivilegedExecutor + Send>,
        notifier: Box<dyn Notifier + Send>,
    ) -> Self {
        Self {
            config,
            profiles,
            state,
            system,
            executor,
            notifier,
        }
    }

    /// Service against the real device and the default store locations
    pub fn open_default() -> anyhow::Result<Self> {
        let mut config = AppConfig::load()?;
        let system = ShellSystem::new();

        // First run: remember the panel's untouched metrics, they are the
        // restore target every "reset" resolves against
        if config.native_width == 0 || config.native_height == 0 {
            let metrics = system.display_metrics();
            if metrics.width_px > 0 && metrics.height_px > 0 {
                config.native_width = metrics.width_px.min(metrics.height_px);
                config.native_height = metrics.width_px.max(metrics.height_px);
                config.native_density =
                    system.native_density().unwrap_or(metrics.density_dpi);
                config.save()?;
                info!(
                    width = config.native_width,
                    height = config.native_height,
                    density = config.native_density,
                    "captured native display metrics"
                );
            }
        }

        let executor: Box<dyn PrivilegedExecutor + Send> = if config.debug_mode {
            Box::new(LoggingExecutor::new())
        } else {
            Box::new(SuExecutor::new())
        };
        Ok(Self::new(
            config,
            ProfileStore::open_default()?,
            CurrentStateStore::open_default()?,
            Box::new(system),
            executor,
            Box::new(SocketNotifier::new()?),
        ))
    }

    pub fn dispatch(&mut self, request: Request) -> Result<PassReport, PassError> {
        match request {
            Request::Load(name) => self.load(&name),
            Request::TurnOff => self.turn_off(),
            Request::QuickAction { key, value } => self.quick_action(&key, &value),
        }
    }

    /// Run a load pass for the named profile
    pub fn load(&mut self, name: &str) -> Result<PassReport, PassError> {
        let snapshot = self.state.load()?;

        // The only abort point: before any mutation. The requested
        // identity is never persisted; whatever was active stays recorded.
        if !self.executor.available() {
            warn!(profile = %name, "privileged execution unavailable, profile not loaded");
            self.notifier.notify(&ProfileEvent::ListChanged);
            return Err(PassError::CapabilityUnavailable);
        }

        if !self.profiles.exists(name) {
            return Err(PassError::UnknownProfile(name.to_string()));
        }
        let mut profile = self.profiles.get(name)?;
        self.check_blacklist(&profile)?;
        info!(profile = %name, "loading profile");

        let mut outcome =
            reconcile_load(&mut profile, &snapshot, self.system.as_ref(), &self.config);

        if Profile::is_quick_actions(name) {
            // Toggles were resolved to literals; persist them so the next
            // quick action builds on what is now applied
            self.profiles.save(name, &profile)?;
        } else {
            self.profiles.clear_quick_actions()?;
        }

        let actions_applied =
            apply_actions(self.system.as_mut(), &mut outcome.plan, &outcome.actions);

        outcome.snapshot.filename = Some(name.to_string());
        self.state.save(&outcome.snapshot)?;

        let report = self.run_plan(outcome, Some(name.to_string()), actions_applied)?;
        Ok(report)
    }

    /// Run a turn-off pass for the active profile
    pub fn turn_off(&mut self) -> Result<PassReport, PassError> {
        let mut snapshot = self.state.load()?;
        if snapshot.not_active {
            return Err(PassError::NotActive);
        }

        snapshot.filename_backup = snapshot.filename.take();

        if !self.executor.available() {
            // Defer: the profile should still be considered active
            snapshot.filename = snapshot.filename_backup.take();
            self.state.save(&snapshot)?;
            warn!("privileged execution unavailable, turn-off deferred");
            self.notifier.notify(&ProfileEvent::ListChanged);
            return Err(PassError::CapabilityUnavailable);
        }

        info!(profile = %snapshot.profile_name, "turning off profile");
        let mut outcome = reconcile_off(&snapshot, self.system.as_ref(), &self.config);

        let actions_applied =
            apply_actions(self.system.as_mut(), &mut outcome.plan, &outcome.actions);

        // Cleared unconditionally; restoration is best-effort from here on
        self.state.save(&outcome.snapshot)?;
        self.profiles.clear_quick_actions()?;

        let report = self.run_plan(outcome, None, actions_applied)?;
        Ok(report)
    }

    /// Apply a single quick-action change on top of the applied state and
    /// load the resulting ephemeral bundle
    pub fn quick_action(
        &mut self,
        key: &str,
        value: &RequestedValue,
    ) -> Result<PassReport, PassError> {
        let snapshot = self.state.load()?;
        let mut profile = quick_profile_from(&snapshot);
        set_quick_value(&mut profile, key, value)?;
        self.profiles
            .save(constants::config::QUICK_ACTIONS, &profile)?;
        self.load(constants::config::QUICK_ACTIONS)
    }

    /// Arm the one-shot refresh flag; the next pass consumes it and runs
    /// its refresh strategy even without a metric change
    pub fn force_ui_refresh(&mut self) -> Result<(), PassError> {
        let mut snapshot = self.state.load()?;
        snapshot.force_ui_refresh = true;
        self.state.save(&snapshot)?;
        Ok(())
    }

    /// Arm the one-shot safe-mode flag; the next pass clears the
    /// forced-compatibility overrides
    pub fn force_safe_mode(&mut self) -> Result<(), PassError> {
        let mut snapshot = self.state.load()?;
        snapshot.force_safe_mode = true;
        self.state.save(&snapshot)?;
        Ok(())
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    pub fn current_state(&self) -> Result<CurrentStateSnapshot, PassError> {
        Ok(self.state.load()?)
    }

    /// Refuse combinations known to break the display pipeline on this
    /// panel, evaluated against the native metrics
    fn check_blacklist(&self, profile: &Profile) -> Result<(), PassError> {
        // Without known native metrics the table cannot be evaluated
        if self.config.native_width == 0 || self.config.native_height == 0 {
            debug!("native metrics unknown, skipping blacklist check");
            return Ok(());
        }
        let native_dpi = self
            .system
            .native_density()
            .unwrap_or(self.config.native_density);
        if blacklist::is_unsafe(
            &profile.size,
            &profile.density,
            self.config.native_height,
            self.config.native_width,
            native_dpi,
            self.config.landscape,
        ) {
            return Err(PassError::UnsafeCombination {
                size: profile.size.clone(),
                density: profile.density.clone(),
            });
        }
        Ok(())
    }

    fn run_plan(
        &mut self,
        outcome: PassOutcome,
        active: Option<String>,
        actions_applied: usize,
    ) -> Result<PassReport, PassError> {
        let commands = outcome.plan.commands();
        if !outcome.plan.is_empty() {
            self.executor.run_batch(&commands)?;
        }
        let deferred = outcome.plan.deferred();
        if !deferred.is_empty() {
            info!(count = deferred.len(), "slots deferred to the boot completion step");
        }

        self.notifier.notify(&ProfileEvent::ListChanged);
        self.notifier.notify(&ProfileEvent::StateChanged {
            active: active.clone(),
        });

        Ok(PassReport {
            active,
            commands,
            deferred,
            actions_applied,
        })
    }
}

/// Apply the direct actions in order. A denied write degrades its category
/// to the privileged slot it carries; any other failure means the category
/// is absent on this platform and quietly becomes a no-op. No category's
/// failure blocks the rest.
fn apply_actions(
    system: &mut dyn System,
    plan: &mut CommandPlan,
    actions: &[DirectAction],
) -> usize {
    let mut applied = 0;
    for action in actions {
        match action {
            DirectAction::PutSetting {
                domain,
                key,
                value,
                fallback,
            } => match system.put_int(*domain, key, *value) {
                Ok(()) => applied += 1,
                Err(SettingError::WriteDenied { .. }) => match fallback {
                    Some((slot, command)) => {
                        warn!(%domain, key, "write denied, degrading to privileged path");
                        plan.set(*slot, command.clone());
                    }
                    None => debug!(%domain, key, "denied write has no privileged fallback"),
                },
                Err(e) => debug!(%domain, key, error = %e, "settings write skipped"),
            },
            DirectAction::SetRadio { radio, on } => match system.set_radio(*radio, *on) {
                Ok(()) => applied += 1,
                Err(e) => debug!(%radio, error = %e, "radio toggle skipped"),
            },
        }
    }
    applied
}

/// The applied state as a profile, the starting point for quick actions
fn quick_profile_from(snapshot: &CurrentStateSnapshot) -> Profile {
    Profile {
        profile_name: "Quick Actions".to_string(),
        size: snapshot.size.clone(),
        density: snapshot.density.clone(),
        overscan: snapshot.overscan,
        overscan_left: snapshot.overscan_left,
        overscan_right: snapshot.overscan_right,
        overscan_top: snapshot.overscan_top,
        overscan_bottom: snapshot.overscan_bottom,
        rotation_lock: snapshot.rotation_lock,
        screen_timeout: snapshot.screen_timeout,
        chrome_desktop: snapshot.chrome_desktop,
        daydreams_on: snapshot.daydreams_on,
        vibration_off: snapshot.vibration_off,
        backlight_off: snapshot.backlight_off,
        show_touches: snapshot.show_touches,
        navbar_forced: snapshot.navbar_forced,
        immersive: snapshot.immersive,
        ui_refresh: snapshot.ui_refresh,
        wifi_on: snapshot.wifi_on,
        bluetooth_on: snapshot.bluetooth_on,
        quick_action_toggle: None,
    }
}

/// Write one quick-action value into the ephemeral bundle. Toggles are
/// recorded as toggle targets for the engine to resolve at load time.
fn set_quick_value(
    profile: &mut Profile,
    key: &str,
    value: &RequestedValue,
) -> Result<(), PassError> {
    let invalid = || PassError::InvalidQuickAction(format!("{key}={value:?}"));

    match (key, value) {
        ("size", RequestedValue::Literal(v)) => profile.size = v.clone(),
        ("density", RequestedValue::Literal(v)) => profile.density = v.clone(),
        ("overscan", RequestedValue::ToggleCurrent) => {
            profile.quick_action_toggle = Some(ToggleTarget::Overscan);
        }
        ("overscan", RequestedValue::Literal(v)) => {
            profile.overscan = parse_bool(v).ok_or_else(invalid)?;
        }
        ("chrome_desktop", RequestedValue::ToggleCurrent) => {
            profile.quick_action_toggle = Some(ToggleTarget::ChromeDesktop);
        }
        ("chrome_desktop", RequestedValue::Literal(v)) => {
            profile.chrome_desktop = parse_bool(v).ok_or_else(invalid)?;
        }
        ("vibration_off", RequestedValue::ToggleCurrent) => {
            profile.quick_action_toggle = Some(ToggleTarget::VibrationOff);
        }
        ("vibration_off", RequestedValue::Literal(v)) => {
            profile.vibration_off = parse_bool(v).ok_or_else(invalid)?;
        }
        ("backlight_off", RequestedValue::ToggleCurrent) => {
            profile.quick_action_toggle = Some(ToggleTarget::BacklightOff);
        }
        ("backlight_off", RequestedValue::Literal(v)) => {
            profile.backlight_off = parse_bool(v).ok_or_else(invalid)?;
        }
        ("immersive", RequestedValue::ToggleCurrent) => {
            profile.quick_action_toggle = Some(ToggleTarget::Immersive);
        }
        ("immersive", RequestedValue::Literal(v)) => {
            profile.immersive = match v.as_str() {
                "do-nothing" => ImmersiveMode::DoNothing,
                "status-only" => ImmersiveMode::StatusOnly,
                "immersive-mode" => ImmersiveMode::Immersive,
                _ => return Err(invalid()),
            };
        }
        ("rotation_lock", RequestedValue::Literal(v)) => {
            profile.rotation_lock = match v.as_str() {
                "do-nothing" => RotationLock::DoNothing,
                "auto-rotate" => RotationLock::AutoRotate,
                "landscape" => RotationLock::Landscape,
                _ => return Err(invalid()),
            };
        }
        _ => return Err(invalid()),
    }
    Ok(())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "on" | "true" | "1" => Some(true),
        "off" | "false" | "0" => Some(false),
        _ => None,
    }
}

struct Job {
    request: Request,
    reply: mpsc::Sender<Result<PassReport, PassError>>,
}

/// Queue handle for submitting passes to the worker
pub struct ServiceHandle {
    tx: mpsc::Sender<Job>,
}

impl ServiceHandle {
    /// Enqueue a request and wait for its pass to complete. Requests run
    /// strictly in submission order.
    pub fn submit(&self, request: Request) -> Result<PassReport, PassError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(Job {
                request,
                reply: reply_tx,
            })
            .map_err(|_| PassError::Store(anyhow::anyhow!("profile worker is gone")))?;
        reply_rx
            .recv()
            .map_err(|_| PassError::Store(anyhow::anyhow!("profile worker dropped the request")))?
    }
}

/// Spawn the serial pass worker. At most one reconciliation pass is in
/// flight at any time; the worker exits when every handle is dropped.
pub fn spawn(mut service: ProfileService) -> (ServiceHandle, thread::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel::<Job>();
    let handle = thread::spawn(move || {
        while let Ok(job) = rx.recv() {
            let result = service.dispatch(job.request);
            let _ = job.reply.send(result);
        }
        debug!("profile worker exiting");
    });
    (ServiceHandle { tx }, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::settings;
    use crate::system::testing::MockSystem;
    use crate::types::UiRefreshStrategy;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// Executor double whose availability can be flipped from outside the
    /// service and whose batches stay inspectable
    #[derive(Clone)]
    struct SharedExecutor {
        available: Arc<AtomicBool>,
        batches: Arc<Mutex<Vec<Vec<String>>>>,
    }

    impl SharedExecutor {
        fn new() -> Self {
            Self {
                available: Arc::new(AtomicBool::new(true)),
                batches: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn all_commands(&self) -> Vec<String> {
            self.batches.lock().unwrap().iter().flatten().cloned().collect()
        }
    }

    impl PrivilegedExecutor for SharedExecutor {
        fn available(&self) -> bool {
            self.available.load(Ordering::SeqCst)
        }

        fn run_batch(&mut self, commands: &[String]) -> anyhow::Result<()> {
            self.batches.lock().unwrap().push(commands.to_vec());
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct SharedNotifier {
        events: Arc<Mutex<Vec<ProfileEvent>>>,
    }

    impl Notifier for SharedNotifier {
        fn notify(&mut self, event: &ProfileEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    struct Fixture {
        _tmp: tempfile::TempDir,
        executor: SharedExecutor,
        notifier: SharedNotifier,
        state_store: CurrentStateStore,
        service: ProfileService,
    }

    fn fixture_with(system: MockSystem) -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let profiles = ProfileStore::open(tmp.path().join("profiles")).unwrap();
        let state_path = tmp.path().join("current.toml");
        let executor = SharedExecutor::new();
        let notifier = SharedNotifier::default();
        let config = AppConfig {
            native_width: 1080,
            native_height: 1920,
            native_density: 480,
            debug_mode: true,
            ..AppConfig::default()
        };
        let service = ProfileService::new(
            config,
            profiles,
            CurrentStateStore::open(state_path.clone()),
            Box::new(system),
            Box::new(executor.clone()),
            Box::new(notifier.clone()),
        );
        Fixture {
            _tmp: tmp,
            executor,
            notifier,
            state_store: CurrentStateStore::open(state_path),
            service,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(MockSystem::default())
    }

    fn save_profile(fixture: &Fixture, name: &str, profile: &Profile) {
        fixture.service.profiles().save(name, profile).unwrap();
    }

    #[test]
    fn test_load_runs_plan_and_persists_identity() {
        let mut fixture = fixture();
        save_profile(
            &fixture,
            "desk",
            &Profile {
                profile_name: "Desk".into(),
                chrome_desktop: true,
                size: "1280x720".into(),
                ..Profile::default()
            },
        );

        let report = fixture.service.load("desk").unwrap();
        assert_eq!(report.active.as_deref(), Some("desk"));
        assert!(report.commands.iter().any(|c| c.contains("chrome-command-line")));
        assert!(report.commands.contains(&"wm size 1280x720".to_string()));

        let snapshot = fixture.state_store.load().unwrap();
        assert_eq!(snapshot.filename.as_deref(), Some("desk"));
        assert!(!snapshot.not_active);

        let events = fixture.notifier.events.lock().unwrap();
        assert!(events.contains(&ProfileEvent::StateChanged {
            active: Some("desk".into())
        }));
    }

    #[test]
    fn test_load_without_capability_aborts_before_mutation() {
        let mut fixture = fixture();
        save_profile(
            &fixture,
            "desk",
            &Profile {
                profile_name: "Desk".into(),
                size: "1280x720".into(),
                ..Profile::default()
            },
        );
        fixture.executor.available.store(false, Ordering::SeqCst);

        let err = fixture.service.load("desk").unwrap_err();
        assert!(matches!(err, PassError::CapabilityUnavailable));
        assert!(fixture.executor.all_commands().is_empty());

        let snapshot = fixture.state_store.load().unwrap();
        assert!(snapshot.not_active);
        assert!(snapshot.filename.is_none());
    }

    #[test]
    fn test_blacklisted_combination_is_refused() {
        let mut fixture = fixture();
        // High native density with a small forced resolution, portrait
        save_profile(
            &fixture,
            "tiny",
            &Profile {
                profile_name: "Tiny".into(),
                size: "720x1280".into(),
                density: "reset".into(),
                ..Profile::default()
            },
        );

        let err = fixture.service.load("tiny").unwrap_err();
        assert!(matches!(err, PassError::UnsafeCombination { .. }));
        assert!(fixture.executor.all_commands().is_empty());
        assert!(fixture.state_store.load().unwrap().not_active);
    }

    #[test]
    fn test_unknown_profile() {
        let mut fixture = fixture();
        let err = fixture.service.load("missing").unwrap_err();
        assert!(matches!(err, PassError::UnknownProfile(name) if name == "missing"));
    }

    #[test]
    fn test_denied_secure_write_degrades_to_privileged_batch() {
        let mut system = MockSystem::default();
        system.denied_keys.insert(settings::SCREENSAVER_ENABLED.to_string());
        system.denied_keys.insert(settings::SCREENSAVER_ON_SLEEP.to_string());
        let mut fixture = fixture_with(system);
        save_profile(
            &fixture,
            "dream",
            &Profile {
                profile_name: "Dream".into(),
                daydreams_on: true,
                ..Profile::default()
            },
        );

        let report = fixture.service.load("dream").unwrap();
        assert!(
            report
                .commands
                .contains(&"settings put secure screensaver_enabled 1".to_string())
        );
        assert!(
            report
                .commands
                .contains(&"settings put secure screensaver_activate_on_sleep 1".to_string())
        );
    }

    #[test]
    fn test_turn_off_restores_and_clears() {
        let mut fixture = fixture();
        save_profile(
            &fixture,
            "desk",
            &Profile {
                profile_name: "Desk".into(),
                size: "1280x720".into(),
                show_touches: true,
                ..Profile::default()
            },
        );
        fixture.service.load("desk").unwrap();

        let report = fixture.service.turn_off().unwrap();
        assert_eq!(report.active, None);
        assert!(report.commands.contains(&"wm size reset".to_string()));

        let snapshot = fixture.state_store.load().unwrap();
        assert_eq!(snapshot, CurrentStateSnapshot::default());
    }

    #[test]
    fn test_turn_off_when_nothing_active() {
        let mut fixture = fixture();
        let err = fixture.service.turn_off().unwrap_err();
        assert!(matches!(err, PassError::NotActive));
    }

    #[test]
    fn test_turn_off_without_capability_keeps_profile_active() {
        let mut fixture = fixture();
        save_profile(
            &fixture,
            "desk",
            &Profile {
                profile_name: "Desk".into(),
                ..Profile::default()
            },
        );
        fixture.service.load("desk").unwrap();
        fixture.executor.available.store(false, Ordering::SeqCst);

        let err = fixture.service.turn_off().unwrap_err();
        assert!(matches!(err, PassError::CapabilityUnavailable));

        // Deferred: the profile is still recorded as active
        let snapshot = fixture.state_store.load().unwrap();
        assert!(!snapshot.not_active);
        assert_eq!(snapshot.filename.as_deref(), Some("desk"));
        assert!(snapshot.filename_backup.is_none());
    }

    #[test]
    fn test_quick_action_toggle_builds_on_applied_state() {
        let mut fixture = fixture();
        save_profile(
            &fixture,
            "desk",
            &Profile {
                profile_name: "Desk".into(),
                size: "1280x720".into(),
                ui_refresh: UiRefreshStrategy::RestartCompositor,
                ..Profile::default()
            },
        );
        fixture.service.load("desk").unwrap();

        let report = fixture
            .service
            .quick_action("backlight_off", &RequestedValue::ToggleCurrent)
            .unwrap();
        assert_eq!(report.active.as_deref(), Some(constants::config::QUICK_ACTIONS));

        let snapshot = fixture.state_store.load().unwrap();
        assert!(snapshot.backlight_off);
        // The applied size carried over instead of reverting
        assert_eq!(snapshot.size, "1280x720");

        // The persisted bundle holds the resolved literal, not the toggle
        let quick = fixture
            .service
            .profiles()
            .get(constants::config::QUICK_ACTIONS)
            .unwrap();
        assert!(quick.backlight_off);
        assert!(quick.quick_action_toggle.is_none());
    }

    #[test]
    fn test_loading_normal_profile_clears_quick_actions() {
        let mut fixture = fixture();
        save_profile(
            &fixture,
            "desk",
            &Profile {
                profile_name: "Desk".into(),
                ..Profile::default()
            },
        );
        fixture
            .service
            .quick_action("vibration_off", &RequestedValue::Literal("on".into()))
            .unwrap();
        assert!(fixture.service.profiles().exists(constants::config::QUICK_ACTIONS));

        fixture.service.load("desk").unwrap();
        assert!(!fixture.service.profiles().exists(constants::config::QUICK_ACTIONS));
    }

    #[test]
    fn test_forced_refresh_flag_survives_until_next_pass() {
        let mut fixture = fixture();
        save_profile(
            &fixture,
            "desk",
            &Profile {
                profile_name: "Desk".into(),
                ui_refresh: UiRefreshStrategy::RestartCompositor,
                ..Profile::default()
            },
        );
        fixture.service.load("desk").unwrap();
        fixture.service.force_ui_refresh().unwrap();
        assert!(fixture.state_store.load().unwrap().force_ui_refresh);

        // The reload would otherwise be a no-op; the armed flag makes it
        // rerun the refresh strategy, then clears itself
        let report = fixture.service.load("desk").unwrap();
        assert!(report.commands.iter().any(|c| c.starts_with("sleep 2 && ")));
        assert!(!fixture.state_store.load().unwrap().force_ui_refresh);
    }

    #[test]
    fn test_worker_serializes_queued_requests() {
        let fixture = fixture();
        save_profile(
            &fixture,
            "desk",
            &Profile {
                profile_name: "Desk".into(),
                size: "1280x720".into(),
                ..Profile::default()
            },
        );
        let Fixture {
            _tmp,
            executor,
            service,
            ..
        } = fixture;

        let (handle, join) = spawn(service);
        let report = handle.submit(Request::Load("desk".into())).unwrap();
        assert_eq!(report.active.as_deref(), Some("desk"));
        let report = handle.submit(Request::TurnOff).unwrap();
        assert_eq!(report.active, None);
        assert!(!executor.all_commands().is_empty());

        drop(handle);
        join.join().unwrap();
    }
}
