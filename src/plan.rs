//! Command plan: ordered privileged command slots and direct-apply actions
//!
//! A reconciliation pass fills named slots rather than positional indices;
//! execution order comes from a fixed table. The one exception is the
//! window-manager restart strategy, which flattens the plan to a shorter
//! ordering and defers the remaining slots to the boot completion step,
//! because the restart invalidates the process that would run them.

use crate::types::{Radio, SettingDomain};

/// Named command slots, one per privileged setting category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSlot {
    Density,
    /// The density command is run twice, for reliability
    DensityRepeat,
    Size,
    Overscan,
    RotationPre,
    Rotation,
    RotationPost,
    ChromeSet,
    ChromeRestart,
    Immersive,
    Navbar,
    Daydream,
    DaydreamCharging,
    StayOn,
    ShowTouches,
    SafeModeDensity,
    SafeModeSize,
    RefreshPrimary,
    RefreshSecondary,
    Vibration,
    Backlight,
}

/// Execution order for a standard pass, load and turn-off alike (the
/// turn-off direction simply never fills the safe-mode slots)
const STANDARD_ORDER: &[CommandSlot] = &[
    CommandSlot::Density,
    CommandSlot::DensityRepeat,
    CommandSlot::Size,
    CommandSlot::Overscan,
    CommandSlot::RotationPre,
    CommandSlot::Rotation,
    CommandSlot::RotationPost,
    CommandSlot::ChromeSet,
    CommandSlot::ChromeRestart,
    CommandSlot::Immersive,
    CommandSlot::Navbar,
    CommandSlot::Daydream,
    CommandSlot::DaydreamCharging,
    CommandSlot::StayOn,
    CommandSlot::ShowTouches,
    CommandSlot::SafeModeDensity,
    CommandSlot::SafeModeSize,
    CommandSlot::RefreshPrimary,
    CommandSlot::RefreshSecondary,
    CommandSlot::Vibration,
    CommandSlot::Backlight,
];

/// Execution order when the window manager is restarted; everything not
/// listed here is deferred
const FLATTENED_ORDER: &[CommandSlot] = &[
    CommandSlot::Density,
    CommandSlot::Size,
    CommandSlot::Overscan,
    CommandSlot::ChromeSet,
    CommandSlot::ChromeRestart,
    CommandSlot::Immersive,
    CommandSlot::Navbar,
    CommandSlot::Daydream,
    CommandSlot::DaydreamCharging,
    CommandSlot::StayOn,
    CommandSlot::ShowTouches,
    CommandSlot::RefreshPrimary,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlanOrdering {
    #[default]
    Standard,
    Flattened,
}

/// The privileged half of a pass: filled slots plus the ordering policy
#[derive(Debug, Clone, Default)]
pub struct CommandPlan {
    slots: Vec<(CommandSlot, String)>,
    ordering: PlanOrdering,
}

impl CommandPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill a slot, replacing any previous content
    pub fn set(&mut self, slot: CommandSlot, command: String) {
        if let Some(entry) = self.slots.iter_mut().find(|(s, _)| *s == slot) {
            entry.1 = command;
        } else {
            self.slots.push((slot, command));
        }
    }

    pub fn get(&self, slot: CommandSlot) -> Option<&str> {
        self.slots
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, c)| c.as_str())
    }

    pub fn ordering(&self) -> PlanOrdering {
        self.ordering
    }

    pub fn set_ordering(&mut self, ordering: PlanOrdering) {
        self.ordering = ordering;
    }

    fn order_table(&self) -> &'static [CommandSlot] {
        match self.ordering {
            PlanOrdering::Standard => STANDARD_ORDER,
            PlanOrdering::Flattened => FLATTENED_ORDER,
        }
    }

    /// Commands in execution order, empty slots elided
    pub fn commands(&self) -> Vec<String> {
        self.order_table()
            .iter()
            .filter_map(|slot| self.get(*slot).map(str::to_string))
            .collect()
    }

    /// Filled slots excluded by the current ordering; under the flattened
    /// ordering these run at the boot completion step instead
    pub fn deferred(&self) -> Vec<(CommandSlot, String)> {
        let table = self.order_table();
        self.slots
            .iter()
            .filter(|(slot, _)| !table.contains(slot))
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.commands().is_empty()
    }
}

/// A setting change made through an unprivileged platform API instead of
/// the privileged executor
#[derive(Debug, Clone, PartialEq)]
pub enum DirectAction {
    PutSetting {
        domain: SettingDomain,
        key: String,
        value: i32,
        /// Privileged command to fall back to when the platform denies the
        /// unprivileged write
        fallback: Option<(CommandSlot, String)>,
    },
    SetRadio {
        radio: Radio,
        on: bool,
    },
}

impl DirectAction {
    pub fn put(domain: SettingDomain, key: &str, value: i32) -> Self {
        DirectAction::PutSetting {
            domain,
            key: key.to_string(),
            value,
            fallback: None,
        }
    }

    pub fn put_with_fallback(
        domain: SettingDomain,
        key: &str,
        value: i32,
        slot: CommandSlot,
        command: String,
    ) -> Self {
        DirectAction::PutSetting {
            domain,
            key: key.to_string(),
            value,
            fallback: Some((slot, command)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_follow_slot_order_not_insertion_order() {
        let mut plan = CommandPlan::new();
        plan.set(CommandSlot::Backlight, "echo 0 > bl".into());
        plan.set(CommandSlot::Density, "wm density 240".into());
        plan.set(CommandSlot::Size, "wm size 1920x1080".into());
        assert_eq!(
            plan.commands(),
            vec!["wm density 240", "wm size 1920x1080", "echo 0 > bl"]
        );
    }

    #[test]
    fn test_set_replaces_slot_content() {
        let mut plan = CommandPlan::new();
        plan.set(CommandSlot::Backlight, "echo 0 > bl".into());
        plan.set(CommandSlot::Backlight, "sleep 2 && echo 0 > bl".into());
        assert_eq!(plan.commands(), vec!["sleep 2 && echo 0 > bl"]);
    }

    #[test]
    fn test_flattened_ordering_defers_unlisted_slots() {
        let mut plan = CommandPlan::new();
        plan.set(CommandSlot::Size, "wm size 1920x1080".into());
        plan.set(CommandSlot::Rotation, "rotate".into());
        plan.set(CommandSlot::Backlight, "echo 0 > bl".into());
        plan.set(CommandSlot::RefreshPrimary, "sleep 1 && am restart".into());
        plan.set_ordering(PlanOrdering::Flattened);

        assert_eq!(plan.commands(), vec!["wm size 1920x1080", "sleep 1 && am restart"]);
        let deferred = plan.deferred();
        assert!(deferred.iter().any(|(s, _)| *s == CommandSlot::Rotation));
        assert!(deferred.iter().any(|(s, _)| *s == CommandSlot::Backlight));
        assert_eq!(deferred.len(), 2);
    }

    #[test]
    fn test_empty_plan() {
        let plan = CommandPlan::new();
        assert!(plan.is_empty());
        assert!(plan.deferred().is_empty());
    }
}
