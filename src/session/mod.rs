//! Logged-in session: configuration lifecycle and automatic gearset switching

mod active;
pub mod config_manager;
pub mod switcher;

pub use active::ActiveConfig;
pub use config_manager::{CharacterConfigManager, LifecycleState, LifecycleTransition};
pub use switcher::{
    GearsetSwitcher, ScheduledSwitch, SkipReason, SwitchDecision, SwitchOutcome, SwitcherSettings,
};
