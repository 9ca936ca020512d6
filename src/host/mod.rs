//! Host collaborator interfaces
//!
//! Everything the engine needs from the game client sits behind one of these
//! traits: who is logged in, what the player is currently doing, which
//! territories automation may act in, and the gearset module itself. The real
//! client provides implementations; [`scripted`] provides in-memory ones for
//! replays and tests.

pub mod scripted;

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use crate::common::EventHub;
use crate::config::ConfigStore;
use crate::error::ExecutionError;

/// Source of the currently logged-in character
pub trait IdentitySource: Send + Sync {
    /// Content id of the logged-in character; `None` or `Some(0)` when nobody is
    fn current_content_id(&self) -> Option<u64>;
}

/// Condition flags that make a gearset change unsafe or doomed to fail
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConditionFlags {
    /// Zoning (covers both between-areas flags the client reports)
    pub between_areas: bool,
    pub occupied: bool,
    pub in_cutscene: bool,
    pub unconscious: bool,
}

impl ConditionFlags {
    pub fn is_busy(&self) -> bool {
        self.between_areas || self.occupied || self.in_cutscene || self.unconscious
    }
}

/// Readiness of the local player
pub trait ReadinessSource: Send + Sync {
    fn conditions(&self) -> ConditionFlags;

    fn is_busy(&self) -> bool {
        self.conditions().is_busy()
    }
}

/// Online status of the local player (e.g. role-playing)
pub trait OnlineStatusSource: Send + Sync {
    /// Status id, `None` when no player object is available
    fn online_status(&self) -> Option<u32>;
}

/// Externally maintained set of territories where switching is allowed
pub trait TerritoryAllowList: Send + Sync {
    fn contains(&self, territory: u16) -> bool;
}

impl TerritoryAllowList for HashSet<u16> {
    fn contains(&self, territory: u16) -> bool {
        HashSet::contains(self, &territory)
    }
}

impl TerritoryAllowList for BTreeSet<u16> {
    fn contains(&self, territory: u16) -> bool {
        BTreeSet::contains(self, &territory)
    }
}

/// The client's gearset module
pub trait GearsetExecutor: Send + Sync {
    /// Whether the gearset slot exists and can be equipped
    fn validate(&self, gearset: i32) -> bool;

    /// Equip a gearset, optionally with a glamour plate (0 = none)
    fn apply(&self, gearset: i32, glamour_plate: u8) -> Result<(), ExecutionError>;
}

/// Explicit bundle of host services, built once and handed to every component
#[derive(Clone)]
pub struct HostContext {
    pub identity: Arc<dyn IdentitySource>,
    pub readiness: Arc<dyn ReadinessSource>,
    pub online_status: Arc<dyn OnlineStatusSource>,
    pub allowed_territories: Arc<dyn TerritoryAllowList>,
    pub executor: Arc<dyn GearsetExecutor>,
    pub store: ConfigStore,
}

/// Event sources the host drives
pub struct HostEvents {
    /// Fired on every framework update
    pub framework_update: EventHub<()>,
    /// Fired with the new territory id after zoning
    pub territory_changed: EventHub<u16>,
}

impl HostEvents {
    pub fn new() -> Self {
        Self {
            framework_update: EventHub::new("framework_update"),
            territory_changed: EventHub::new("territory_changed"),
        }
    }
}

impl Default for HostEvents {
    fn default() -> Self {
        Self::new()
    }
}
