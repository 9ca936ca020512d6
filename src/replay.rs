//! Scripted replay of host events
//!
//! Drives a full [`Travelcase`] instance (config manager, switcher, event hubs)
//! from a JSON script against [`ScriptedHost`] and [`RecordingExecutor`], so a
//! set of bindings can be exercised without a game client.
//!
//! ```json
//! {
//!   "allowedTerritories": [128, 132],
//!   "steps": [
//!     { "action": "login", "contentId": 18014398509481984 },
//!     { "action": "tick" },
//!     { "action": "conditions", "betweenAreas": true },
//!     { "action": "territory", "id": 128 },
//!     { "action": "conditions" },
//!     { "action": "wait", "ms": 1500 }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{info, warn};

use crate::config::{ConfigStore, GearsetBinding};
use crate::host::scripted::{RecordingExecutor, ScriptedHost};
use crate::host::{ConditionFlags, HostContext, HostEvents};
use crate::plugin::Travelcase;
use crate::session::{SwitchOutcome, SwitcherSettings};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayScript {
    #[serde(default)]
    pub allowed_territories: BTreeSet<u16>,
    /// Gearsets the scripted gearset module reports as missing
    #[serde(default)]
    pub missing_gearsets: Vec<i32>,
    pub steps: Vec<ReplayStep>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReplayStep {
    #[serde(rename_all = "camelCase")]
    Login { content_id: u64 },
    Logout,
    /// Framework update(s)
    Tick {
        #[serde(default = "default_tick_count")]
        count: u32,
    },
    Territory { id: u16 },
    /// Replace the condition flags; omitted flags are cleared
    #[serde(rename_all = "camelCase")]
    Conditions {
        #[serde(default)]
        between_areas: bool,
        #[serde(default)]
        occupied: bool,
        #[serde(default)]
        in_cutscene: bool,
        #[serde(default)]
        unconscious: bool,
    },
    OnlineStatus { status: Option<u32> },
    /// Edit the loaded configuration the way a settings window would
    #[serde(rename_all = "camelCase")]
    Bind {
        territory: u32,
        gearset_number: i32,
        #[serde(default)]
        glamour_plate: u8,
        #[serde(default = "default_enabled")]
        enabled: bool,
    },
    Wait { ms: u64 },
}

fn default_tick_count() -> u32 {
    1
}

fn default_enabled() -> bool {
    true
}

impl ReplayScript {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read replay script from {:?}", path))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse replay script {:?}", path))
    }
}

/// What the scripted gearset module saw
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayReport {
    pub applied: Vec<(i32, u8)>,
    /// Outcome of the last scheduled change, if it finished
    pub last_outcome: Option<SwitchOutcome>,
    /// The last scheduled change was still waiting when `settle` ran out
    pub still_waiting: bool,
}

/// Run a script to completion. A change still waiting at the end gets up to
/// `settle` to finish before it is reported as still waiting.
pub async fn run(
    script: &ReplayScript,
    store: ConfigStore,
    settings: SwitcherSettings,
    settle: Duration,
) -> Result<ReplayReport> {
    let host = Arc::new(ScriptedHost::new());
    let executor = Arc::new(RecordingExecutor::new());
    for gearset in &script.missing_gearsets {
        executor.mark_missing(*gearset);
    }

    let ctx = HostContext {
        identity: host.clone(),
        readiness: host.clone(),
        online_status: host.clone(),
        allowed_territories: Arc::new(script.allowed_territories.clone()),
        executor: executor.clone(),
        store,
    };
    let events = HostEvents::new();
    let plugin = Travelcase::new(&ctx, &events, settings, Handle::current());

    for (index, step) in script.steps.iter().enumerate() {
        info!(step = index, action = ?step, "Replaying step");
        match step {
            ReplayStep::Login { content_id } => host.set_content_id(Some(*content_id)),
            ReplayStep::Logout => host.set_content_id(None),
            ReplayStep::Tick { count } => {
                for _ in 0..*count {
                    events.framework_update.emit(&());
                }
            }
            ReplayStep::Territory { id } => events.territory_changed.emit(id),
            ReplayStep::Conditions {
                between_areas,
                occupied,
                in_cutscene,
                unconscious,
            } => host.set_conditions(ConditionFlags {
                between_areas: *between_areas,
                occupied: *occupied,
                in_cutscene: *in_cutscene,
                unconscious: *unconscious,
            }),
            ReplayStep::OnlineStatus { status } => host.set_online_status(*status),
            ReplayStep::Bind {
                territory,
                gearset_number,
                glamour_plate,
                enabled,
            } => {
                let binding = GearsetBinding::new(*gearset_number, *glamour_plate, *enabled);
                plugin
                    .config_manager()
                    .edit(|config| {
                        config.set_binding(*territory, binding);
                    })
                    .with_context(|| {
                        format!("Step {}: failed to bind territory {}", index, territory)
                    })?;
            }
            ReplayStep::Wait { ms } => tokio::time::sleep(Duration::from_millis(*ms)).await,
        }
    }

    let pending = plugin
        .switcher()
        .lock()
        .map_err(|_| anyhow::anyhow!("Switcher lock poisoned"))?
        .take_pending();

    let (last_outcome, still_waiting) = match pending {
        Some(pending) if pending.is_finished() => (Some(pending.outcome().await), false),
        Some(pending) => match tokio::time::timeout(settle, pending.outcome()).await {
            Ok(outcome) => (Some(outcome), false),
            Err(_) => {
                warn!(settle = ?settle, "Gearset change still waiting when the script ended");
                (None, true)
            }
        },
        None => (None, false),
    };

    drop(plugin);
    Ok(ReplayReport {
        applied: executor.applied(),
        last_outcome,
        still_waiting,
    })
}
