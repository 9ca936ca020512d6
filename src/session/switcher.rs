//! Automatic gearset switching on territory change
//!
//! Every territory change runs a synchronous check (config enabled, roleplay
//! gate, binding present, territory allowed, values in range) and, if it
//! passes, spawns a task that waits for the player to be free before asking
//! the gearset module to equip the bound set.
//!
//! Each territory change bumps a generation counter. A waiting task re-checks
//! it before equipping, so zoning again while the previous wait is still
//! pending never applies the stale binding.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::ActiveConfig;
use crate::common::sync::lock;
use crate::common::{EventHub, Subscription};
use crate::config::GearsetBinding;
use crate::constants;
use crate::error::{BindingError, ExecutionError};
use crate::host::{
    GearsetExecutor, HostContext, OnlineStatusSource, ReadinessSource, TerritoryAllowList,
};

/// Tuning for the readiness wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitcherSettings {
    /// Delay between readiness polls
    pub poll_interval: Duration,
    /// Give up waiting after this long (`None` = wait until cancelled)
    pub max_wait: Option<Duration>,
}

impl Default for SwitcherSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(constants::switcher::POLL_INTERVAL_MS),
            max_wait: None,
        }
    }
}

/// Why a territory change did not schedule a gearset change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Same territory as the last handled change
    AlreadyHandled,
    /// No character logged in, or their configuration failed to load
    NoConfig,
    Disabled,
    NotRoleplaying,
    NoBinding,
    TerritoryNotAllowed,
    InvalidBinding(BindingError),
}

#[derive(Debug)]
pub enum SwitchDecision {
    Skipped(SkipReason),
    Scheduled(ScheduledSwitch),
}

impl SwitchDecision {
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            SwitchDecision::Skipped(reason) => Some(*reason),
            SwitchDecision::Scheduled(_) => None,
        }
    }
}

/// How a scheduled gearset change ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    Applied,
    /// A newer territory change arrived while waiting
    Superseded,
    /// Conditions did not clear within `max_wait`
    TimedOut,
    /// The gearset module does not know this gearset
    InvalidGearset,
    Failed(ExecutionError),
    /// The task was aborted or panicked
    Cancelled,
}

/// A gearset change waiting for (or done with) its background task
#[derive(Debug)]
pub struct ScheduledSwitch {
    pub territory: u16,
    pub binding: GearsetBinding,
    pub generation: u64,
    handle: JoinHandle<SwitchOutcome>,
}

impl ScheduledSwitch {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the background task and return how it ended
    pub async fn outcome(self) -> SwitchOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    territory = self.territory,
                    error = %e,
                    "Gearset change task did not complete"
                );
                SwitchOutcome::Cancelled
            }
        }
    }
}

pub struct GearsetSwitcher {
    readiness: Arc<dyn ReadinessSource>,
    online_status: Arc<dyn OnlineStatusSource>,
    allowed_territories: Arc<dyn TerritoryAllowList>,
    executor: Arc<dyn GearsetExecutor>,
    active: Arc<ActiveConfig>,
    settings: SwitcherSettings,
    runtime: Handle,
    /// Territory of the last change that passed the enabled/roleplay gates
    last_territory: Option<u16>,
    /// Login session `last_territory` belongs to
    session: u64,
    generation: Arc<AtomicU64>,
    pending: Option<ScheduledSwitch>,
}

impl GearsetSwitcher {
    pub fn new(
        ctx: &HostContext,
        active: Arc<ActiveConfig>,
        settings: SwitcherSettings,
        runtime: Handle,
    ) -> Self {
        Self {
            readiness: ctx.readiness.clone(),
            online_status: ctx.online_status.clone(),
            allowed_territories: ctx.allowed_territories.clone(),
            executor: ctx.executor.clone(),
            active,
            settings,
            runtime,
            last_territory: None,
            session: 0,
            generation: Arc::new(AtomicU64::new(0)),
            pending: None,
        }
    }

    /// Register on the territory-changed hub. The most recent scheduled change
    /// is kept and can be collected with [`GearsetSwitcher::take_pending`].
    pub fn attach(
        switcher: &Arc<Mutex<Self>>,
        territory_changed: &EventHub<u16>,
    ) -> Subscription {
        let switcher = switcher.clone();
        territory_changed.subscribe(move |territory| {
            let mut switcher = lock(&switcher);
            let decision = switcher.on_territory_changed(*territory);
            if let SwitchDecision::Scheduled(scheduled) = decision {
                switcher.pending = Some(scheduled);
            }
        })
    }

    pub fn last_territory(&self) -> Option<u16> {
        self.last_territory
    }

    /// Most recently scheduled change, if it has not been collected yet
    pub fn take_pending(&mut self) -> Option<ScheduledSwitch> {
        self.pending.take()
    }

    /// Make any waiting task give up without applying
    pub fn cancel_pending(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn on_territory_changed(&mut self, territory: u16) -> SwitchDecision {
        // A different login starts with a clean slate
        let session = self.active.session();
        if session != self.session {
            self.session = session;
            self.last_territory = None;
        }

        if self.last_territory == Some(territory) {
            debug!(territory = territory, "Territory already handled, skipping");
            return SwitchDecision::Skipped(SkipReason::AlreadyHandled);
        }

        // Any wait still pending belongs to a territory we have left
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(config) = self.active.current() else {
            debug!(territory = territory, "No character configuration loaded, skipping");
            return SwitchDecision::Skipped(SkipReason::NoConfig);
        };
        if !config.is_enabled {
            return SwitchDecision::Skipped(SkipReason::Disabled);
        }

        if config.only_in_roleplay_mode {
            let status = self.online_status.online_status();
            if status != Some(constants::online_status::ROLEPLAYING) {
                debug!(
                    status = ?status,
                    "Player is not in roleplay mode, skipping gearset change"
                );
                return SwitchDecision::Skipped(SkipReason::NotRoleplaying);
            }
        }

        debug!(
            territory = territory,
            "Territory changed and config is enabled, attempting to apply gearset"
        );
        self.last_territory = Some(territory);

        let Some(binding) = config.binding_for(territory).copied().filter(|b| b.enabled) else {
            return SwitchDecision::Skipped(SkipReason::NoBinding);
        };

        if !self.allowed_territories.contains(territory) {
            warn!(
                territory = territory,
                "Territory is not an allowed territory, skipping gearset change"
            );
            return SwitchDecision::Skipped(SkipReason::TerritoryNotAllowed);
        }

        if let Err(e) = binding.validate() {
            warn!(territory = territory, error = %e, "Invalid binding, skipping gearset change");
            return SwitchDecision::Skipped(SkipReason::InvalidBinding(e));
        }

        let task = GearsetChange {
            territory,
            binding,
            generation,
            current_generation: self.generation.clone(),
            readiness: self.readiness.clone(),
            executor: self.executor.clone(),
            settings: self.settings,
        };
        let handle = self.runtime.spawn(task.run());

        SwitchDecision::Scheduled(ScheduledSwitch {
            territory,
            binding,
            generation,
            handle,
        })
    }
}

impl Drop for GearsetSwitcher {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

/// State moved into the background task
struct GearsetChange {
    territory: u16,
    binding: GearsetBinding,
    generation: u64,
    current_generation: Arc<AtomicU64>,
    readiness: Arc<dyn ReadinessSource>,
    executor: Arc<dyn GearsetExecutor>,
    settings: SwitcherSettings,
}

impl GearsetChange {
    fn is_stale(&self) -> bool {
        self.current_generation.load(Ordering::SeqCst) != self.generation
    }

    async fn run(self) -> SwitchOutcome {
        let started = tokio::time::Instant::now();

        loop {
            if self.is_stale() {
                debug!(
                    territory = self.territory,
                    "Territory changed again while waiting, dropping gearset change"
                );
                return SwitchOutcome::Superseded;
            }
            if !self.readiness.is_busy() {
                break;
            }
            if let Some(max_wait) = self.settings.max_wait
                && started.elapsed() >= max_wait
            {
                warn!(
                    territory = self.territory,
                    waited = ?started.elapsed(),
                    "Conditions did not clear in time, skipping gearset change"
                );
                return SwitchOutcome::TimedOut;
            }
            debug!("Unable to change gearset yet, waiting for conditions to clear");
            tokio::time::sleep(self.settings.poll_interval).await;
        }

        self.change_gearset()
    }

    fn change_gearset(&self) -> SwitchOutcome {
        let GearsetBinding {
            gearset_number,
            glamour_plate,
            ..
        } = self.binding;

        info!(
            territory = self.territory,
            gearset = gearset_number,
            glamour_plate = glamour_plate,
            "Moved zones, changing gearset"
        );

        if !self.executor.validate(gearset_number) {
            warn!(
                gearset = gearset_number,
                "Unknown or invalid gearset value, skipping gearset change"
            );
            return SwitchOutcome::InvalidGearset;
        }

        match self.executor.apply(gearset_number, glamour_plate) {
            Ok(()) => SwitchOutcome::Applied,
            Err(e) => {
                error!(gearset = gearset_number, error = %e, "Failed to change gearset");
                SwitchOutcome::Failed(e)
            }
        }
    }
}
