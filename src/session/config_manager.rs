//! Login/logout tracking for the per-character configuration
//!
//! Watches the framework update tick and loads the character's configuration
//! once when a character logs in, and drops it once when they log out. A
//! failed load still counts as "logged in" so a broken file is reported once
//! instead of on every tick.

use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, info, warn};

use super::ActiveConfig;
use crate::common::sync::lock;
use crate::common::{EventHub, Subscription};
use crate::config::{CharacterConfig, ConfigStore};
use crate::error::ConfigError;
use crate::host::{HostContext, IdentitySource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unloaded,
    Loaded { content_id: u64 },
}

/// What a tick changed, if anything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleTransition {
    /// A character logged in; `usable` is false when their file failed to load
    Loaded { content_id: u64, usable: bool },
    /// The character logged out and their configuration was dropped
    Unloaded { content_id: u64 },
    /// A different character was present on consecutive ticks
    Swapped { from: u64, to: u64, usable: bool },
}

pub struct CharacterConfigManager {
    identity: Arc<dyn IdentitySource>,
    store: ConfigStore,
    active: Arc<ActiveConfig>,
    state: Mutex<LifecycleState>,
    subscription: Mutex<Option<Subscription>>,
}

impl CharacterConfigManager {
    pub fn new(ctx: &HostContext) -> Self {
        Self {
            identity: ctx.identity.clone(),
            store: ctx.store.clone(),
            active: Arc::new(ActiveConfig::new()),
            state: Mutex::new(LifecycleState::Unloaded),
            subscription: Mutex::new(None),
        }
    }

    /// Start listening to framework updates. The hub only holds a weak
    /// reference, so dropping the last `Arc` tears the manager down.
    pub fn attach(self: &Arc<Self>, framework_update: &EventHub<()>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let subscription = framework_update.subscribe(move |_| {
            if let Some(manager) = weak.upgrade() {
                manager.on_tick();
            }
        });

        if lock(&self.subscription).replace(subscription).is_some() {
            warn!("Config manager attached twice, replaced previous subscription");
        }
    }

    /// Shared slot the switcher reads from
    pub fn active(&self) -> Arc<ActiveConfig> {
        self.active.clone()
    }

    pub fn state(&self) -> LifecycleState {
        *lock(&self.state)
    }

    /// Compare the logged-in character with the last tick and load/unload on change
    pub fn on_tick(&self) -> Option<LifecycleTransition> {
        let current = self.identity.current_content_id().filter(|id| *id != 0);
        let mut state = lock(&self.state);

        let transition = match (*state, current) {
            (LifecycleState::Unloaded, None) => return None,
            (LifecycleState::Loaded { content_id }, Some(id)) if content_id == id => return None,
            (LifecycleState::Unloaded, Some(id)) => {
                info!(content_id = id, "Player logged in, loading their config");
                let usable = self.load(id);
                LifecycleTransition::Loaded {
                    content_id: id,
                    usable,
                }
            }
            (LifecycleState::Loaded { content_id }, None) => {
                info!(content_id = content_id, "Player logged out, unloading their config");
                self.active.clear();
                LifecycleTransition::Unloaded { content_id }
            }
            (LifecycleState::Loaded { content_id }, Some(id)) => {
                info!(from = content_id, to = id, "Logged-in character changed, reloading config");
                self.active.clear();
                let usable = self.load(id);
                LifecycleTransition::Swapped {
                    from: content_id,
                    to: id,
                    usable,
                }
            }
        };

        *state = match current {
            Some(content_id) => LifecycleState::Loaded { content_id },
            None => LifecycleState::Unloaded,
        };
        Some(transition)
    }

    fn load(&self, content_id: u64) -> bool {
        debug!(content_id = content_id, "Loading configuration");
        match self.store.load(content_id) {
            Ok(config) => {
                self.active.replace(Some(config));
                true
            }
            Err(e) => {
                // Keep the slot empty: defaults here would overwrite the user's file on next save
                warn!(
                    content_id = content_id,
                    error = %e,
                    "No usable configuration for character, automation disabled"
                );
                self.active.clear();
                false
            }
        }
    }

    /// Apply an edit to the loaded configuration and persist it.
    /// Returns `IdentityUnavailable` when no usable configuration is loaded.
    pub fn edit<F>(&self, edit: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut CharacterConfig),
    {
        let state = lock(&self.state);
        let LifecycleState::Loaded { content_id } = *state else {
            warn!("No character logged in, not able to edit configuration");
            return Err(ConfigError::IdentityUnavailable);
        };
        let Some(current) = self.active.current() else {
            warn!(content_id = content_id, "Configuration failed to load, refusing to edit it");
            return Err(ConfigError::IdentityUnavailable);
        };

        let mut next = (*current).clone();
        edit(&mut next);
        self.store.save(&next, content_id)?;
        self.active.replace(Some(next));
        Ok(())
    }

    /// Persist the loaded configuration for the logged-in character
    pub fn save_current(&self) -> Result<(), ConfigError> {
        let content_id = match *lock(&self.state) {
            LifecycleState::Loaded { content_id } => content_id,
            LifecycleState::Unloaded => 0,
        };
        match self.active.current() {
            Some(config) => self.store.save(&config, content_id),
            None => {
                warn!("No usable configuration loaded, nothing to save");
                Err(ConfigError::IdentityUnavailable)
            }
        }
    }

    /// Stop listening and drop any loaded configuration
    pub fn shutdown(&self) {
        if let Some(subscription) = lock(&self.subscription).take() {
            subscription.unsubscribe();
        }
        *lock(&self.state) = LifecycleState::Unloaded;
        if self.active.clear().is_some() {
            debug!("Dropped loaded configuration on shutdown");
        }
    }
}

impl Drop for CharacterConfigManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
