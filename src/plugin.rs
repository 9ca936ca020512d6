//! Plugin composition root
//!
//! Builds the config manager and the gearset switcher from a [`HostContext`],
//! wires them to the host's event hubs, and tears both down in reverse order.

use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tracing::info;

use crate::common::Subscription;
use crate::host::{HostContext, HostEvents};
use crate::session::{ActiveConfig, CharacterConfigManager, GearsetSwitcher, SwitcherSettings};

pub struct Travelcase {
    config_manager: Arc<CharacterConfigManager>,
    switcher: Arc<Mutex<GearsetSwitcher>>,
    territory_subscription: Option<Subscription>,
}

impl Travelcase {
    pub fn new(
        ctx: &HostContext,
        events: &HostEvents,
        settings: SwitcherSettings,
        runtime: Handle,
    ) -> Self {
        let config_manager = Arc::new(CharacterConfigManager::new(ctx));
        config_manager.attach(&events.framework_update);

        let switcher = Arc::new(Mutex::new(GearsetSwitcher::new(
            ctx,
            config_manager.active(),
            settings,
            runtime,
        )));
        let territory_subscription = GearsetSwitcher::attach(&switcher, &events.territory_changed);

        info!(
            config_dir = %ctx.store.dir().display(),
            poll_interval = ?settings.poll_interval,
            "Travelcase initialized"
        );

        Self {
            config_manager,
            switcher,
            territory_subscription: Some(territory_subscription),
        }
    }

    pub fn config_manager(&self) -> &Arc<CharacterConfigManager> {
        &self.config_manager
    }

    pub fn switcher(&self) -> &Arc<Mutex<GearsetSwitcher>> {
        &self.switcher
    }

    pub fn active_config(&self) -> Arc<ActiveConfig> {
        self.config_manager.active()
    }
}

impl Drop for Travelcase {
    fn drop(&mut self) {
        if let Some(subscription) = self.territory_subscription.take() {
            subscription.unsubscribe();
        }
        if let Ok(switcher) = self.switcher.lock() {
            switcher.cancel_pending();
        }
        self.config_manager.shutdown();
        info!("Travelcase disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CharacterConfig, ConfigStore, GearsetBinding};
    use crate::host::scripted::{RecordingExecutor, ScriptedHost};
    use crate::session::SwitchOutcome;
    use std::collections::BTreeSet;

    #[tokio::test]
    async fn test_login_then_zone_applies_bound_gearset() {
        let temp_dir = tempfile::tempdir().unwrap();
        let host = Arc::new(ScriptedHost::new());
        let executor = Arc::new(RecordingExecutor::new());
        let ctx = HostContext {
            identity: host.clone(),
            readiness: host.clone(),
            online_status: host.clone(),
            allowed_territories: Arc::new(BTreeSet::from([100u16])),
            executor: executor.clone(),
            store: ConfigStore::new(temp_dir.path()),
        };
        let mut saved = CharacterConfig::default();
        saved.set_binding(100, GearsetBinding::new(3, 1, true));
        ctx.store.save(&saved, 55).unwrap();

        let events = HostEvents::new();
        let plugin = Travelcase::new(&ctx, &events, SwitcherSettings::default(), Handle::current());

        // Zoning before login does nothing
        events.territory_changed.emit(&100);
        assert!(plugin.switcher().lock().unwrap().take_pending().is_none());

        host.set_content_id(Some(55));
        events.framework_update.emit(&());
        assert!(plugin.active_config().is_loaded());

        events.territory_changed.emit(&100);
        let pending = plugin.switcher().lock().unwrap().take_pending().unwrap();
        assert_eq!(pending.outcome().await, SwitchOutcome::Applied);
        assert_eq!(executor.applied(), vec![(3, 1)]);

        drop(plugin);
        assert_eq!(events.framework_update.subscriber_count(), 0);
        assert_eq!(events.territory_changed.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_next_character_in_same_territory_gets_their_gearset() {
        let temp_dir = tempfile::tempdir().unwrap();
        let host = Arc::new(ScriptedHost::new());
        let executor = Arc::new(RecordingExecutor::new());
        let ctx = HostContext {
            identity: host.clone(),
            readiness: host.clone(),
            online_status: host.clone(),
            allowed_territories: Arc::new(BTreeSet::from([100u16])),
            executor: executor.clone(),
            store: ConfigStore::new(temp_dir.path()),
        };
        for (content_id, gearset) in [(1u64, 3), (2u64, 8)] {
            let mut saved = CharacterConfig::default();
            saved.set_binding(100, GearsetBinding::new(gearset, 0, true));
            ctx.store.save(&saved, content_id).unwrap();
        }

        let events = HostEvents::new();
        let plugin = Travelcase::new(&ctx, &events, SwitcherSettings::default(), Handle::current());

        for content_id in [1, 2] {
            host.set_content_id(Some(content_id));
            events.framework_update.emit(&());
            events.territory_changed.emit(&100);
            let pending = plugin.switcher().lock().unwrap().take_pending().unwrap();
            assert_eq!(pending.outcome().await, SwitchOutcome::Applied);

            host.set_content_id(None);
            events.framework_update.emit(&());
        }

        assert_eq!(executor.applied(), vec![(3, 0), (8, 0)]);
    }
}
