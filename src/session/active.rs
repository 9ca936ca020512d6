//! Shared slot holding the logged-in character's configuration
//!
//! The config manager is the only writer and always swaps in a whole new
//! snapshot; readers clone the `Arc` and never observe a half-edited document.
//! Clearing the slot (logout, character swap, failed load) starts a new
//! session, which lets readers tell a fresh login from an edit.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::CharacterConfig;

#[derive(Debug, Default)]
pub struct ActiveConfig {
    slot: RwLock<Option<Arc<CharacterConfig>>>,
    session: AtomicU64,
}

impl ActiveConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current configuration, if a character is loaded
    pub fn current(&self) -> Option<Arc<CharacterConfig>> {
        self.read().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.read().is_some()
    }

    /// Counter bumped every time the slot is cleared
    pub fn session(&self) -> u64 {
        self.session.load(Ordering::SeqCst)
    }

    pub(crate) fn replace(&self, config: Option<CharacterConfig>) -> Option<Arc<CharacterConfig>> {
        std::mem::replace(&mut *self.write(), config.map(Arc::new))
    }

    pub(crate) fn clear(&self) -> Option<Arc<CharacterConfig>> {
        let mut slot = self.write();
        self.session.fetch_add(1, Ordering::SeqCst);
        slot.take()
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Arc<CharacterConfig>>> {
        self.slot.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Arc<CharacterConfig>>> {
        self.slot.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshots_survive_replacement() {
        let active = ActiveConfig::new();
        assert!(!active.is_loaded());

        active.replace(Some(CharacterConfig::default()));
        let snapshot = active.current().unwrap();

        let mut edited = CharacterConfig::default();
        edited.is_enabled = false;
        active.replace(Some(edited));

        assert!(snapshot.is_enabled);
        assert!(!active.current().unwrap().is_enabled);

        assert_eq!(active.session(), 0);
        assert!(active.clear().is_some());
        assert!(active.current().is_none());
        assert_eq!(active.session(), 1);
    }
}
