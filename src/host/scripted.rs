//! In-memory host used by `travelcase replay` and the test suites
//!
//! State is set from the outside (a replay script or a test) and read back by
//! the engine through the collaborator traits.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use tracing::info;

use super::{
    ConditionFlags, GearsetExecutor, IdentitySource, OnlineStatusSource, ReadinessSource,
};
use crate::common::sync::lock;
use crate::error::ExecutionError;

const NO_STATUS: u32 = u32::MAX;

/// Player state driven by a script
#[derive(Debug)]
pub struct ScriptedHost {
    content_id: AtomicU64,
    online_status: AtomicU32,
    between_areas: AtomicBool,
    occupied: AtomicBool,
    in_cutscene: AtomicBool,
    unconscious: AtomicBool,
}

impl Default for ScriptedHost {
    fn default() -> Self {
        Self {
            content_id: AtomicU64::new(0),
            online_status: AtomicU32::new(NO_STATUS),
            between_areas: AtomicBool::new(false),
            occupied: AtomicBool::new(false),
            in_cutscene: AtomicBool::new(false),
            unconscious: AtomicBool::new(false),
        }
    }
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log a character in (`Some`) or out (`None`)
    pub fn set_content_id(&self, content_id: Option<u64>) {
        self.content_id
            .store(content_id.unwrap_or(0), Ordering::SeqCst);
    }

    pub fn set_online_status(&self, status: Option<u32>) {
        self.online_status
            .store(status.unwrap_or(NO_STATUS), Ordering::SeqCst);
    }

    pub fn set_conditions(&self, flags: ConditionFlags) {
        self.between_areas.store(flags.between_areas, Ordering::SeqCst);
        self.occupied.store(flags.occupied, Ordering::SeqCst);
        self.in_cutscene.store(flags.in_cutscene, Ordering::SeqCst);
        self.unconscious.store(flags.unconscious, Ordering::SeqCst);
    }
}

impl IdentitySource for ScriptedHost {
    fn current_content_id(&self) -> Option<u64> {
        match self.content_id.load(Ordering::SeqCst) {
            0 => None,
            id => Some(id),
        }
    }
}

impl ReadinessSource for ScriptedHost {
    fn conditions(&self) -> ConditionFlags {
        ConditionFlags {
            between_areas: self.between_areas.load(Ordering::SeqCst),
            occupied: self.occupied.load(Ordering::SeqCst),
            in_cutscene: self.in_cutscene.load(Ordering::SeqCst),
            unconscious: self.unconscious.load(Ordering::SeqCst),
        }
    }
}

impl OnlineStatusSource for ScriptedHost {
    fn online_status(&self) -> Option<u32> {
        match self.online_status.load(Ordering::SeqCst) {
            NO_STATUS => None,
            status => Some(status),
        }
    }
}

/// Gearset executor that records every call instead of touching a client
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    /// Gearsets reported as missing by `validate`
    missing: Mutex<HashSet<i32>>,
    /// When set, `apply` fails with this error
    failure: Mutex<Option<ExecutionError>>,
    validated: Mutex<Vec<i32>>,
    applied: Mutex<Vec<(i32, u8)>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_missing(&self, gearset: i32) {
        lock(&self.missing).insert(gearset);
    }

    pub fn fail_with(&self, error: Option<ExecutionError>) {
        *lock(&self.failure) = error;
    }

    /// Every `apply` attempt, successful or not
    pub fn applied(&self) -> Vec<(i32, u8)> {
        lock(&self.applied).clone()
    }

    pub fn validated(&self) -> Vec<i32> {
        lock(&self.validated).clone()
    }
}

impl GearsetExecutor for RecordingExecutor {
    fn validate(&self, gearset: i32) -> bool {
        lock(&self.validated).push(gearset);
        !lock(&self.missing).contains(&gearset)
    }

    fn apply(&self, gearset: i32, glamour_plate: u8) -> Result<(), ExecutionError> {
        lock(&self.applied).push((gearset, glamour_plate));
        if let Some(error) = lock(&self.failure).clone() {
            return Err(error);
        }
        info!(gearset = gearset, glamour_plate = glamour_plate, "Equipped gearset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_zero_reads_as_absent() {
        let host = ScriptedHost::new();
        assert_eq!(host.current_content_id(), None);

        host.set_content_id(Some(5));
        assert_eq!(host.current_content_id(), Some(5));

        host.set_content_id(Some(0));
        assert_eq!(host.current_content_id(), None);
    }

    #[test]
    fn test_conditions_roundtrip_through_atomics() {
        let host = ScriptedHost::new();
        assert!(!host.is_busy());

        host.set_conditions(ConditionFlags {
            in_cutscene: true,
            ..Default::default()
        });
        assert!(host.is_busy());
        assert!(host.conditions().in_cutscene);
    }

    #[test]
    fn test_recording_executor_failure() {
        let executor = RecordingExecutor::new();
        executor.mark_missing(9);
        executor.fail_with(Some(ExecutionError::Rejected { gearset: 3, code: -1 }));

        assert!(!executor.validate(9));
        assert!(executor.validate(3));
        assert!(executor.apply(3, 0).is_err());
        assert_eq!(executor.applied(), vec![(3, 0)]);
        assert_eq!(executor.validated(), vec![9, 3]);
    }
}
