//! Lock helpers shared by the session components

use std::sync::{Mutex, MutexGuard};
use tracing::warn;

/// Lock a mutex, recovering the data if a previous holder panicked.
///
/// Every mutex in the crate guards plain state that stays consistent between
/// statements, so a panic elsewhere must not take the whole engine down.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        warn!("Lock poisoned by a panicked holder, recovering");
        poisoned.into_inner()
    })
}
