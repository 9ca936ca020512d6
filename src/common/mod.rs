//! Shared plumbing used by the session components

pub mod events;
pub(crate) mod sync;

pub use events::{EventHub, Subscription};
