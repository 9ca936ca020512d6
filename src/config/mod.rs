//! Configuration management
//!
//! Handles per-character configuration with JSON persistence.
//! Each logged-in character (keyed by content id) has its own document
//! mapping territories to gearset bindings.

pub mod character;
pub mod store;

pub use character::{CharacterConfig, GearsetBinding};
pub use store::ConfigStore;
