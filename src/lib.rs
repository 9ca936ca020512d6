//! Travelcase: per-character automatic gearset switching
//!
//! Keeps one configuration per character (keyed by content id) that binds
//! territories to gearsets, loads it on login, and equips the bound gearset
//! when the player zones into a bound territory and is free to change.

#![deny(unsafe_code)]

pub mod common;
pub mod config;
pub mod constants;
pub mod error;
pub mod host;
pub mod plugin;
pub mod replay;
pub mod session;

pub use config::{CharacterConfig, ConfigStore, GearsetBinding};
pub use error::{BindingError, ConfigError, ExecutionError};
pub use plugin::Travelcase;
