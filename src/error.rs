//! Error types for configuration storage, binding validation and gearset execution.
//!
//! Every error here is terminal for the operation that produced it and is
//! logged where it happens; none of them are meant to unwind past the
//! component that raised them.

use std::path::PathBuf;

use thiserror::Error;

/// Failures while loading or saving a character configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No logged-in character (content id 0 or absent).
    #[error("no content id available, character configuration is unavailable")]
    IdentityUnavailable,

    #[error("failed to parse character configuration at {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("i/o error on character configuration at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize character configuration: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A binding that must not be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("gearset number {0} is not a valid value")]
    GearsetOutOfRange(i32),

    #[error("glamour plate {0} is not a valid value")]
    GlamourPlateOutOfRange(u8),
}

/// Non-success reported by the gearset executor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// The client refused the equip request (the game returns -1).
    #[error("equip request for gearset {gearset} rejected with code {code}")]
    Rejected { gearset: i32, code: i32 },
}
