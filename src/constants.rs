//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// Persisted configuration layout
pub mod config {
    /// Directory name under the platform config directory
    pub const APP_DIR: &str = "travelcase";

    /// Extension of per-character configuration files (`<content_id>.json`)
    pub const FILE_EXTENSION: &str = "json";

    /// Current configuration schema version, incremented on breaking changes
    pub const VERSION: i32 = 0;
}

/// Binding ranges accepted before a gearset change is attempted
pub mod gearset {
    /// Lowest gearset number the game accepts
    pub const MIN_NUMBER: i32 = 0;

    /// Highest gearset number the game accepts
    pub const MAX_NUMBER: i32 = 100;

    /// Highest glamour plate index (0 = no plate)
    pub const MAX_GLAMOUR_PLATE: u8 = 20;
}

/// Online status identifiers reported by the client
pub mod online_status {
    /// "Role-playing" online status
    pub const ROLEPLAYING: u32 = 22;
}

/// Defaults for the switcher's readiness wait
pub mod switcher {
    /// Interval between readiness polls
    pub const POLL_INTERVAL_MS: u64 = 1000;
}
