//! JSON persistence for per-character configuration
//!
//! Each character gets its own `<content_id>.json` inside the store directory.
//! Saving is a plain overwrite: a crash mid-write can leave a truncated file,
//! which the next load reports as a parse failure instead of silently
//! replacing it with defaults.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::config::CharacterConfig;
use crate::error::ConfigError;

/// Directory-backed store of character configurations
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Platform config directory for the plugin (`~/.config/travelcase` on Linux)
    pub fn default_dir() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(crate::constants::config::APP_DIR);
        path
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the configuration file for a content id
    pub fn path_for(&self, content_id: u64) -> PathBuf {
        self.dir.join(format!(
            "{}.{}",
            content_id,
            crate::constants::config::FILE_EXTENSION
        ))
    }

    pub fn exists(&self, content_id: u64) -> bool {
        content_id != 0 && self.path_for(content_id).is_file()
    }

    /// Load the configuration for a character.
    ///
    /// A missing file yields the default configuration. A file that exists but
    /// cannot be read or parsed is an error: callers must treat that as "no
    /// usable configuration" so a later save doesn't wipe the user's bindings.
    pub fn load(&self, content_id: u64) -> Result<CharacterConfig, ConfigError> {
        if content_id == 0 {
            warn!("No content id found, not able to load character configuration");
            return Err(ConfigError::IdentityUnavailable);
        }

        let path = self.path_for(content_id);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(
                    content_id = content_id,
                    path = %path.display(),
                    "No character configuration on disk, using defaults"
                );
                return Ok(CharacterConfig::default());
            }
            Err(source) => {
                error!(
                    path = %path.display(),
                    error = %source,
                    "Failed to read character configuration"
                );
                return Err(ConfigError::Io { path, source });
            }
        };

        // An empty document or a literal `null` carried nothing worth protecting
        if contents.trim().is_empty() {
            return Ok(CharacterConfig::default());
        }

        match serde_json::from_str::<Option<CharacterConfig>>(&contents) {
            Ok(config) => {
                let config = config.unwrap_or_default();
                info!(
                    content_id = content_id,
                    bindings = config.gearset_bindings.len(),
                    "Loaded character configuration"
                );
                Ok(config)
            }
            Err(source) => {
                error!(
                    path = %path.display(),
                    error = %source,
                    "Failed to load character configuration"
                );
                Err(ConfigError::Parse { path, source })
            }
        }
    }

    /// Serialize the configuration and overwrite the character's file
    pub fn save(&self, config: &CharacterConfig, content_id: u64) -> Result<(), ConfigError> {
        if content_id == 0 {
            warn!("No content id found, not able to save character configuration");
            return Err(ConfigError::IdentityUnavailable);
        }

        fs::create_dir_all(&self.dir).map_err(|source| {
            error!(
                dir = %self.dir.display(),
                error = %source,
                "Failed to create configuration directory"
            );
            ConfigError::Io {
                path: self.dir.clone(),
                source,
            }
        })?;

        let json = serde_json::to_string_pretty(config).inspect_err(|e| {
            error!(error = %e, "Failed to serialize character configuration");
        })?;

        let path = self.path_for(content_id);
        fs::write(&path, json).map_err(|source| {
            error!(
                path = %path.display(),
                error = %source,
                "Failed to save character configuration to file"
            );
            ConfigError::Io {
                path: path.clone(),
                source,
            }
        })?;

        info!(content_id = content_id, path = %path.display(), "Saved character configuration");
        Ok(())
    }
}
