//! Core type definitions for TidyFS
//!
//! This module contains the shared types used across the core: filesystem
//! views and move outcomes, action requests and results, security events,
//! and the organizer settings.

mod action_types;
mod fs_types;
mod security_types;

pub use action_types::*;
pub use fs_types::*;
pub use security_types::*;

use crate::error::{ConfigError, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default cap on `" (N)"` alternates before falling back to a timestamp suffix
pub const DEFAULT_MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Default length above which agent text is flagged
pub const DEFAULT_MAX_USER_TEXT_LENGTH: usize = 10_000;

/// Default number of conversation entries kept
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Organizer settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct OrganizerSettings {
    pub max_rename_attempts: u32,
    pub max_user_text_length: usize,
    pub history_capacity: usize,
    /// Additional root prefixes the validator refuses, on top of the OS list
    pub extra_protected_prefixes: Vec<String>,
}

impl Default for OrganizerSettings {
    fn default() -> Self {
        Self {
            max_rename_attempts: DEFAULT_MAX_RENAME_ATTEMPTS,
            max_user_text_length: DEFAULT_MAX_USER_TEXT_LENGTH,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            extra_protected_prefixes: Vec::new(),
        }
    }
}

impl OrganizerSettings {
    /// Load settings from a JSON file; absent fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(ConfigError::Unreadable {
                path: path.to_string_lossy().to_string(),
                reason: e.to_string(),
            })
        })?;

        let settings: Self = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(ConfigError::Invalid(e.to_string())))?;
        settings.validate()?;

        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_rename_attempts == 0 {
            return Err(Error::Config(ConfigError::Invalid(
                "maxRenameAttempts must be at least 1".to_string(),
            )));
        }
        if self.history_capacity == 0 {
            return Err(Error::Config(ConfigError::Invalid(
                "historyCapacity must be at least 1".to_string(),
            )));
        }
        Ok(())
    }
}
