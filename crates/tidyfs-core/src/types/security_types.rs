//! Security audit types

use super::Parameters;
use serde::{Deserialize, Serialize};

/// Kind of a security event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityEventType {
    BlockedSystemDirectory,
    DangerousPathPattern,
    InvalidRootPath,
    PathTraversalAttempt,
    DangerousFilePattern,
    UnauthorizedAction,
    DangerousParameter,
    MissingParameters,
    SystemFileModificationAttempt,
    SuspiciousUserInput,
    LongUserInput,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

/// Immutable audit record of a validator rejection or flagged input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub event_type: SecurityEventType,
    pub severity: Severity,
    pub details: Parameters,
}

impl SecurityEvent {
    pub fn new(event_type: SecurityEventType, severity: Severity, details: Parameters) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now(),
            event_type,
            severity,
            details,
        }
    }
}

/// Static description of the protections a validator enforces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyReport {
    pub dangerous_patterns_count: usize,
    pub system_directories_protected: usize,
    pub validation_active: bool,
    pub features: Vec<String>,
}
