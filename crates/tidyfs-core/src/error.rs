//! Error types for TidyFS Core

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for TidyFS operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("Safety error: {0}")]
    Safety(#[from] SafetyError),

    #[error("Action error: {0}")]
    Action(#[from] ActionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Sandbox/filesystem errors
#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Invalid sandbox root: {0}")]
    InvalidRoot(String),

    #[error("Path outside allowed directory: {0}")]
    PathOutsideRoot(String),

    #[error("Source does not exist: {0}")]
    SourceNotFound(String),

    #[error("Path does not exist: {0}")]
    NotFound(String),

    #[error("Path is not a directory: {0}")]
    NotADirectory(String),

    #[error("Destination already exists: {0}")]
    DestinationConflict(String),

    #[error("{path} is a {actual}, expected a {expected}")]
    KindMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("Directory is not empty: {0}")]
    DirectoryNotEmpty(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("No free alternate name for {0}")]
    RenameExhausted(String),
}

/// Rejections raised by the safety validator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SafetyError {
    #[error("Unauthorized action: {0}")]
    UnauthorizedAction(String),

    #[error("Dangerous pattern in parameter '{parameter}': {value}")]
    DangerousPatternDetected { parameter: String, value: String },

    #[error("Protected system path: {0}")]
    ProtectedSystemPath(String),

    #[error("Missing required parameters for {0}")]
    MissingParameters(String),
}

/// Action request/dispatch errors
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Invalid parameters for {action}: {reason}")]
    InvalidParameters { action: String, reason: String },
}

/// Settings loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("Invalid settings: {0}")]
    Invalid(String),
}

/// Stable, serialisable classification of an [`Error`].
///
/// Results crossing the operation boundary carry this alongside the message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRoot,
    PathOutsideRoot,
    SourceNotFound,
    NotFound,
    NotADirectory,
    DestinationConflict,
    KindMismatch,
    DirectoryNotEmpty,
    AlreadyExists,
    InvalidPath,
    UnauthorizedAction,
    UnknownAction,
    InvalidParameters,
    DangerousPatternDetected,
    ProtectedSystemPath,
    Config,
    Io,
    Serialization,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRoot => "invalid_root",
            Self::PathOutsideRoot => "path_outside_root",
            Self::SourceNotFound => "source_not_found",
            Self::NotFound => "not_found",
            Self::NotADirectory => "not_a_directory",
            Self::DestinationConflict => "destination_conflict",
            Self::KindMismatch => "kind_mismatch",
            Self::DirectoryNotEmpty => "directory_not_empty",
            Self::AlreadyExists => "already_exists",
            Self::InvalidPath => "invalid_path",
            Self::UnauthorizedAction => "unauthorized_action",
            Self::UnknownAction => "unknown_action",
            Self::InvalidParameters => "invalid_parameters",
            Self::DangerousPatternDetected => "dangerous_pattern_detected",
            Self::ProtectedSystemPath => "protected_system_path",
            Self::Config => "config",
            Self::Io => "io",
            Self::Serialization => "serialization",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Classify this error for the wire
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Sandbox(e) => match e {
                SandboxError::InvalidRoot(_) => ErrorKind::InvalidRoot,
                SandboxError::PathOutsideRoot(_) => ErrorKind::PathOutsideRoot,
                SandboxError::SourceNotFound(_) => ErrorKind::SourceNotFound,
                SandboxError::NotFound(_) => ErrorKind::NotFound,
                SandboxError::NotADirectory(_) => ErrorKind::NotADirectory,
                SandboxError::DestinationConflict(_) => ErrorKind::DestinationConflict,
                SandboxError::KindMismatch { .. } => ErrorKind::KindMismatch,
                SandboxError::DirectoryNotEmpty(_) => ErrorKind::DirectoryNotEmpty,
                SandboxError::AlreadyExists(_) => ErrorKind::AlreadyExists,
                SandboxError::InvalidPath(_) | SandboxError::RenameExhausted(_) => {
                    ErrorKind::InvalidPath
                }
            },
            Error::Safety(e) => match e {
                SafetyError::UnauthorizedAction(_) | SafetyError::MissingParameters(_) => {
                    ErrorKind::UnauthorizedAction
                }
                SafetyError::DangerousPatternDetected { .. } => {
                    ErrorKind::DangerousPatternDetected
                }
                SafetyError::ProtectedSystemPath(_) => ErrorKind::ProtectedSystemPath,
            },
            Error::Action(e) => match e {
                ActionError::UnknownAction(_) => ErrorKind::UnknownAction,
                ActionError::InvalidParameters { .. } => ErrorKind::InvalidParameters,
            },
            Error::Config(_) => ErrorKind::Config,
            Error::Io(_) => ErrorKind::Io,
            Error::Json(_) => ErrorKind::Serialization,
        }
    }
}

impl serde::Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;
