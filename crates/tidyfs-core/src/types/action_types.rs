//! Action request and result types exchanged with the decision agent

use crate::error::{ActionError, Error, ErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;

/// Flat, string-keyed parameter mapping of an action request
pub type Parameters = serde_json::Map<String, Value>;

/// Closed vocabulary of actions the core can execute
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ListDirectory,
    MoveFile,
    MoveDirectory,
    RenameFile,
    CreateDirectory,
    RemoveEmptyDirectory,
    GetFileInfo,
    GetMovePreview,
    BulkMoveFiles,
}

impl ActionKind {
    pub const ALL: [ActionKind; 9] = [
        Self::ListDirectory,
        Self::MoveFile,
        Self::MoveDirectory,
        Self::RenameFile,
        Self::CreateDirectory,
        Self::RemoveEmptyDirectory,
        Self::GetFileInfo,
        Self::GetMovePreview,
        Self::BulkMoveFiles,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListDirectory => "list_directory",
            Self::MoveFile => "move_file",
            Self::MoveDirectory => "move_directory",
            Self::RenameFile => "rename_file",
            Self::CreateDirectory => "create_directory",
            Self::RemoveEmptyDirectory => "remove_empty_directory",
            Self::GetFileInfo => "get_file_info",
            Self::GetMovePreview => "get_move_preview",
            Self::BulkMoveFiles => "bulk_move_files",
        }
    }

    /// Actions that relocate an entry and therefore name a destination
    pub fn is_relocation(&self) -> bool {
        matches!(self, Self::MoveFile | Self::MoveDirectory | Self::RenameFile)
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ActionError::UnknownAction(s.to_string()))
    }
}

/// A structured, agent-issued instruction.
///
/// `action` stays a raw string until the validator has seen it, so names
/// outside the vocabulary can still be audited and rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl ActionRequest {
    pub fn new(action: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            action: action.into(),
            parameters,
            reasoning: None,
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn kind(&self) -> Option<ActionKind> {
        self.action.parse().ok()
    }
}

/// Normalized outcome of one action request
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult {
    Success { message: String, details: Parameters },
    Error { kind: ErrorKind, message: String },
}

impl ActionResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self::Success {
            message: message.into(),
            details: Parameters::new(),
        }
    }

    pub fn success_with(message: impl Into<String>, details: Parameters) -> Self {
        Self::Success {
            message: message.into(),
            details,
        }
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Error {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Error { kind, .. } => Some(*kind),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Success { message, .. } | Self::Error { message, .. } => message,
        }
    }

    /// Wire form: `{success: true, message, ..details}` or
    /// `{success: false, error, kind}`
    pub fn to_wire(&self) -> Value {
        match self {
            Self::Success { message, details } => {
                let mut map = details.clone();
                map.insert("success".to_string(), Value::Bool(true));
                map.insert("message".to_string(), Value::String(message.clone()));
                Value::Object(map)
            }
            Self::Error { kind, message } => json!({
                "success": false,
                "error": message,
                "kind": kind,
            }),
        }
    }
}

impl From<&Error> for ActionResult {
    fn from(err: &Error) -> Self {
        Self::error(err.kind(), err.to_string())
    }
}

impl From<Error> for ActionResult {
    fn from(err: Error) -> Self {
        Self::from(&err)
    }
}

impl Serialize for ActionResult {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_wire().serialize(serializer)
    }
}

/// Per-operation outcome record handed to the audit collaborator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRecord {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub action: String,
    pub parameters: Parameters,
    pub reasoning: Option<String>,
    pub success: bool,
    pub result: Value,
}

impl ActionRecord {
    pub fn new(request: &ActionRequest, result: &ActionResult) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            action: request.action.clone(),
            parameters: request.parameters.clone(),
            reasoning: request.reasoning.clone(),
            success: result.is_success(),
            result: result.to_wire(),
        }
    }
}
