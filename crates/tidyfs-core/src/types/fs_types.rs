//! Filesystem views and move outcomes

use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::path::Path;

/// Kind of a filesystem entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    pub fn of(metadata: &Metadata) -> Self {
        if metadata.is_dir() {
            Self::Directory
        } else {
            Self::File
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of one entry under the sandbox root.
///
/// Built on demand from live metadata; never cached between calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSystemEntry {
    pub name: String,
    /// Path relative to the sandbox root, `/`-separated
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Size in bytes, files only
    pub size: Option<u64>,
    pub modified: Option<chrono::DateTime<chrono::Utc>>,
    pub mime_type: Option<String>,
}

impl FileSystemEntry {
    pub(crate) fn from_metadata(
        name: String,
        relative_path: String,
        absolute_path: &Path,
        metadata: &Metadata,
    ) -> Self {
        let kind = EntryKind::of(metadata);
        let is_file = kind == EntryKind::File;

        Self {
            name,
            path: relative_path,
            kind,
            size: if is_file { Some(metadata.len()) } else { None },
            modified: metadata.modified().ok().map(|t| t.into()),
            mime_type: if is_file {
                Some(
                    mime_guess::from_path(absolute_path)
                        .first_or_octet_stream()
                        .to_string(),
                )
            } else {
                None
            },
        }
    }
}

/// Immediate-child count of a directory; degraded when unreadable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChildCount {
    Count(usize),
    Unavailable(String),
}

/// Entry view returned by `get_info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInfo {
    #[serde(flatten)]
    pub entry: FileSystemEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents_count: Option<ChildCount>,
}

/// Result of a single conflict-safe move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutcome {
    pub source: String,
    pub intended_destination: String,
    pub final_destination: String,
    pub kind: EntryKind,
    /// True when conflict resolution picked a different final path
    pub renamed: bool,
}

/// What a move would do, computed without touching the filesystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovePreview {
    pub source: String,
    pub destination: String,
    pub source_type: EntryKind,
    pub will_create_dirs: bool,
    pub conflict: bool,
    pub safe: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict_type: Option<EntryKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_rename_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dirs_to_create: Option<String>,
}

/// A matched file that a bulk move could not relocate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkMoveFailure {
    pub file: String,
    pub kind: ErrorKind,
    pub error: String,
}

/// A glob pattern rejected before expansion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedPattern {
    pub pattern: String,
    pub reason: String,
}

/// Aggregate result of a bulk move
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkMoveReport {
    pub destination_dir: String,
    /// Distinct files matched across all patterns
    pub matched: usize,
    pub moved: Vec<MoveOutcome>,
    pub renamed: Vec<MoveOutcome>,
    pub errors: Vec<BulkMoveFailure>,
    pub skipped_patterns: Vec<SkippedPattern>,
}

impl BulkMoveReport {
    pub fn summary(&self) -> String {
        format!(
            "Moved {} files, renamed {} to avoid conflicts, {} errors",
            self.moved.len(),
            self.renamed.len(),
            self.errors.len()
        )
    }

    /// Every matched file landed in exactly one bucket
    pub fn is_balanced(&self) -> bool {
        self.moved.len() + self.renamed.len() + self.errors.len() == self.matched
    }
}
