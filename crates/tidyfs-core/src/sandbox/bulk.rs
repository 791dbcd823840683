//! Pattern-driven bulk moves

use super::mover::ConflictSafeMover;
use crate::error::{Error, Result, SandboxError};
use crate::types::{BulkMoveFailure, BulkMoveReport, SkippedPattern};
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// Moves every file matched by a set of glob patterns into one directory.
///
/// Always auto-renames on conflict. All patterns are expanded against the
/// root before the first move, so files moved in by this call are never
/// matched again. One failed file never aborts the rest of the batch.
#[derive(Debug, Clone)]
pub struct BulkMover {
    mover: ConflictSafeMover,
}

impl BulkMover {
    pub fn new(mover: ConflictSafeMover) -> Self {
        Self { mover }
    }

    pub fn bulk_move(&self, patterns: &[String], destination_dir: &str) -> Result<BulkMoveReport> {
        let resolver = self.mover.resolver();
        let destination = resolver.resolve(destination_dir)?;

        match fs::metadata(&destination) {
            Ok(m) if !m.is_dir() => {
                return Err(Error::Sandbox(SandboxError::NotADirectory(
                    destination_dir.to_string(),
                )))
            }
            Ok(_) => {}
            Err(_) => fs::create_dir_all(&destination)?,
        }

        let mut report = BulkMoveReport {
            destination_dir: resolver.relative(&destination)?,
            ..BulkMoveReport::default()
        };

        let files = self.expand(patterns, &mut report.skipped_patterns);
        report.matched = files.len();

        for file in files {
            let relative_source = match resolver.relative(&file) {
                Ok(r) => r,
                Err(e) => {
                    report.errors.push(failure(file.to_string_lossy().to_string(), &e));
                    continue;
                }
            };
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let relative_dest = if report.destination_dir == "." {
                name
            } else {
                format!("{}/{}", report.destination_dir, name)
            };

            match self.mover.move_file(&relative_source, &relative_dest, true) {
                Ok(outcome) if outcome.renamed => report.renamed.push(outcome),
                Ok(outcome) => report.moved.push(outcome),
                Err(e) => {
                    warn!("Bulk move skipped {}: {}", relative_source, e);
                    report.errors.push(failure(relative_source, &e));
                }
            }
        }

        info!(
            "Bulk move completed: {} moved, {} renamed, {} errors",
            report.moved.len(),
            report.renamed.len(),
            report.errors.len()
        );
        Ok(report)
    }

    /// Expand patterns to distinct regular files, in match order
    fn expand(&self, patterns: &[String], skipped: &mut Vec<SkippedPattern>) -> Vec<PathBuf> {
        let root = self.mover.resolver().root();
        let escaped_root = glob::Pattern::escape(&root.to_string_lossy());

        let mut seen = HashSet::new();
        let mut files = Vec::new();

        for pattern in patterns {
            if let Some(reason) = reject_pattern(pattern) {
                warn!("Skipping pattern {:?}: {}", pattern, reason);
                skipped.push(SkippedPattern {
                    pattern: pattern.clone(),
                    reason: reason.to_string(),
                });
                continue;
            }

            let full = format!("{}/{}", escaped_root.trim_end_matches('/'), pattern);
            let paths = match glob::glob(&full) {
                Ok(paths) => paths,
                Err(e) => {
                    skipped.push(SkippedPattern {
                        pattern: pattern.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            for path in paths.flatten() {
                if path.is_file() && seen.insert(path.clone()) {
                    files.push(path);
                }
            }
            debug!("Pattern {:?} matched {} files so far", pattern, files.len());
        }

        files
    }
}

fn reject_pattern(pattern: &str) -> Option<&'static str> {
    let path = Path::new(pattern);
    if pattern.trim().is_empty() {
        Some("empty pattern")
    } else if path.has_root() || path.is_absolute() {
        Some("patterns must be relative to the sandbox root")
    } else if path.components().any(|c| c == Component::ParentDir) {
        Some("patterns may not contain '..'")
    } else {
        None
    }
}

fn failure(file: String, err: &Error) -> BulkMoveFailure {
    BulkMoveFailure {
        file,
        kind: err.kind(),
        error: err.to_string(),
    }
}
