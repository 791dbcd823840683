//! Validation and dispatch of action requests

use crate::error::{ActionError, Error, ErrorKind, Result, SandboxError};
use crate::safety::{AuditSink, SafetyValidator, ALLOWED_ACTIONS};
use crate::sandbox::{expand_home, BulkMover, ConflictSafeMover, DirectoryOperations, SandboxResolver};
use crate::types::*;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

// Every allowlisted name must have a variant to dispatch to.
const _: () = assert!(ALLOWED_ACTIONS.len() == ActionKind::ALL.len());

#[derive(Debug, Deserialize)]
struct PathParams {
    #[serde(default)]
    path: String,
}

#[derive(Debug, Deserialize)]
struct MoveParams {
    source: String,
    destination: String,
    #[serde(default = "default_auto_rename")]
    auto_rename: bool,
}

#[derive(Debug, Deserialize)]
struct RenameParams {
    old_name: String,
    new_name: String,
}

#[derive(Debug, Deserialize)]
struct PreviewParams {
    source: String,
    destination: String,
}

#[derive(Debug, Deserialize)]
struct BulkMoveParams {
    file_patterns: Vec<String>,
    destination_dir: String,
}

fn default_auto_rename() -> bool {
    true
}

/// Validates, dispatches and normalizes agent-issued action requests.
///
/// Construction is the only fallible step: a root that fails validation
/// prevents the protocol from existing at all. After that every request
/// yields an [`ActionResult`].
pub struct ActionRequestProtocol {
    validator: SafetyValidator,
    sink: Arc<dyn AuditSink>,
    mover: ConflictSafeMover,
    directories: DirectoryOperations,
    bulk: BulkMover,
}

impl ActionRequestProtocol {
    pub fn new(root: &str, settings: &OrganizerSettings, sink: Arc<dyn AuditSink>) -> Result<Self> {
        settings.validate()?;

        let validator = SafetyValidator::with_settings(sink.clone(), settings);
        let expanded = expand_home(Path::new(root));
        if !validator.validate_root_path(&expanded.to_string_lossy()) {
            return Err(Error::Sandbox(SandboxError::InvalidRoot(root.to_string())));
        }

        let resolver = SandboxResolver::new(&expanded)?;
        let mover = ConflictSafeMover::new(resolver.clone())
            .with_max_rename_attempts(settings.max_rename_attempts);

        info!("Action protocol ready for root {:?}", resolver.root());

        Ok(Self {
            validator,
            sink,
            directories: DirectoryOperations::new(resolver),
            bulk: BulkMover::new(mover.clone()),
            mover,
        })
    }

    pub fn resolver(&self) -> &SandboxResolver {
        self.mover.resolver()
    }

    pub fn validator(&self) -> &SafetyValidator {
        &self.validator
    }

    /// Validate and run one request, then hand its outcome record to the audit sink
    pub fn execute(&self, request: &ActionRequest) -> ActionResult {
        debug!("Executing action {}: {:?}", request.action, request.parameters);

        let result = match self.validator.check_action(&request.action, &request.parameters) {
            Err(rejection) => {
                warn!("Rejected action {}: {}", request.action, rejection);
                ActionResult::error(
                    ErrorKind::UnauthorizedAction,
                    format!("Action blocked by safety validator: {}", rejection),
                )
            }
            Ok(()) => match request.action.parse::<ActionKind>() {
                Ok(kind) => self
                    .dispatch(kind, &request.parameters)
                    .unwrap_or_else(ActionResult::from),
                Err(e) => ActionResult::from(Error::Action(e)),
            },
        };

        self.sink.record_action(ActionRecord::new(request, &result));
        result
    }

    fn dispatch(&self, kind: ActionKind, parameters: &Parameters) -> Result<ActionResult> {
        match kind {
            ActionKind::ListDirectory => {
                let p: PathParams = params(kind, parameters)?;
                let items = self.directories.list(&p.path)?;
                Ok(ActionResult::success_with(
                    format!("Listed {} entries in {}", items.len(), display_path(&p.path)),
                    details(json!({ "items": items })),
                ))
            }
            ActionKind::MoveFile | ActionKind::MoveDirectory => {
                let p: MoveParams = params(kind, parameters)?;
                let outcome = if kind == ActionKind::MoveFile {
                    self.mover.move_file(&p.source, &p.destination, p.auto_rename)?
                } else {
                    self.mover.move_directory(&p.source, &p.destination, p.auto_rename)?
                };
                Ok(relocated(outcome))
            }
            ActionKind::RenameFile => {
                let p: RenameParams = params(kind, parameters)?;
                let outcome = self.mover.rename(&p.old_name, &p.new_name)?;
                Ok(ActionResult::success_with(
                    format!("Renamed {} to {}", outcome.source, outcome.final_destination),
                    details(json!({ "final_path": outcome.final_destination })),
                ))
            }
            ActionKind::CreateDirectory => {
                let p: PathParams = params(kind, parameters)?;
                let entry = self.directories.create_directory(&p.path)?;
                Ok(ActionResult::success_with(
                    format!("Created directory {}", entry.path),
                    details(json!({ "path": entry.path })),
                ))
            }
            ActionKind::RemoveEmptyDirectory => {
                let p: PathParams = params(kind, parameters)?;
                self.directories.remove_empty_directory(&p.path)?;
                Ok(ActionResult::success(format!(
                    "Removed empty directory {}",
                    p.path
                )))
            }
            ActionKind::GetFileInfo => {
                let p: PathParams = params(kind, parameters)?;
                let info = self.directories.get_info(&p.path)?;
                Ok(ActionResult::success_with(
                    format!("Retrieved info for {}", info.entry.path),
                    details(serde_json::to_value(&info)?),
                ))
            }
            ActionKind::GetMovePreview => {
                let p: PreviewParams = params(kind, parameters)?;
                let preview = self.mover.preview(&p.source, &p.destination)?;
                let message = match (&preview.auto_rename_to, preview.safe) {
                    (_, false) => format!("Moving {} to {} is not allowed", p.source, p.destination),
                    (Some(alternate), true) => format!(
                        "{} exists; {} would be moved to {}",
                        p.destination, p.source, alternate
                    ),
                    (None, true) => format!("{} can be moved to {}", p.source, p.destination),
                };
                Ok(ActionResult::success_with(
                    message,
                    details(json!({ "preview": preview })),
                ))
            }
            ActionKind::BulkMoveFiles => {
                let p: BulkMoveParams = params(kind, parameters)?;
                let report = self.bulk.bulk_move(&p.file_patterns, &p.destination_dir)?;
                Ok(ActionResult::success_with(
                    report.summary(),
                    details(json!({
                        "destination_dir": report.destination_dir,
                        "moved_files": report.moved,
                        "renamed_files": report.renamed,
                        "errors": report.errors,
                        "skipped_patterns": report.skipped_patterns,
                        "summary": {
                            "matched": report.matched,
                            "moved": report.moved.len(),
                            "renamed": report.renamed.len(),
                            "errors": report.errors.len(),
                        },
                    })),
                ))
            }
        }
    }
}

/// Deserialize the parameter map into the typed parameters of `kind`
fn params<T: DeserializeOwned>(kind: ActionKind, parameters: &Parameters) -> Result<T> {
    serde_json::from_value(Value::Object(parameters.clone())).map_err(|e| {
        Error::Action(ActionError::InvalidParameters {
            action: kind.to_string(),
            reason: e.to_string(),
        })
    })
}

fn details(value: Value) -> Parameters {
    match value {
        Value::Object(map) => map,
        _ => Parameters::new(),
    }
}

fn relocated(outcome: MoveOutcome) -> ActionResult {
    let noun = match outcome.kind {
        EntryKind::File => "",
        EntryKind::Directory => "directory ",
    };
    let message = if outcome.renamed {
        format!(
            "Moved {}{} to {} (renamed to avoid overwrite)",
            noun, outcome.source, outcome.final_destination
        )
    } else {
        format!("Moved {}{} to {}", noun, outcome.source, outcome.final_destination)
    };

    ActionResult::success_with(
        message,
        details(json!({
            "final_path": outcome.final_destination,
            "renamed": outcome.renamed,
        })),
    )
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "."
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::MemoryAuditSink;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, Arc<MemoryAuditSink>, ActionRequestProtocol) {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(MemoryAuditSink::new());
        let protocol = ActionRequestProtocol::new(
            &dir.path().to_string_lossy(),
            &OrganizerSettings::default(),
            sink.clone(),
        )
        .unwrap();
        (dir, sink, protocol)
    }

    fn request(action: &str, parameters: Value) -> ActionRequest {
        ActionRequest::new(action, details(parameters))
    }

    #[test]
    fn test_allowlist_equals_dispatchable_set() {
        let allowed: BTreeSet<&str> = ALLOWED_ACTIONS.iter().copied().collect();
        let dispatchable: BTreeSet<&str> = ActionKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(allowed, dispatchable);
        assert_eq!(allowed.len(), ALLOWED_ACTIONS.len());
    }

    #[test]
    fn test_invalid_root_is_fatal() {
        let sink = Arc::new(MemoryAuditSink::new());
        let err = ActionRequestProtocol::new(
            "/nonexistent/tidyfs/root",
            &OrganizerSettings::default(),
            sink.clone(),
        )
        .err()
        .unwrap();

        assert_eq!(err.kind(), ErrorKind::InvalidRoot);
        assert_eq!(sink.security_events().len(), 1);
    }

    #[test]
    fn test_list_directory_defaults_to_root() {
        let (dir, sink, protocol) = fixture();
        fs::write(dir.path().join("a.txt"), "A").unwrap();

        let result = protocol.execute(&request("list_directory", json!({})));
        assert!(result.is_success());

        let wire = result.to_wire();
        assert_eq!(wire["items"][0]["name"], "a.txt");
        assert_eq!(wire["items"][0]["type"], "file");

        let actions = sink.actions();
        assert_eq!(actions.len(), 1);
        assert!(actions[0].success);
    }

    #[test]
    fn test_move_file_reports_rename() {
        let (dir, _sink, protocol) = fixture();
        fs::write(dir.path().join("a.txt"), "A").unwrap();
        fs::create_dir(dir.path().join("dir")).unwrap();
        fs::write(dir.path().join("dir/a.txt"), "B").unwrap();

        let result = protocol.execute(&request(
            "move_file",
            json!({ "source": "a.txt", "destination": "dir/a.txt" }),
        ));

        let wire = result.to_wire();
        assert_eq!(wire["success"], true);
        assert_eq!(wire["renamed"], true);
        assert_eq!(wire["final_path"], "dir/a (1).txt");
        assert_eq!(fs::read_to_string(dir.path().join("dir/a.txt")).unwrap(), "B");
    }

    #[test]
    fn test_strict_move_reports_conflict() {
        let (dir, _sink, protocol) = fixture();
        fs::write(dir.path().join("a.txt"), "A").unwrap();
        fs::write(dir.path().join("b.txt"), "B").unwrap();

        let result = protocol.execute(&request(
            "move_file",
            json!({ "source": "a.txt", "destination": "b.txt", "auto_rename": false }),
        ));

        assert_eq!(result.error_kind(), Some(ErrorKind::DestinationConflict));
        assert!(dir.path().join("a.txt").exists());
    }

    #[test]
    fn test_rejected_action_runs_nothing() {
        let (dir, sink, protocol) = fixture();
        fs::write(dir.path().join("a.txt"), "A").unwrap();

        let result = protocol.execute(&request("delete_file", json!({ "path": "a.txt" })));
        assert_eq!(result.error_kind(), Some(ErrorKind::UnauthorizedAction));
        assert!(dir.path().join("a.txt").exists());

        let result = protocol.execute(&request(
            "move_file",
            json!({ "source": "a.txt", "destination": "../a.txt" }),
        ));
        assert_eq!(result.error_kind(), Some(ErrorKind::UnauthorizedAction));
        assert!(result.message().contains("destination"));
        assert!(dir.path().join("a.txt").exists());

        assert_eq!(sink.security_events().len(), 2);
        assert_eq!(sink.summary().failed_actions, 2);
    }

    #[test]
    fn test_invalid_parameters() {
        let (_dir, _sink, protocol) = fixture();

        let result = protocol.execute(&request(
            "bulk_move_files",
            json!({ "file_patterns": "*.txt", "destination_dir": "docs" }),
        ));
        assert_eq!(result.error_kind(), Some(ErrorKind::InvalidParameters));

        let result = protocol.execute(&request("get_move_preview", json!({ "source": "a" })));
        assert_eq!(result.error_kind(), Some(ErrorKind::InvalidParameters));
    }

    #[test]
    fn test_get_file_info_and_preview() {
        let (dir, _sink, protocol) = fixture();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/a.txt"), "old").unwrap();
        fs::write(dir.path().join("a.txt"), "new").unwrap();

        let info = protocol
            .execute(&request("get_file_info", json!({ "path": "docs" })))
            .to_wire();
        assert_eq!(info["type"], "directory");
        assert_eq!(info["contents_count"], 1);

        let preview = protocol
            .execute(&request(
                "get_move_preview",
                json!({ "source": "a.txt", "destination": "docs/a.txt" }),
            ))
            .to_wire();
        assert_eq!(preview["preview"]["conflict"], true);
        assert_eq!(preview["preview"]["auto_rename_to"], "docs/a (1).txt");
        assert!(dir.path().join("a.txt").exists());
    }

    #[test]
    fn test_directory_lifecycle() {
        let (dir, _sink, protocol) = fixture();

        let created = protocol.execute(&request("create_directory", json!({ "path": "x/y" })));
        assert!(created.is_success());

        let again = protocol.execute(&request("create_directory", json!({ "path": "x/y" })));
        assert_eq!(again.error_kind(), Some(ErrorKind::AlreadyExists));

        let renamed = protocol.execute(&request(
            "rename_file",
            json!({ "old_name": "x/y", "new_name": "x/z" }),
        ));
        assert_eq!(renamed.to_wire()["final_path"], "x/z");

        let removed = protocol.execute(&request("remove_empty_directory", json!({ "path": "x/z" })));
        assert!(removed.is_success());
        assert!(!dir.path().join("x/z").exists());

        // x became empty once its only child was removed
        let parent = protocol.execute(&request("remove_empty_directory", json!({ "path": "x" })));
        assert!(parent.is_success());
    }

    #[test]
    fn test_bulk_move_summary() {
        let (dir, _sink, protocol) = fixture();
        fs::write(dir.path().join("a.log"), "a").unwrap();
        fs::write(dir.path().join("b.log"), "b").unwrap();

        let wire = protocol
            .execute(&request(
                "bulk_move_files",
                json!({ "file_patterns": ["*.log"], "destination_dir": "logs" }),
            ))
            .to_wire();

        assert_eq!(wire["summary"]["matched"], 2);
        assert_eq!(wire["summary"]["moved"], 2);
        assert_eq!(wire["moved_files"].as_array().unwrap().len(), 2);
        assert_eq!(wire["message"], "Moved 2 files, renamed 0 to avoid conflicts, 0 errors");
    }
}
