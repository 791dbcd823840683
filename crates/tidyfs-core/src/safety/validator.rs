//! Denylist/allowlist gate applied before anything touches the filesystem

use super::audit::AuditSink;
use crate::error::SafetyError;
use crate::sandbox::SandboxResolver;
use crate::types::*;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Action names the validator lets through
pub const ALLOWED_ACTIONS: [&str; 9] = [
    "list_directory",
    "move_file",
    "move_directory",
    "rename_file",
    "create_directory",
    "remove_empty_directory",
    "get_file_info",
    "get_move_preview",
    "bulk_move_files",
];

const DANGEROUS_PATTERN_SOURCES: [&str; 8] = [
    r"\.\./",          // parent traversal
    r"\.\.\\",         // parent traversal (Windows)
    r"[;|&`$]",        // shell metacharacters
    r"rm\s+-rf",
    r"del\s+/[sq]",
    r"format\s+[a-z]:",
    r"\bsudo\b",
    r"chmod\s+777",
];

static DANGEROUS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    DANGEROUS_PATTERN_SOURCES
        .iter()
        .filter_map(|p| RegexBuilder::new(p).case_insensitive(true).build().ok())
        .collect()
});

#[cfg(not(windows))]
const PROTECTED_PREFIXES: &[&str] = &[
    "/bin", "/sbin", "/usr/bin", "/usr/sbin", "/etc", "/sys", "/proc", "/dev", "/boot",
    "/private/etc",
];

#[cfg(windows)]
const PROTECTED_PREFIXES: &[&str] = &[
    "C:\\Windows",
    "C:\\Program Files",
    "C:\\Program Files (x86)",
    "C:\\System32",
];

/// Substrings that mark a destination as a system file
const SYSTEM_FILE_MARKERS: &[&str] = &[
    "system32", "windows", "program files", "boot.ini", "ntldr", "autoexec.bat", "config.sys",
    "pagefile.sys", "hiberfil.sys", "/etc/", "/bin/", "/sbin/", "/usr/bin/", "/usr/sbin/",
    "/boot/", "/sys/", "/proc/", "/dev/",
];

const PREVIEW_CHARS: usize = 200;

/// Validates roots, action requests and agent text against fixed rules.
///
/// Every rejection or flag is reported to the audit sink as a
/// [`SecurityEvent`]; the validator itself never mutates anything.
pub struct SafetyValidator {
    sink: Arc<dyn AuditSink>,
    extra_protected_prefixes: Vec<String>,
    max_user_text_length: usize,
}

impl SafetyValidator {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self::with_settings(sink, &OrganizerSettings::default())
    }

    pub fn with_settings(sink: Arc<dyn AuditSink>, settings: &OrganizerSettings) -> Self {
        Self {
            sink,
            extra_protected_prefixes: settings.extra_protected_prefixes.clone(),
            max_user_text_length: settings.max_user_text_length,
        }
    }

    /// Accept only existing, non-system directories as a sandbox root
    pub fn validate_root_path(&self, root: &str) -> bool {
        let requested = Path::new(root);
        let canonical = match requested.canonicalize() {
            Ok(p) => p,
            Err(e) => {
                error!("Root path does not exist: {} ({})", root, e);
                self.emit(
                    SecurityEventType::InvalidRootPath,
                    Severity::Error,
                    json!({ "path": root, "reason": e.to_string() }),
                );
                return false;
            }
        };

        if !canonical.is_dir() {
            error!("Root path is not a directory: {}", root);
            self.emit(
                SecurityEventType::InvalidRootPath,
                Severity::Error,
                json!({ "path": root, "reason": "not a directory" }),
            );
            return false;
        }

        let is_filesystem_root = canonical.parent().is_none();
        if is_filesystem_root
            || self.is_protected(requested)
            || self.is_protected(&canonical)
        {
            error!("Cannot operate in system directory: {}", root);
            self.emit(
                SecurityEventType::BlockedSystemDirectory,
                Severity::Critical,
                json!({ "path": root, "resolved_path": canonical.to_string_lossy() }),
            );
            return false;
        }

        if contains_dangerous_pattern(&canonical.to_string_lossy()) {
            error!("Root path contains dangerous patterns: {}", root);
            self.emit(
                SecurityEventType::DangerousPathPattern,
                Severity::Error,
                json!({ "path": root }),
            );
            return false;
        }

        info!("Root path validation successful: {}", root);
        true
    }

    /// Confinement plus denylist check for one path
    pub fn validate_file_path(&self, path: &str, resolver: &SandboxResolver) -> bool {
        if let Err(e) = resolver.resolve(path) {
            error!("Path outside root directory: {}", path);
            self.emit(
                SecurityEventType::PathTraversalAttempt,
                Severity::Error,
                json!({
                    "attempted_path": path,
                    "root_path": resolver.root().to_string_lossy(),
                    "reason": e.to_string(),
                }),
            );
            return false;
        }

        if contains_dangerous_pattern(path) {
            error!("File path contains dangerous patterns: {}", path);
            self.emit(
                SecurityEventType::DangerousFilePattern,
                Severity::Error,
                json!({ "path": path }),
            );
            return false;
        }

        true
    }

    /// Boolean form of [`check_action`](Self::check_action)
    pub fn validate_action(&self, action: &str, parameters: &Parameters) -> bool {
        self.check_action(action, parameters).is_ok()
    }

    /// Check an action request, returning the first rule it breaks
    pub fn check_action(&self, action: &str, parameters: &Parameters) -> Result<(), SafetyError> {
        if !ALLOWED_ACTIONS.contains(&action) {
            error!("Unauthorized action attempted: {}", action);
            self.emit(
                SecurityEventType::UnauthorizedAction,
                Severity::Error,
                json!({ "action": action, "parameters": parameters }),
            );
            return Err(SafetyError::UnauthorizedAction(action.to_string()));
        }

        for (key, value) in parameters {
            if let Some(hit) = dangerous_string(value) {
                error!("Dangerous pattern in parameter {}: {}", key, hit);
                self.emit(
                    SecurityEventType::DangerousParameter,
                    Severity::Error,
                    json!({ "action": action, "parameter": key, "value": hit }),
                );
                return Err(SafetyError::DangerousPatternDetected {
                    parameter: key.clone(),
                    value: hit.to_string(),
                });
            }
        }

        let destination = match action.parse::<ActionKind>() {
            Ok(kind) if kind.is_relocation() => {
                let source = string_param(parameters, &["source", "old_name"]);
                let destination = string_param(parameters, &["destination", "new_name"]);
                match (source, destination) {
                    (Some(_), Some(destination)) => Some(destination),
                    _ => {
                        warn!("Missing required parameters for {}", action);
                        self.emit(
                            SecurityEventType::MissingParameters,
                            Severity::Warning,
                            json!({ "action": action, "parameters": parameters }),
                        );
                        return Err(SafetyError::MissingParameters(action.to_string()));
                    }
                }
            }
            Ok(ActionKind::BulkMoveFiles) => string_param(parameters, &["destination_dir"]),
            _ => None,
        };

        if let Some(destination) = destination {
            if is_system_file(destination) {
                error!("Attempt to modify system file: {}", destination);
                self.emit(
                    SecurityEventType::SystemFileModificationAttempt,
                    Severity::Critical,
                    json!({ "action": action, "target": destination }),
                );
                return Err(SafetyError::ProtectedSystemPath(destination.to_string()));
            }
        }

        debug!("Action {} passed validation", action);
        Ok(())
    }

    /// Audit agent text. Always returns `true`; suspicious or oversized text
    /// is only recorded.
    pub fn validate_user_text(&self, text: &str) -> bool {
        let preview: String = text.chars().take(PREVIEW_CHARS).collect();

        if contains_dangerous_pattern(text) {
            warn!("User input contains suspicious patterns: {}...", preview);
            self.emit(
                SecurityEventType::SuspiciousUserInput,
                Severity::Warning,
                json!({ "input_preview": preview }),
            );
        }

        let length = text.chars().count();
        if length > self.max_user_text_length {
            warn!("Unusually long user input: {} characters", length);
            self.emit(
                SecurityEventType::LongUserInput,
                Severity::Warning,
                json!({ "length": length, "preview": preview }),
            );
        }

        true
    }

    pub fn safety_report(&self) -> SafetyReport {
        SafetyReport {
            dangerous_patterns_count: DANGEROUS_PATTERNS.len(),
            system_directories_protected: PROTECTED_PREFIXES.len()
                + self.extra_protected_prefixes.len(),
            validation_active: true,
            features: [
                "Path traversal protection",
                "System directory protection",
                "Dangerous pattern detection",
                "Action validation",
                "User input auditing",
                "Security event logging",
            ]
            .iter()
            .map(|f| f.to_string())
            .collect(),
        }
    }

    fn is_protected(&self, path: &Path) -> bool {
        let candidate = normalize_for_prefix(&path.to_string_lossy());
        let under = |prefix: &str| {
            let prefix = normalize_for_prefix(prefix);
            candidate == prefix || candidate.starts_with(&format!("{}/", prefix))
        };
        PROTECTED_PREFIXES.iter().any(|p| under(p))
            || self.extra_protected_prefixes.iter().any(|p| under(p))
    }

    fn emit(&self, event_type: SecurityEventType, severity: Severity, details: Value) {
        let details = match details {
            Value::Object(map) => map,
            other => {
                let mut map = Parameters::new();
                map.insert("details".to_string(), other);
                map
            }
        };
        self.sink
            .record_security_event(SecurityEvent::new(event_type, severity, details));
    }
}

fn contains_dangerous_pattern(text: &str) -> bool {
    DANGEROUS_PATTERNS.iter().any(|p| p.is_match(text))
}

/// First string inside `value` (searching arrays and objects) that trips the denylist
fn dangerous_string(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) if contains_dangerous_pattern(s) => Some(s.as_str()),
        Value::Array(items) => items.iter().find_map(dangerous_string),
        Value::Object(map) => map.values().find_map(dangerous_string),
        _ => None,
    }
}

fn string_param<'a>(parameters: &'a Parameters, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| parameters.get(*k).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
}

fn is_system_file(path: &str) -> bool {
    let lower = path.to_lowercase().replace('\\', "/");
    SYSTEM_FILE_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Lowercased, `/`-separated, without verbatim prefix or trailing separator
fn normalize_for_prefix(path: &str) -> String {
    let unified = path.replace('\\', "/").to_lowercase();
    let stripped = unified.strip_prefix("//?/").unwrap_or(&unified);
    let trimmed = stripped.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
