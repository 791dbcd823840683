//! Path confinement to the sandbox root

use crate::error::{Error, Result, SandboxError};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// Resolves agent-supplied path strings to canonical paths under a fixed root.
///
/// Resolution walks the input one component at a time against the live
/// filesystem: existing components are canonicalized (following symlinks),
/// and once a component does not exist the remainder is applied lexically.
/// The result is accepted only if it is the root or lies beneath it,
/// compared component-wise on the canonical form.
#[derive(Debug, Clone)]
pub struct SandboxResolver {
    root: PathBuf,
}

impl SandboxResolver {
    /// Create a resolver for `root`, which must be an existing directory
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let expanded = expand_home(root.as_ref());

        let root = expanded.canonicalize().map_err(|e| {
            Error::Sandbox(SandboxError::InvalidRoot(format!(
                "{}: {}",
                expanded.to_string_lossy(),
                e
            )))
        })?;

        if !root.is_dir() {
            return Err(Error::Sandbox(SandboxError::InvalidRoot(format!(
                "{} is not a directory",
                root.to_string_lossy()
            ))));
        }

        info!("Sandbox root: {:?}", root);
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `input` to an absolute path confined to the root
    pub fn resolve(&self, input: &str) -> Result<PathBuf> {
        let path = Path::new(input);
        let outside = || Error::Sandbox(SandboxError::PathOutsideRoot(input.to_string()));

        let mut current = if path.is_absolute() {
            PathBuf::new()
        } else {
            self.root.clone()
        };
        // Trailing components that do not exist; they cannot be symlinks
        let mut missing_depth = 0usize;

        for component in path.components() {
            match component {
                Component::Prefix(_) | Component::RootDir => {
                    current.push(component.as_os_str());
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    if !current.pop() {
                        return Err(outside());
                    }
                    missing_depth = missing_depth.saturating_sub(1);
                }
                Component::Normal(name) => {
                    current.push(name);
                    if missing_depth > 0 {
                        missing_depth += 1;
                        continue;
                    }
                    match std::fs::symlink_metadata(&current) {
                        Ok(_) => {
                            // A dangling symlink cannot be proven to stay inside the root
                            current = current.canonicalize().map_err(|_| outside())?;
                        }
                        Err(_) => missing_depth = 1,
                    }
                }
            }
        }

        if !current.starts_with(&self.root) {
            warn!("Rejected path outside sandbox: {:?} -> {:?}", input, current);
            return Err(outside());
        }

        debug!("Resolved {:?} -> {:?}", input, current);
        Ok(current)
    }

    /// Express a confined absolute path relative to the root, `/`-separated.
    /// The root itself is reported as `.`.
    pub fn relative(&self, path: &Path) -> Result<String> {
        let stripped = path.strip_prefix(&self.root).map_err(|_| {
            Error::Sandbox(SandboxError::PathOutsideRoot(
                path.to_string_lossy().to_string(),
            ))
        })?;

        let parts: Vec<String> = stripped
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();

        if parts.is_empty() {
            Ok(".".to_string())
        } else {
            Ok(parts.join("/"))
        }
    }

    pub fn is_root(&self, path: &Path) -> bool {
        path == self.root
    }
}

/// Expand a leading `~` to the home directory
pub(crate) fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
