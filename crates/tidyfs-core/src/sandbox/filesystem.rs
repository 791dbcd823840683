//! Directory listing, creation, inspection and empty-directory removal

use super::resolver::SandboxResolver;
use crate::error::{Error, Result, SandboxError};
use crate::types::*;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// Directory operations confined to the sandbox root.
///
/// Nothing here deletes content: removal is limited to empty directories.
#[derive(Debug, Clone)]
pub struct DirectoryOperations {
    resolver: SandboxResolver,
}

impl DirectoryOperations {
    pub fn new(resolver: SandboxResolver) -> Self {
        Self { resolver }
    }

    /// List immediate children, directories first, then by name
    pub fn list(&self, path: &str) -> Result<Vec<FileSystemEntry>> {
        let target = self.resolver.resolve(path)?;
        self.require_directory(&target, path)?;

        debug!("Listing directory: {:?}", target);

        let mut entries = Vec::new();
        for entry in fs::read_dir(&target)? {
            let entry = entry?;
            let entry_path = entry.path();
            // Follow symlinks for the kind; fall back to the link itself
            let metadata = match fs::metadata(&entry_path) {
                Ok(m) => m,
                Err(_) => entry.metadata()?,
            };

            entries.push(FileSystemEntry::from_metadata(
                entry.file_name().to_string_lossy().to_string(),
                self.resolver.relative(&entry_path)?,
                &entry_path,
                &metadata,
            ));
        }

        entries.sort_by(|a, b| match (a.kind, b.kind) {
            (EntryKind::Directory, EntryKind::File) => std::cmp::Ordering::Less,
            (EntryKind::File, EntryKind::Directory) => std::cmp::Ordering::Greater,
            _ => a
                .name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name)),
        });

        info!("Listed directory: {} ({} entries)", path, entries.len());
        Ok(entries)
    }

    /// Create a directory and any missing parents.
    ///
    /// Not idempotent: an existing entry at `path` fails with `AlreadyExists`.
    pub fn create_directory(&self, path: &str) -> Result<FileSystemEntry> {
        let target = self.resolver.resolve(path)?;

        if fs::symlink_metadata(&target).is_ok() {
            return Err(Error::Sandbox(SandboxError::AlreadyExists(path.to_string())));
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::create_dir(&target).map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                Error::Sandbox(SandboxError::AlreadyExists(path.to_string()))
            } else {
                Error::Io(e)
            }
        })?;

        info!("Created directory: {:?}", target);
        self.entry(&target)
    }

    /// Remove a directory only if it has no entries at all
    pub fn remove_empty_directory(&self, path: &str) -> Result<()> {
        let target = self.resolver.resolve(path)?;
        self.require_directory(&target, path)?;

        if self.resolver.is_root(&target) {
            return Err(Error::Sandbox(SandboxError::InvalidPath(
                "the sandbox root cannot be removed".to_string(),
            )));
        }

        if fs::read_dir(&target)?.next().is_some() {
            return Err(Error::Sandbox(SandboxError::DirectoryNotEmpty(path.to_string())));
        }

        // remove_dir refuses non-empty directories, so a concurrent write still cannot be lost
        fs::remove_dir(&target).map_err(|e| {
            let now_populated = fs::read_dir(&target)
                .map(|mut entries| entries.next().is_some())
                .unwrap_or(false);
            if now_populated {
                Error::Sandbox(SandboxError::DirectoryNotEmpty(path.to_string()))
            } else {
                Error::Io(e)
            }
        })?;

        info!("Removed empty directory: {:?}", target);
        Ok(())
    }

    /// Entry metadata plus, for directories, the immediate-child count
    pub fn get_info(&self, path: &str) -> Result<EntryInfo> {
        let target = self.resolver.resolve(path)?;
        let entry = self.entry(&target).map_err(|e| match e {
            Error::Io(io_err) if io_err.kind() == io::ErrorKind::NotFound => {
                Error::Sandbox(SandboxError::NotFound(path.to_string()))
            }
            other => other,
        })?;

        let contents_count = if entry.kind == EntryKind::Directory {
            Some(match fs::read_dir(&target) {
                Ok(children) => ChildCount::Count(children.count()),
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                    ChildCount::Unavailable("Permission denied".to_string())
                }
                Err(e) => ChildCount::Unavailable(e.to_string()),
            })
        } else {
            None
        };

        Ok(EntryInfo {
            entry,
            contents_count,
        })
    }

    fn entry(&self, target: &Path) -> Result<FileSystemEntry> {
        let metadata = fs::metadata(target)?;
        let name = if self.resolver.is_root(target) {
            ".".to_string()
        } else {
            target
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default()
        };

        Ok(FileSystemEntry::from_metadata(
            name,
            self.resolver.relative(target)?,
            target,
            &metadata,
        ))
    }

    fn require_directory(&self, target: &Path, path: &str) -> Result<()> {
        match fs::metadata(target) {
            Ok(m) if m.is_dir() => Ok(()),
            Ok(_) => Err(Error::Sandbox(SandboxError::NotADirectory(path.to_string()))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(Error::Sandbox(SandboxError::NotFound(path.to_string())))
            }
            Err(e) => Err(Error::Io(e)),
        }
    }
}
