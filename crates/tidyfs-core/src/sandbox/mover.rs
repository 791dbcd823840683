//! Conflict-safe moves and renames

use super::resolver::SandboxResolver;
use crate::error::{Error, Result, SandboxError};
use crate::types::{EntryKind, MoveOutcome, MovePreview, DEFAULT_MAX_RENAME_ATTEMPTS};
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

#[cfg(unix)]
const CROSS_DEVICE_ERROR: i32 = 18; // EXDEV
#[cfg(windows)]
const CROSS_DEVICE_ERROR: i32 = 17; // ERROR_NOT_SAME_DEVICE
#[cfg(not(any(unix, windows)))]
const CROSS_DEVICE_ERROR: i32 = -1;

/// Random-suffix attempts after the timestamp fallback is taken
const FALLBACK_ATTEMPTS: usize = 8;

/// Moves and renames entries under the sandbox root without ever
/// overwriting an existing destination.
///
/// On conflict, auto-rename picks `name (1).ext`, `name (2).ext`, ... up to
/// `max_rename_attempts`, then `name_<unix-seconds>.ext`, then that name with
/// a short random tag. Directories take the suffix after the full name.
#[derive(Debug, Clone)]
pub struct ConflictSafeMover {
    resolver: SandboxResolver,
    max_rename_attempts: u32,
}

impl ConflictSafeMover {
    pub fn new(resolver: SandboxResolver) -> Self {
        Self {
            resolver,
            max_rename_attempts: DEFAULT_MAX_RENAME_ATTEMPTS,
        }
    }

    pub fn with_max_rename_attempts(mut self, attempts: u32) -> Self {
        self.max_rename_attempts = attempts.max(1);
        self
    }

    pub fn resolver(&self) -> &SandboxResolver {
        &self.resolver
    }

    /// Move a file; fails with `KindMismatch` for directories
    pub fn move_file(
        &self,
        source: &str,
        destination: &str,
        auto_rename: bool,
    ) -> Result<MoveOutcome> {
        self.relocate(source, destination, Some(EntryKind::File), auto_rename)
    }

    /// Move a directory; fails with `KindMismatch` for files
    pub fn move_directory(
        &self,
        source: &str,
        destination: &str,
        auto_rename: bool,
    ) -> Result<MoveOutcome> {
        self.relocate(source, destination, Some(EntryKind::Directory), auto_rename)
    }

    /// Rename a file or directory. Never auto-renames.
    pub fn rename(&self, old_name: &str, new_name: &str) -> Result<MoveOutcome> {
        self.relocate(old_name, new_name, None, false)
    }

    /// Report what a move would do without touching the filesystem
    pub fn preview(&self, source: &str, destination: &str) -> Result<MovePreview> {
        let src = self.resolver.resolve(source)?;
        let dst = self.resolver.resolve(destination)?;

        let kind = source_kind(&src, source)?;
        let existing = existing_kind(&dst);
        let safe = check_relocation(&self.resolver, &src, &dst, kind).is_ok();

        let missing_parent = dst.parent().filter(|p| !p.exists());
        let auto_rename_to = match existing {
            Some(_) if safe => Some(self.resolver.relative(&self.alternate_path(&dst, kind)?)?),
            _ => None,
        };

        Ok(MovePreview {
            source: source.to_string(),
            destination: destination.to_string(),
            source_type: kind,
            will_create_dirs: missing_parent.is_some(),
            conflict: existing.is_some(),
            safe,
            conflict_type: existing,
            auto_rename_to,
            dirs_to_create: missing_parent
                .map(|p| self.resolver.relative(p))
                .transpose()?,
        })
    }

    fn relocate(
        &self,
        source: &str,
        destination: &str,
        expected: Option<EntryKind>,
        auto_rename: bool,
    ) -> Result<MoveOutcome> {
        let src = self.resolver.resolve(source)?;
        let intended = self.resolver.resolve(destination)?;

        let kind = source_kind(&src, source)?;
        if let Some(expected) = expected {
            if kind != expected {
                return Err(Error::Sandbox(SandboxError::KindMismatch {
                    path: source.to_string(),
                    expected: expected.to_string(),
                    actual: kind.to_string(),
                }));
            }
        }
        check_relocation(&self.resolver, &src, &intended, kind)?;

        debug!("Moving {:?} to {:?}", src, intended);

        let final_path = if entry_exists(&intended) {
            if !auto_rename {
                return Err(Error::Sandbox(SandboxError::DestinationConflict(
                    destination.to_string(),
                )));
            }
            let alternate = self.alternate_path(&intended, kind)?;
            warn!(
                "Destination {:?} exists, auto-renamed to {:?}",
                intended, alternate
            );
            alternate
        } else {
            intended.clone()
        };

        if let Some(parent) = final_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        transfer(&src, &final_path, kind).map_err(|e| {
            error!("Failed to move {:?} to {:?}: {}", src, final_path, e);
            e
        })?;

        let outcome = MoveOutcome {
            source: self.resolver.relative(&src)?,
            intended_destination: self.resolver.relative(&intended)?,
            final_destination: self.resolver.relative(&final_path)?,
            kind,
            renamed: final_path != intended,
        };

        info!(
            "Moved {} {} -> {}{}",
            kind,
            outcome.source,
            outcome.final_destination,
            if outcome.renamed { " (renamed to avoid overwrite)" } else { "" }
        );

        Ok(outcome)
    }

    /// First unused alternate name next to `taken`
    fn alternate_path(&self, taken: &Path, kind: EntryKind) -> Result<PathBuf> {
        let parent = taken.parent().ok_or_else(|| {
            Error::Sandbox(SandboxError::InvalidPath(taken.to_string_lossy().to_string()))
        })?;
        let name = taken
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let (stem, extension) = split_name(&name, kind);

        for n in 1..=self.max_rename_attempts {
            let candidate = parent.join(format!("{} ({}){}", stem, n, extension));
            if !entry_exists(&candidate) {
                return Ok(candidate);
            }
        }

        let timestamp = chrono::Utc::now().timestamp();
        let candidate = parent.join(format!("{}_{}{}", stem, timestamp, extension));
        if !entry_exists(&candidate) {
            return Ok(candidate);
        }

        for _ in 0..FALLBACK_ATTEMPTS {
            let tag = uuid::Uuid::new_v4().simple().to_string();
            let candidate = parent.join(format!("{}_{}_{}{}", stem, timestamp, &tag[..8], extension));
            if !entry_exists(&candidate) {
                return Ok(candidate);
            }
        }

        Err(Error::Sandbox(SandboxError::RenameExhausted(name)))
    }
}

/// Split a name into the part the counter follows and the part it precedes
fn split_name(name: &str, kind: EntryKind) -> (String, String) {
    if kind == EntryKind::Directory {
        return (name.to_string(), String::new());
    }

    let path = Path::new(name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => (
            stem.to_string_lossy().to_string(),
            format!(".{}", ext.to_string_lossy()),
        ),
        _ => (name.to_string(), String::new()),
    }
}

fn entry_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

fn existing_kind(path: &Path) -> Option<EntryKind> {
    fs::metadata(path)
        .or_else(|_| fs::symlink_metadata(path))
        .ok()
        .map(|m| EntryKind::of(&m))
}

fn source_kind(src: &Path, source: &str) -> Result<EntryKind> {
    fs::metadata(src)
        .map(|m| EntryKind::of(&m))
        .map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Error::Sandbox(SandboxError::SourceNotFound(source.to_string()))
            } else {
                Error::Io(e)
            }
        })
}

fn check_relocation(
    resolver: &SandboxResolver,
    src: &Path,
    dst: &Path,
    kind: EntryKind,
) -> Result<()> {
    let invalid = |reason: &str| -> Result<()> {
        Err(Error::Sandbox(SandboxError::InvalidPath(reason.to_string())))
    };

    if resolver.is_root(src) {
        return invalid("the sandbox root cannot be moved");
    }
    if resolver.is_root(dst) {
        return invalid("the sandbox root cannot be a destination");
    }
    if src == dst {
        return invalid("source and destination are the same");
    }
    if kind == EntryKind::Directory && dst.starts_with(src) {
        return invalid("a directory cannot be moved into itself");
    }
    Ok(())
}

/// Move in one step, falling back to a verified copy across devices
fn transfer(src: &Path, dst: &Path, kind: EntryKind) -> Result<()> {
    let moved = match kind {
        EntryKind::File => link_then_unlink(src, dst),
        EntryKind::Directory => fs::rename(src, dst),
    };

    match moved {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(CROSS_DEVICE_ERROR) => {
            warn!("Cross-device move of {:?}, copying with verification", src);
            copy_verified(src, dst, kind)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            warn!("Destination {:?} appeared before the move", dst);
            Err(claim_error(dst, e))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound && !entry_exists(src) => Err(
            Error::Sandbox(SandboxError::SourceNotFound(src.to_string_lossy().to_string())),
        ),
        Err(e) => Err(Error::Io(e)),
    }
}

/// Place a file at `dst` without replacing an entry that is already there.
///
/// `hard_link` refuses an existing `dst`, unlike `rename` on Unix. Filesystems
/// without hard links fall back to a plain rename.
fn link_then_unlink(src: &Path, dst: &Path) -> io::Result<()> {
    match fs::hard_link(src, dst) {
        Ok(()) => fs::remove_file(src).map_err(|e| {
            if let Err(undo) = fs::remove_file(dst) {
                error!("Failed to remove link {:?}: {}", dst, undo);
            }
            e
        }),
        Err(e)
            if e.kind() == io::ErrorKind::AlreadyExists
                || e.kind() == io::ErrorKind::NotFound
                || e.raw_os_error() == Some(CROSS_DEVICE_ERROR) =>
        {
            Err(e)
        }
        Err(e) => {
            debug!("Hard link unavailable for {:?} ({}), renaming", src, e);
            fs::rename(src, dst)
        }
    }
}

/// Copy `src` to a freshly created `dst`, verify every file by hash, and only
/// then remove `src`. On failure the partial copy is removed and `src` is
/// left untouched.
fn copy_verified(src: &Path, dst: &Path, kind: EntryKind) -> Result<()> {
    let copied = match kind {
        EntryKind::File => {
            let target = create_new_file(dst)?;
            copy_file_contents(src, dst, target)
        }
        EntryKind::Directory => {
            fs::create_dir(dst).map_err(|e| claim_error(dst, e))?;
            copy_tree(src, dst)
        }
    };

    if let Err(e) = copied {
        let cleanup = match kind {
            EntryKind::File => fs::remove_file(dst),
            EntryKind::Directory => fs::remove_dir_all(dst),
        };
        if let Err(cleanup_err) = cleanup {
            error!("Failed to remove partial copy {:?}: {}", dst, cleanup_err);
        }
        return Err(e);
    }

    match kind {
        EntryKind::File => fs::remove_file(src)?,
        EntryKind::Directory => fs::remove_dir_all(src)?,
    }
    Ok(())
}

fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| Error::Sandbox(SandboxError::InvalidPath(
                entry.path().to_string_lossy().to_string(),
            )))?;
        let target = dst.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir(&target)?;
        } else if file_type.is_file() {
            let file = create_new_file(&target)?;
            copy_file_contents(entry.path(), &target, file)?;
        } else {
            return Err(Error::Sandbox(SandboxError::InvalidPath(format!(
                "cannot copy special entry across devices: {}",
                entry.path().to_string_lossy()
            ))));
        }
    }
    Ok(())
}

fn create_new_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| claim_error(path, e))
}

fn claim_error(path: &Path, e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::AlreadyExists {
        Error::Sandbox(SandboxError::DestinationConflict(
            path.to_string_lossy().to_string(),
        ))
    } else {
        Error::Io(e)
    }
}

fn copy_file_contents(src: &Path, dst: &Path, mut target: File) -> Result<()> {
    let mut source = File::open(src)?;
    io::copy(&mut source, &mut target)?;
    target.sync_all()?;

    if compute_file_hash(src)? != compute_file_hash(dst)? {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("copy of {:?} does not match its source", src),
        )));
    }
    Ok(())
}

/// Compute SHA256 hash of a file
pub(crate) fn compute_file_hash(path: impl AsRef<Path>) -> Result<String> {
    let mut file = File::open(path.as_ref())?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;
    use tempfile::tempdir;

    fn fixture() -> (tempfile::TempDir, ConflictSafeMover) {
        let dir = tempdir().unwrap();
        let resolver = SandboxResolver::new(dir.path()).unwrap();
        (dir, ConflictSafeMover::new(resolver))
    }

    fn root(mover: &ConflictSafeMover) -> PathBuf {
        mover.resolver().root().to_path_buf()
    }

    #[test]
    fn test_move_file_plain() {
        let (_dir, mover) = fixture();
        let root = root(&mover);
        fs::write(root.join("a.txt"), "A").unwrap();

        let outcome = mover.move_file("a.txt", "archive/2024/a.txt", false).unwrap();
        assert_eq!(
            outcome,
            MoveOutcome {
                source: "a.txt".into(),
                intended_destination: "archive/2024/a.txt".into(),
                final_destination: "archive/2024/a.txt".into(),
                kind: EntryKind::File,
                renamed: false,
            }
        );
        assert!(!root.join("a.txt").exists());
        assert_eq!(fs::read_to_string(root.join("archive/2024/a.txt")).unwrap(), "A");
    }

    #[test]
    fn test_move_file_auto_renames_without_overwrite() {
        let (_dir, mover) = fixture();
        let root = root(&mover);
        fs::write(root.join("a.txt"), "A").unwrap();
        fs::create_dir(root.join("dir")).unwrap();
        fs::write(root.join("dir/a.txt"), "B").unwrap();

        let outcome = mover.move_file("a.txt", "dir/a.txt", true).unwrap();
        assert!(outcome.renamed);
        assert_eq!(outcome.final_destination, "dir/a (1).txt");
        assert_eq!(fs::read_to_string(root.join("dir/a.txt")).unwrap(), "B");
        assert_eq!(fs::read_to_string(root.join("dir/a (1).txt")).unwrap(), "A");
    }

    #[test]
    fn test_strict_conflict_leaves_everything_in_place() {
        let (_dir, mover) = fixture();
        let root = root(&mover);
        fs::write(root.join("a.txt"), "A").unwrap();
        fs::write(root.join("b.txt"), "B").unwrap();

        let err = mover.move_file("a.txt", "b.txt", false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DestinationConflict);
        assert_eq!(fs::read_to_string(root.join("a.txt")).unwrap(), "A");
        assert_eq!(fs::read_to_string(root.join("b.txt")).unwrap(), "B");
    }

    #[test]
    fn test_sequential_conflicts_are_distinct() {
        let (_dir, mover) = fixture();
        let root = root(&mover);
        fs::write(root.join("report.pdf"), "original").unwrap();

        let mut finals = HashSet::new();
        for i in 0..5 {
            let name = format!("incoming{}.pdf", i);
            fs::write(root.join(&name), i.to_string()).unwrap();
            let outcome = mover.move_file(&name, "report.pdf", true).unwrap();
            assert_eq!(outcome.final_destination, format!("report ({}).pdf", i + 1));
            assert!(finals.insert(outcome.final_destination));
        }
        assert_eq!(fs::read_to_string(root.join("report.pdf")).unwrap(), "original");
    }

    #[test]
    fn test_conflict_counter_falls_back_to_timestamp() {
        let (_dir, mover) = fixture();
        let mover = mover.with_max_rename_attempts(2);
        let root = root(&mover);
        fs::write(root.join("notes.md"), "0").unwrap();

        let mut finals = HashSet::new();
        for i in 1..=4 {
            let name = format!("n{}.md", i);
            fs::write(root.join(&name), i.to_string()).unwrap();
            let outcome = mover.move_file(&name, "notes.md", true).unwrap();
            assert!(outcome.renamed);
            assert!(finals.insert(outcome.final_destination.clone()));
        }

        assert!(finals.contains("notes (1).md"));
        assert!(finals.contains("notes (2).md"));
        assert_eq!(
            finals.iter().filter(|f| f.starts_with("notes_") && f.ends_with(".md")).count(),
            2
        );
        assert_eq!(fs::read_to_string(root.join("notes.md")).unwrap(), "0");
    }

    #[test]
    fn test_directory_suffix_after_full_name() {
        let (_dir, mover) = fixture();
        let root = root(&mover);
        fs::create_dir_all(root.join("photos.2023")).unwrap();
        fs::write(root.join("photos.2023/a.jpg"), "a").unwrap();
        fs::create_dir_all(root.join("archive/photos.2023")).unwrap();

        let outcome = mover
            .move_directory("photos.2023", "archive/photos.2023", true)
            .unwrap();
        assert_eq!(outcome.final_destination, "archive/photos.2023 (1)");
        assert!(root.join("archive/photos.2023 (1)/a.jpg").exists());
        assert!(fs::read_dir(root.join("archive/photos.2023")).unwrap().next().is_none());
    }

    #[test]
    fn test_kind_mismatch() {
        let (_dir, mover) = fixture();
        let root = root(&mover);
        fs::write(root.join("a.txt"), "A").unwrap();
        fs::create_dir(root.join("docs")).unwrap();

        let err = mover.move_directory("a.txt", "b.txt", true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KindMismatch);
        let err = mover.move_file("docs", "docs2", true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KindMismatch);
        assert!(root.join("a.txt").exists());
        assert!(root.join("docs").is_dir());
    }

    #[test]
    fn test_missing_source() {
        let (_dir, mover) = fixture();
        let err = mover.move_file("ghost.txt", "x.txt", true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceNotFound);
    }

    #[test]
    fn test_outside_root_fails_before_mutation() {
        let (_dir, mover) = fixture();
        let root = root(&mover);
        fs::write(root.join("a.txt"), "A").unwrap();

        let err = mover.move_file("a.txt", "../escaped.txt", true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathOutsideRoot);
        assert!(root.join("a.txt").exists());
    }

    #[test]
    fn test_invalid_relocations() {
        let (_dir, mover) = fixture();
        let root = root(&mover);
        fs::create_dir_all(root.join("docs/inner")).unwrap();
        fs::write(root.join("a.txt"), "A").unwrap();

        for (src, dst) in [("docs", "docs/inner/docs"), ("", "elsewhere"), ("docs", ".")] {
            let err = mover.rename(src, dst).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidPath, "{src} -> {dst}");
        }
        let err = mover.move_file("a.txt", "a.txt", true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPath);
        assert!(root.join("docs/inner").is_dir());
    }

    #[test]
    fn test_rename_is_strict_for_both_kinds() {
        let (_dir, mover) = fixture();
        let root = root(&mover);
        fs::write(root.join("old.txt"), "A").unwrap();
        fs::write(root.join("taken.txt"), "B").unwrap();
        fs::create_dir(root.join("folder")).unwrap();

        let err = mover.rename("old.txt", "taken.txt").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DestinationConflict);

        let outcome = mover.rename("folder", "renamed folder").unwrap();
        assert_eq!(outcome.kind, EntryKind::Directory);
        assert!(root.join("renamed folder").is_dir());
    }

    #[test]
    fn test_preview_reports_conflict_without_mutating() {
        let (_dir, mover) = fixture();
        let root = root(&mover);
        fs::write(root.join("a.txt"), "A").unwrap();
        fs::create_dir(root.join("dir")).unwrap();
        fs::write(root.join("dir/a.txt"), "B").unwrap();

        let preview = mover.preview("a.txt", "dir/a.txt").unwrap();
        assert_eq!(
            preview,
            MovePreview {
                source: "a.txt".into(),
                destination: "dir/a.txt".into(),
                source_type: EntryKind::File,
                will_create_dirs: false,
                conflict: true,
                safe: true,
                conflict_type: Some(EntryKind::File),
                auto_rename_to: Some("dir/a (1).txt".into()),
                dirs_to_create: None,
            }
        );
        assert!(root.join("a.txt").exists());
        assert!(!root.join("dir/a (1).txt").exists());

        let preview = mover.preview("a.txt", "new/deep/a.txt").unwrap();
        assert!(preview.will_create_dirs);
        assert!(!preview.conflict);
        assert_eq!(preview.dirs_to_create.as_deref(), Some("new/deep"));
        assert!(!root.join("new").exists());
    }

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("a.txt", EntryKind::File), ("a".into(), ".txt".into()));
        assert_eq!(
            split_name("archive.tar.gz", EntryKind::File),
            ("archive.tar".into(), ".gz".into())
        );
        assert_eq!(split_name("Makefile", EntryKind::File), ("Makefile".into(), "".into()));
        assert_eq!(split_name(".bashrc", EntryKind::File), (".bashrc".into(), "".into()));
        assert_eq!(split_name("v1.2", EntryKind::Directory), ("v1.2".into(), "".into()));
    }

    #[test]
    fn test_copy_verified_file_and_tree() {
        let dir = tempdir().unwrap();
        let src_file = dir.path().join("src.bin");
        fs::write(&src_file, b"payload").unwrap();
        copy_verified(&src_file, &dir.path().join("dst.bin"), EntryKind::File).unwrap();
        assert!(!src_file.exists());
        assert_eq!(fs::read(dir.path().join("dst.bin")).unwrap(), b"payload");

        let src_tree = dir.path().join("tree");
        fs::create_dir_all(src_tree.join("nested")).unwrap();
        fs::write(src_tree.join("nested/leaf.txt"), "leaf").unwrap();
        copy_verified(&src_tree, &dir.path().join("copy"), EntryKind::Directory).unwrap();
        assert!(!src_tree.exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("copy/nested/leaf.txt")).unwrap(),
            "leaf"
        );
    }

    #[test]
    fn test_copy_verified_never_claims_existing_destination() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.txt");
        let dst = dir.path().join("dst.txt");
        fs::write(&src, "new").unwrap();
        fs::write(&dst, "old").unwrap();

        let err = copy_verified(&src, &dst, EntryKind::File).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DestinationConflict);
        assert_eq!(fs::read_to_string(&src).unwrap(), "new");
        assert_eq!(fs::read_to_string(&dst).unwrap(), "old");
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_tree_copy_removes_partial_copy() {
        let dir = tempdir().unwrap();
        let src_tree = dir.path().join("tree");
        fs::create_dir_all(src_tree.join("a")).unwrap();
        fs::write(src_tree.join("a/f.txt"), "kept").unwrap();
        fs::write(dir.path().join("target.txt"), "t").unwrap();
        std::os::unix::fs::symlink(dir.path().join("target.txt"), src_tree.join("zz_link"))
            .unwrap();

        let copy = dir.path().join("copy");
        let err = copy_verified(&src_tree, &copy, EntryKind::Directory).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidPath);
        assert_eq!(fs::read_to_string(src_tree.join("a/f.txt")).unwrap(), "kept");
        assert!(fs::symlink_metadata(src_tree.join("zz_link")).is_ok());
        assert!(!copy.exists());
    }

    #[test]
    fn test_transfer_refuses_destination_created_after_check() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("incoming.txt");
        let dst = dir.path().join("taken.txt");
        fs::write(&src, "new").unwrap();
        fs::write(&dst, "old").unwrap();

        let err = transfer(&src, &dst, EntryKind::File).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DestinationConflict);
        assert_eq!(fs::read_to_string(&src).unwrap(), "new");
        assert_eq!(fs::read_to_string(&dst).unwrap(), "old");

        fs::remove_file(&dst).unwrap();
        transfer(&src, &dst, EntryKind::File).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dst).unwrap(), "new");
    }

    #[test]
    fn test_file_hash() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("hash_test.txt");
        fs::write(&file_path, "test content").unwrap();

        let hash = compute_file_hash(&file_path).unwrap();
        assert_eq!(hash.len(), 64);
    }
}
