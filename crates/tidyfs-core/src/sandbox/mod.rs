//! File system sandbox
//!
//! This module provides:
//! - Path confinement to a fixed root
//! - Conflict-safe moves and renames
//! - Directory listing, creation, inspection and empty-directory removal
//! - Pattern-driven bulk moves

mod bulk;
mod filesystem;
mod mover;
mod resolver;

pub use bulk::BulkMover;
pub use filesystem::DirectoryOperations;
pub use mover::ConflictSafeMover;
pub use resolver::SandboxResolver;
pub(crate) use resolver::expand_home;
