//! TidyFS Core Library
//!
//! This crate provides the safe mutation core of TidyFS, an agent-driven
//! file organizer:
//! - Path confinement to a single sandbox root
//! - Conflict-safe moves, renames and pattern-driven bulk moves
//! - Directory listing, creation, inspection and empty-directory removal
//! - Allowlist/denylist validation with structured security events
//! - Parsing and dispatch of agent-issued action requests
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     tidyfs-core                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  protocol/     - Reply parsing, dispatch, session history   │
//! │  safety/       - Validator, audit sinks                     │
//! │  sandbox/      - Resolver, mover, directories, bulk moves   │
//! │  types/        - Shared type definitions, settings          │
//! │  error.rs      - Error types                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! All operations are synchronous and re-read the live filesystem on every
//! call.

pub mod error;
pub mod protocol;
pub mod safety;
pub mod sandbox;
pub mod types;

// Re-export commonly used types
pub use error::{Error, ErrorKind, Result};
pub use types::*;

pub use protocol::{
    parse_agent_reply, ActionRequestProtocol, AgentReply, ConversationHistory, HistoryEntry,
    Role, Session, TurnOutcome,
};

pub use safety::{
    AuditSink, MemoryAuditSink, SafetyValidator, SessionSummary, TracingAuditSink,
    ALLOWED_ACTIONS,
};

pub use sandbox::{BulkMover, ConflictSafeMover, DirectoryOperations, SandboxResolver};
