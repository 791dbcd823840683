//! Safety layer
//!
//! Allowlist and denylist validation of roots, action requests and agent
//! text, plus the audit sinks that receive security events.

mod audit;
mod validator;

#[cfg(test)]
pub use audit::MockAuditSink;
pub use audit::{AuditSink, MemoryAuditSink, SessionSummary, TracingAuditSink};
pub use validator::{SafetyValidator, ALLOWED_ACTIONS};
