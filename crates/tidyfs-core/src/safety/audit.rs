//! Audit sinks for security events and action outcomes
//!
//! The core never persists anything itself; it hands structured records to
//! an [`AuditSink`] owned by the caller.

use crate::types::{ActionRecord, SecurityEvent, Severity};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{error, info, warn};

/// Receiver for audit records produced by the core
#[cfg_attr(test, mockall::automock)]
pub trait AuditSink: Send + Sync {
    fn record_security_event(&self, event: SecurityEvent);

    fn record_action(&self, record: ActionRecord);
}

/// Sink that turns every record into a structured `tracing` event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record_security_event(&self, event: SecurityEvent) {
        let details = serde_json::Value::Object(event.details).to_string();
        match event.severity {
            Severity::Info => info!(
                event_id = %event.id,
                event_type = ?event.event_type,
                %details,
                "SECURITY EVENT"
            ),
            Severity::Warning => warn!(
                event_id = %event.id,
                event_type = ?event.event_type,
                %details,
                "SECURITY EVENT"
            ),
            Severity::Error | Severity::Critical => error!(
                event_id = %event.id,
                event_type = ?event.event_type,
                severity = ?event.severity,
                %details,
                "SECURITY EVENT"
            ),
        }
    }

    fn record_action(&self, record: ActionRecord) {
        let result = record.result.to_string();
        if record.success {
            info!(action = %record.action, %result, "Action completed");
        } else {
            error!(action = %record.action, %result, "Action failed");
        }
    }
}

/// Counts over everything a [`MemoryAuditSink`] has received
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub action_count: usize,
    pub successful_actions: usize,
    pub failed_actions: usize,
    pub security_event_count: usize,
}

/// In-memory sink, for tests and for callers that batch records themselves
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    security_events: Mutex<Vec<SecurityEvent>>,
    actions: Mutex<Vec<ActionRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn security_events(&self) -> Vec<SecurityEvent> {
        self.security_events.lock().clone()
    }

    pub fn actions(&self) -> Vec<ActionRecord> {
        self.actions.lock().clone()
    }

    pub fn summary(&self) -> SessionSummary {
        let actions = self.actions.lock();
        let successful_actions = actions.iter().filter(|a| a.success).count();

        SessionSummary {
            action_count: actions.len(),
            successful_actions,
            failed_actions: actions.len() - successful_actions,
            security_event_count: self.security_events.lock().len(),
        }
    }
}

impl AuditSink for MemoryAuditSink {
    fn record_security_event(&self, event: SecurityEvent) {
        self.security_events.lock().push(event);
    }

    fn record_action(&self, record: ActionRecord) {
        self.actions.lock().push(record);
    }
}
