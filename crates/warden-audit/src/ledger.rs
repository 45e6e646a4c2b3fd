//! Session-scoped, append-only audit ledger
//!
//! All writers for a session's store go through one mutex (single-writer
//! discipline) so JSONL records are never interleaved. Persistence is
//! best-effort: a failed line write is reported on the tracing channel
//! and never aborts the operation that produced the event.

use crate::event::{AuditAction, AuditEvent};
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Errors raised while opening a ledger sink
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// Log directory or file could not be prepared
    #[error("audit store io failure: {0}")]
    Io(#[from] std::io::Error),
}

struct LedgerInner {
    events: Vec<AuditEvent>,
    sink: Option<BufWriter<File>>,
}

/// Append-only event log for one session
pub struct AuditLedger {
    session_id: String,
    log_path: Option<PathBuf>,
    inner: Mutex<LedgerInner>,
}

impl AuditLedger {
    /// In-memory ledger with no durable sink
    #[must_use]
    pub fn in_memory(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            log_path: None,
            inner: Mutex::new(LedgerInner {
                events: Vec::new(),
                sink: None,
            }),
        }
    }

    /// Ledger backed by `<dir>/audit-<session>.jsonl`, opened for append
    ///
    /// # Errors
    /// Returns [`AuditError::Io`] if the directory or file cannot be prepared.
    pub fn with_log_dir(
        session_id: impl Into<String>,
        dir: impl AsRef<Path>,
    ) -> Result<Self, AuditError> {
        let session_id = session_id.into();
        std::fs::create_dir_all(dir.as_ref())?;
        let path = dir.as_ref().join(format!("audit-{session_id}.jsonl"));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            session_id,
            log_path: Some(path),
            inner: Mutex::new(LedgerInner {
                events: Vec::new(),
                sink: Some(BufWriter::new(file)),
            }),
        })
    }

    /// Session this ledger is scoped to
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Durable log path, if any
    #[must_use]
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Append one event, stamping it with this ledger's session id
    ///
    /// A sink write failure is logged and tolerated; the in-memory mirror
    /// always receives the event.
    pub fn append(&self, mut event: AuditEvent) {
        event.session_id = self.session_id.clone();

        let mut guard = self.inner.lock();
        if let Some(sink) = guard.sink.as_mut() {
            if let Err(e) = write_line(sink, &event) {
                tracing::warn!(error = %e, action = event.action.as_str(),
                    "audit sink write failed; event kept in memory only");
            }
        }
        guard.events.push(event);
    }

    /// Snapshot of all events, in log order
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.inner.lock().events.clone()
    }

    /// Count of events with the given action
    #[must_use]
    pub fn count(&self, action: AuditAction) -> usize {
        self.inner
            .lock()
            .events
            .iter()
            .filter(|e| e.action == action)
            .count()
    }

    /// Derived aggregate report; never mutates the ledger
    #[must_use]
    pub fn report(&self) -> AuditReport {
        let events = self.events();
        let checks: Vec<AuditEvent> = events
            .iter()
            .filter(|e| e.action == AuditAction::ValidationCheck)
            .cloned()
            .collect();
        let issues: Vec<AuditEvent> = events
            .iter()
            .filter(|e| e.action == AuditAction::IssueDetected)
            .cloned()
            .collect();
        let blocked_writes = events
            .iter()
            .filter(|e| e.action == AuditAction::WriteBlocked)
            .count();

        AuditReport {
            summary: AuditSummary {
                total_checks: checks.len(),
                total_issues: issues.len(),
                total_operations: events.len(),
                blocked_writes,
            },
            checks,
            issues,
            events,
        }
    }
}

fn write_line(sink: &mut BufWriter<File>, event: &AuditEvent) -> std::io::Result<()> {
    let line = serde_json::to_string(event)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    sink.write_all(line.as_bytes())?;
    sink.write_all(b"\n")?;
    sink.flush()
}

/// Aggregate counters derived from the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    /// Validation checks observed
    pub total_checks: usize,
    /// Classifier issues observed
    pub total_issues: usize,
    /// All events, regardless of action
    pub total_operations: usize,
    /// Writes denied by the authorization gate
    pub blocked_writes: usize,
}

/// Structured, read-only report over one session's ledger
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    /// Aggregate counters
    pub summary: AuditSummary,
    /// Validation check events
    pub checks: Vec<AuditEvent>,
    /// Classifier issue events
    pub issues: Vec<AuditEvent>,
    /// Every event, in log order
    pub events: Vec<AuditEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_stamps_session_and_preserves_order() {
        let ledger = AuditLedger::in_memory("session-1");
        ledger.append(AuditEvent::new(AuditAction::ValidationCheck).with("target", "a.js"));
        ledger.append(AuditEvent::new(AuditAction::ApprovalRequested).with("target", "a.js"));

        let events = ledger.events();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.session_id == "session-1"));
        assert_eq!(events[0].action, AuditAction::ValidationCheck);
        assert_eq!(events[1].action, AuditAction::ApprovalRequested);
    }

    #[test]
    fn report_counts_by_action() {
        let ledger = AuditLedger::in_memory("s");
        ledger.append(AuditEvent::new(AuditAction::ValidationCheck));
        ledger.append(AuditEvent::new(AuditAction::ValidationCheck));
        ledger.append(AuditEvent::new(AuditAction::IssueDetected));
        ledger.append(AuditEvent::new(AuditAction::WriteBlocked));
        ledger.append(AuditEvent::new(AuditAction::ChangeApplied));

        let report = ledger.report();
        assert_eq!(report.summary.total_checks, 2);
        assert_eq!(report.summary.total_issues, 1);
        assert_eq!(report.summary.blocked_writes, 1);
        assert_eq!(report.summary.total_operations, 5);
        assert_eq!(report.checks.len(), 2);
        assert_eq!(report.issues.len(), 1);
    }

    #[test]
    fn sink_writes_one_json_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = AuditLedger::with_log_dir("s42", dir.path()).unwrap();
        ledger.append(AuditEvent::new(AuditAction::ChangeApproved).with("id", "req-1"));
        ledger.append(AuditEvent::new(AuditAction::ChangeApplied).with("id", "req-1"));

        let contents = std::fs::read_to_string(ledger.log_path().unwrap()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: AuditEvent = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.action, AuditAction::ChangeApproved);
        assert_eq!(first.session_id, "s42");
        assert_eq!(first.field("id").unwrap(), "req-1");
    }

    #[test]
    fn report_does_not_mutate_ledger() {
        let ledger = AuditLedger::in_memory("s");
        ledger.append(AuditEvent::new(AuditAction::ValidationCheck));

        let _ = ledger.report();
        let _ = ledger.report();
        assert_eq!(ledger.events().len(), 1);
    }
}
