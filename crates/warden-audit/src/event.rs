//! Audit event records
//!
//! Wire format is one camelCase JSON object per event:
//! `{timestamp, sessionId, action, ...payload}`. Consumers must tolerate
//! additional unknown fields, which land in `payload` on deserialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Action tag carried by every audit event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// A proposal passed validation and an approval request was opened
    ApprovalRequested,
    /// An approval request transitioned to approved
    ChangeApproved,
    /// An approval request transitioned to rejected
    ChangeRejected,
    /// An approved change was written through the content adapter
    ChangeApplied,
    /// A write was attempted while the authorization gate was closed
    WriteBlocked,
    /// The explicit bypass path was exercised under an open gate
    AuthorizedBypass,
    /// A proposal was staged and syntax-checked
    ValidationCheck,
    /// The error classifier recorded a triaged failure
    IssueDetected,
    /// A solution entry was recorded against a problem key
    SolutionRecorded,
    /// A credential session was cleared from the vault
    SessionCleared,
}

impl AuditAction {
    /// Stable string tag, matching the serialized form
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::ApprovalRequested => "APPROVAL_REQUESTED",
            AuditAction::ChangeApproved => "CHANGE_APPROVED",
            AuditAction::ChangeRejected => "CHANGE_REJECTED",
            AuditAction::ChangeApplied => "CHANGE_APPLIED",
            AuditAction::WriteBlocked => "WRITE_BLOCKED",
            AuditAction::AuthorizedBypass => "AUTHORIZED_BYPASS",
            AuditAction::ValidationCheck => "VALIDATION_CHECK",
            AuditAction::IssueDetected => "ISSUE_DETECTED",
            AuditAction::SolutionRecorded => "SOLUTION_RECORDED",
            AuditAction::SessionCleared => "SESSION_CLEARED",
        }
    }
}

/// A single audit record
///
/// `session_id` is stamped by the ledger on append; payload fields are
/// flattened into the top-level JSON object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    /// Event time (log order is authoritative for sequencing)
    pub timestamp: DateTime<Utc>,
    /// Session the event belongs to
    #[serde(default)]
    pub session_id: String,
    /// Action tag
    pub action: AuditAction,
    /// Free-form payload, flattened into the record
    #[serde(flatten)]
    pub payload: serde_json::Map<String, Value>,
}

impl AuditEvent {
    /// Create an event for `action`, timestamped now
    #[must_use]
    pub fn new(action: AuditAction) -> Self {
        Self {
            timestamp: Utc::now(),
            session_id: String::new(),
            action,
            payload: serde_json::Map::new(),
        }
    }

    /// Attach a payload field
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Read a payload field
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }
}
