//! Core error type
//!
//! One enum spans every failure an orchestrated operation can surface, so
//! embedders match on a single type. Helper predicates cover the cases
//! callers commonly branch on.

use crate::adapter::AdapterError;
use crate::workflow::WorkflowError;
use warden_audit::AuditError;
use warden_triage::MemoryError;
use warden_validate::{ValidationError, ValidationVerdict};

/// Failures surfaced by the governance core
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A proposal failed validation; the verdict carries the findings
    #[error("validation failed for '{target}': {}", verdict.errors.join("; "))]
    Validation {
        /// Target of the failed proposal
        target: String,
        /// The failing verdict
        verdict: Box<ValidationVerdict>,
    },
    /// The validation harness itself failed (staging io, checker timeout)
    #[error(transparent)]
    Harness(#[from] ValidationError),
    /// A write was attempted while the authorization gate was closed
    #[error("write to '{target}' blocked: {operation} not authorized")]
    Authorization {
        /// Operation that was denied
        operation: String,
        /// Target of the denied operation
        target: String,
    },
    /// A named entity does not exist
    #[error("not found: {0}")]
    NotFound(String),
    /// Approval workflow failure
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    /// Content adapter failure
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    /// Solution store failure
    #[error(transparent)]
    Memory(#[from] MemoryError),
    /// Audit store failure while wiring up a session
    #[error(transparent)]
    Audit(#[from] AuditError),
}

impl CoreError {
    /// Whether this is a syntax-checker timeout
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, CoreError::Harness(ValidationError::Timeout { .. }))
    }

    /// Whether this is an illegal approval-state transition
    #[must_use]
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, CoreError::Workflow(WorkflowError::InvalidState { .. }))
    }

    /// Whether this is a missing entity (approval, target, or session)
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::NotFound(_)
                | CoreError::Workflow(WorkflowError::NotFound(_))
                | CoreError::Adapter(AdapterError::NotFound(_))
        )
    }

    /// Whether this is a gate denial
    #[must_use]
    pub fn is_authorization(&self) -> bool {
        matches!(self, CoreError::Authorization { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_findings() {
        let verdict = ValidationVerdict {
            syntax_valid: false,
            errors: vec!["unexpected token".to_string(), "line 3".to_string()],
            warnings: Vec::new(),
            diff_summary: warden_validate::diff_lines("", ""),
            overall: warden_validate::Overall::Fail,
        };
        let err = CoreError::Validation {
            target: "app.js".to_string(),
            verdict: Box::new(verdict),
        };

        let text = err.to_string();
        assert!(text.contains("app.js"));
        assert!(text.contains("unexpected token; line 3"));
    }

    #[test]
    fn predicates_discriminate() {
        let auth = CoreError::Authorization {
            operation: "write".to_string(),
            target: "a".to_string(),
        };
        assert!(auth.is_authorization());
        assert!(!auth.is_timeout());

        let timeout = CoreError::Harness(ValidationError::Timeout {
            language: "javascript",
            budget_secs: 10,
        });
        assert!(timeout.is_timeout());

        let missing = CoreError::NotFound("session-9".to_string());
        assert!(missing.is_not_found());
    }
}
