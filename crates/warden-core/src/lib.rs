//! Change-governance core
//!
//! Coordinates the four safety gates that stand between a
//! change-proposing agent and an external resource:
//! - session-scoped credentials ([`warden_vault::SessionVault`])
//! - a process-wide [`AuthorizationGate`] with signed write tokens
//! - isolated pre-write validation ([`warden_validate::ValidationHarness`])
//! - a human approval state machine ([`ChangeWorkflow`])
//!
//! behind an append-only audit trail ([`warden_audit::AuditLedger`]) and a
//! closed-loop error/solution memory ([`warden_triage`]).
//!
//! External collaborators (document stores, browsers, HTTP clients) are
//! reached only through the [`ContentAdapter`] contract; this core never
//! decides approve/reject itself.

pub mod adapter;
pub mod config;
pub mod error;
pub mod gate;
pub mod orchestrator;
pub mod workflow;

pub use adapter::{AdapterError, ContentAdapter, MemoryAdapter};
pub use config::WardenConfig;
pub use error::CoreError;
pub use gate::{AuthorizationGate, DeniedAttempt, WriteToken};
pub use orchestrator::Orchestrator;
pub use workflow::{ApprovalId, ApprovalRequest, ApprovalStatus, ChangeWorkflow, WorkflowError};

// Re-export the collaborating subsystems for embedders.
pub use ed25519_dalek::{SigningKey, VerifyingKey};
pub use warden_audit::{AuditAction, AuditEvent, AuditLedger, AuditReport};
pub use warden_triage::{
    Classification, ErrorClassifier, ErrorContext, ErrorRecord, FingerprintTag, Severity,
    SolutionEntry, SolutionMemory,
};
pub use warden_validate::{
    ChangeProposal, DiffSummary, LanguageKind, ValidationHarness, ValidationVerdict,
};
pub use warden_vault::{SessionInfo, SessionVault};
