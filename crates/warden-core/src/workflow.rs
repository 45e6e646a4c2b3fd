//! Human approval workflow
//!
//! One [`ApprovalRequest`] per proposal that passed validation. Requests
//! move through exactly one lifecycle: `pending -> approved` or
//! `pending -> rejected`, decided by a human. Transitions happen under the
//! request's map entry lock, so two racing decisions resolve to one winner
//! and one [`WorkflowError::InvalidState`]. When a records directory is
//! configured, every request is mirrored to
//! `records/approval-{id}.json` for out-of-process review.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;
use warden_audit::{AuditAction, AuditEvent, AuditLedger};
use warden_validate::{ChangeProposal, DiffSummary, ValidationVerdict};

/// Opaque identifier for an approval request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApprovalId(Uuid);

impl ApprovalId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ApprovalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle state of an approval request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    /// Awaiting a human decision
    Pending,
    /// Decided: may be applied
    Approved,
    /// Decided: must not be applied
    Rejected,
}

impl ApprovalStatus {
    /// Whether the request has been decided
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }
}

/// A reviewable change awaiting (or holding) a decision
///
/// Carries the full original and proposed content so a reviewer needs no
/// other source to evaluate the change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    /// Request identifier
    pub id: ApprovalId,
    /// Resource the change targets
    pub target_id: String,
    /// When the request was opened
    pub timestamp: DateTime<Utc>,
    /// Why the change is proposed
    pub reason: String,
    /// The validation verdict that admitted this request
    pub verdict: ValidationVerdict,
    /// Positional line comparison of original versus proposed
    pub comparison: DiffSummary,
    /// Current lifecycle state
    pub status: ApprovalStatus,
    /// Character count of the original content
    pub original_size: usize,
    /// Character count of the proposed content
    pub new_size: usize,
    /// Full original content
    pub original_content: String,
    /// Full proposed content
    pub new_content: String,
    /// Decision time, when approved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    /// Decision time, when rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
    /// Reviewer's stated reason, when rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

/// Workflow failures
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// No request with the given id
    #[error("no approval request with id {0}")]
    NotFound(ApprovalId),
    /// A decision was attempted on an already-decided request
    #[error("approval request {id} is already {status:?}")]
    InvalidState {
        /// Request id
        id: ApprovalId,
        /// State the request was found in
        status: ApprovalStatus,
    },
    /// The proposal's verdict does not allow an approval request
    #[error("validation verdict for '{target}' is not passing")]
    VerdictNotPassing {
        /// Target of the failed proposal
        target: String,
    },
    /// Could not persist the approval artifact
    #[error("failed to persist approval artifact: {0}")]
    Persist(#[from] std::io::Error),
}

/// Registry of approval requests
pub struct ChangeWorkflow {
    requests: DashMap<ApprovalId, ApprovalRequest>,
    ledger: Arc<AuditLedger>,
    records_dir: Option<PathBuf>,
}

impl ChangeWorkflow {
    /// In-memory workflow logging to `ledger`
    #[must_use]
    pub fn new(ledger: Arc<AuditLedger>) -> Self {
        Self {
            requests: DashMap::new(),
            ledger,
            records_dir: None,
        }
    }

    /// Workflow mirroring every request to `records_dir`
    #[must_use]
    pub fn with_records_dir(ledger: Arc<AuditLedger>, records_dir: impl Into<PathBuf>) -> Self {
        Self {
            requests: DashMap::new(),
            ledger,
            records_dir: Some(records_dir.into()),
        }
    }

    /// Open a pending request for a proposal that passed validation
    ///
    /// # Errors
    /// [`WorkflowError::VerdictNotPassing`] when the verdict failed;
    /// [`WorkflowError::Persist`] when the artifact cannot be written.
    pub fn create(
        &self,
        proposal: &ChangeProposal,
        verdict: ValidationVerdict,
    ) -> Result<ApprovalRequest, WorkflowError> {
        if !verdict.passed() {
            return Err(WorkflowError::VerdictNotPassing {
                target: proposal.target_id.clone(),
            });
        }

        let request = ApprovalRequest {
            id: ApprovalId::new(),
            target_id: proposal.target_id.clone(),
            timestamp: Utc::now(),
            reason: proposal.rationale.clone(),
            comparison: verdict.diff_summary.clone(),
            verdict,
            status: ApprovalStatus::Pending,
            original_size: proposal.original.chars().count(),
            new_size: proposal.proposed.chars().count(),
            original_content: proposal.original.clone(),
            new_content: proposal.proposed.clone(),
            approved_at: None,
            rejected_at: None,
            rejection_reason: None,
        };

        self.persist(&request)?;
        self.ledger.append(
            AuditEvent::new(AuditAction::ApprovalRequested)
                .with("approvalId", request.id.to_string())
                .with("target", request.target_id.clone())
                .with("reason", request.reason.clone()),
        );
        tracing::info!(id = %request.id, target = %request.target_id, "approval requested");

        self.requests.insert(request.id, request.clone());
        Ok(request)
    }

    /// Approve a pending request
    ///
    /// # Errors
    /// [`WorkflowError::NotFound`] for an unknown id;
    /// [`WorkflowError::InvalidState`] when the request is already decided.
    pub fn approve(&self, id: ApprovalId) -> Result<ApprovalRequest, WorkflowError> {
        let request = {
            let mut entry = self.requests.get_mut(&id).ok_or(WorkflowError::NotFound(id))?;
            if entry.status.is_terminal() {
                return Err(WorkflowError::InvalidState {
                    id,
                    status: entry.status,
                });
            }
            entry.status = ApprovalStatus::Approved;
            entry.approved_at = Some(Utc::now());
            entry.clone()
        };

        self.repersist(&request);
        self.ledger.append(
            AuditEvent::new(AuditAction::ChangeApproved)
                .with("approvalId", id.to_string())
                .with("target", request.target_id.clone()),
        );
        tracing::info!(id = %id, target = %request.target_id, "change approved");
        Ok(request)
    }

    /// Reject a pending request
    ///
    /// # Errors
    /// [`WorkflowError::NotFound`] for an unknown id;
    /// [`WorkflowError::InvalidState`] when the request is already decided.
    pub fn reject(
        &self,
        id: ApprovalId,
        reason: impl Into<String>,
    ) -> Result<ApprovalRequest, WorkflowError> {
        let reason = reason.into();
        let request = {
            let mut entry = self.requests.get_mut(&id).ok_or(WorkflowError::NotFound(id))?;
            if entry.status.is_terminal() {
                return Err(WorkflowError::InvalidState {
                    id,
                    status: entry.status,
                });
            }
            entry.status = ApprovalStatus::Rejected;
            entry.rejected_at = Some(Utc::now());
            entry.rejection_reason = Some(reason.clone());
            entry.clone()
        };

        self.repersist(&request);
        self.ledger.append(
            AuditEvent::new(AuditAction::ChangeRejected)
                .with("approvalId", id.to_string())
                .with("target", request.target_id.clone())
                .with("reason", reason),
        );
        tracing::info!(id = %id, target = %request.target_id, "change rejected");
        Ok(request)
    }

    /// Look up a request by id
    #[must_use]
    pub fn get(&self, id: ApprovalId) -> Option<ApprovalRequest> {
        self.requests.get(&id).map(|r| r.clone())
    }

    /// All requests currently pending, oldest first
    #[must_use]
    pub fn pending(&self) -> Vec<ApprovalRequest> {
        let mut pending: Vec<ApprovalRequest> = self
            .requests
            .iter()
            .filter(|r| r.status == ApprovalStatus::Pending)
            .map(|r| r.clone())
            .collect();
        pending.sort_by_key(|r| r.timestamp);
        pending
    }

    fn artifact_path(&self, id: ApprovalId) -> Option<PathBuf> {
        self.records_dir
            .as_ref()
            .map(|dir| dir.join(format!("approval-{id}.json")))
    }

    fn persist(&self, request: &ApprovalRequest) -> Result<(), WorkflowError> {
        let Some(path) = self.artifact_path(request.id) else {
            return Ok(());
        };
        if let Some(dir) = &self.records_dir {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(request)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    // Decision rewrites are best-effort: the in-memory transition already
    // happened and must not be rolled back for a stale artifact.
    fn repersist(&self, request: &ApprovalRequest) {
        if let Err(e) = self.persist(request) {
            tracing::warn!(id = %request.id, error = %e, "approval artifact rewrite failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_validate::ChangeProposal;

    fn workflow() -> ChangeWorkflow {
        ChangeWorkflow::new(Arc::new(AuditLedger::in_memory("test-session")))
    }

    async fn passing_request(workflow: &ChangeWorkflow) -> ApprovalRequest {
        let proposal = ChangeProposal::new("notes.txt", "old", "new", "update");
        let harness = warden_validate::ValidationHarness::new(warden_validate::ValidationConfig {
            staging_dir: std::env::temp_dir().join("warden-workflow-tests"),
            ..Default::default()
        });
        let verdict = harness.evaluate(&proposal).await.unwrap();
        workflow.create(&proposal, verdict).unwrap()
    }

    #[tokio::test]
    async fn create_opens_pending_request() {
        let workflow = workflow();
        let request = passing_request(&workflow).await;

        assert_eq!(request.status, ApprovalStatus::Pending);
        assert_eq!(request.original_size, 3);
        assert_eq!(request.new_size, 3);
        assert_eq!(workflow.pending().len(), 1);
    }

    #[tokio::test]
    async fn failed_verdict_is_refused() {
        let workflow = workflow();
        let proposal = ChangeProposal::new("config.json", "{}", "{bad", "break");
        let harness = warden_validate::ValidationHarness::default();
        let verdict = harness.evaluate(&proposal).await.unwrap();

        let err = workflow.create(&proposal, verdict).unwrap_err();
        assert!(matches!(err, WorkflowError::VerdictNotPassing { .. }));
        assert!(workflow.pending().is_empty());
    }

    #[tokio::test]
    async fn approve_then_approve_is_invalid_state() {
        let workflow = workflow();
        let request = passing_request(&workflow).await;

        let approved = workflow.approve(request.id).unwrap();
        assert_eq!(approved.status, ApprovalStatus::Approved);
        assert!(approved.approved_at.is_some());

        let err = workflow.approve(request.id).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::InvalidState {
                status: ApprovalStatus::Approved,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn reject_records_reason() {
        let workflow = workflow();
        let request = passing_request(&workflow).await;

        let rejected = workflow.reject(request.id, "too risky").unwrap();
        assert_eq!(rejected.status, ApprovalStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("too risky"));

        let err = workflow.approve(request.id).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidState { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn racing_decisions_resolve_to_one_winner() {
        let workflow = Arc::new(workflow());
        let request = passing_request(&workflow).await;
        let id = request.id;

        let approver = Arc::clone(&workflow);
        let rejecter = Arc::clone(&workflow);
        let approve = tokio::spawn(async move { approver.approve(id) });
        let reject = tokio::spawn(async move { rejecter.reject(id, "raced") });

        let outcomes = [approve.await.unwrap(), reject.await.unwrap()];
        let winners = outcomes.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        assert!(outcomes.iter().any(|r| matches!(
            r,
            Err(WorkflowError::InvalidState { .. })
        )));

        // The stored request holds exactly the winner's terminal state.
        let settled = workflow.get(id).unwrap();
        assert!(settled.status.is_terminal());
        assert_eq!(ledger_decisions(&workflow), 1);
    }

    fn ledger_decisions(workflow: &ChangeWorkflow) -> usize {
        workflow.ledger.count(AuditAction::ChangeApproved)
            + workflow.ledger.count(AuditAction::ChangeRejected)
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let workflow = workflow();
        let missing = ApprovalId::new();
        assert!(matches!(
            workflow.approve(missing),
            Err(WorkflowError::NotFound(_))
        ));
        assert!(workflow.get(missing).is_none());
    }

    #[tokio::test]
    async fn artifact_mirrors_request_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Arc::new(AuditLedger::in_memory("test-session"));
        let workflow = ChangeWorkflow::with_records_dir(ledger, dir.path());
        let request = passing_request(&workflow).await;

        let path = dir.path().join(format!("approval-{}.json", request.id));
        let pending: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(pending["status"], "pending");
        assert_eq!(pending["newContent"], "new");

        workflow.approve(request.id).unwrap();
        let approved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(approved["status"], "approved");
        assert!(approved.get("approvedAt").is_some());
    }

    #[tokio::test]
    async fn decisions_land_in_ledger() {
        let ledger = Arc::new(AuditLedger::in_memory("test-session"));
        let workflow = ChangeWorkflow::new(Arc::clone(&ledger));
        let request = passing_request(&workflow).await;
        workflow.approve(request.id).unwrap();

        assert_eq!(ledger.count(AuditAction::ApprovalRequested), 1);
        assert_eq!(ledger.count(AuditAction::ChangeApproved), 1);
    }
}
