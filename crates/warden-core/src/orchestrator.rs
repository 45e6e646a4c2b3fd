//! Session orchestrator
//!
//! One [`Orchestrator`] per governance session wires the subsystems
//! together and exposes the operation surface an embedding agent calls:
//!
//! ```text
//! propose_change -> validate -> (pass) open approval request
//! approve / reject -> human decision
//! apply -> gate check -> adapter write -> audit + resolve loop
//! ```
//!
//! Every failure crossing this surface is classified before it
//! propagates, so the error/solution memory observes the session's full
//! failure history. Classification never replaces the error; callers
//! still receive the original [`CoreError`].

use crate::adapter::{AdapterError, ContentAdapter};
use crate::config::WardenConfig;
use crate::error::CoreError;
use crate::gate::{AuthorizationGate, WriteToken};
use crate::workflow::{ApprovalId, ApprovalRequest, ApprovalStatus, ChangeWorkflow, WorkflowError};
use ed25519_dalek::{SigningKey, VerifyingKey};
use std::sync::Arc;
use warden_audit::{AuditAction, AuditEvent, AuditLedger, AuditReport};
use warden_triage::{Classification, ErrorClassifier, ErrorContext, SolutionMemory};
use warden_validate::{ChangeProposal, ValidationHarness, ValidationVerdict};
use warden_vault::SessionVault;

/// Coordinates vault, gate, harness, workflow, classifier, and ledger
/// for one governance session
pub struct Orchestrator {
    session_id: String,
    config: WardenConfig,
    vault: SessionVault,
    gate: Arc<AuthorizationGate>,
    ledger: Arc<AuditLedger>,
    memory: Arc<SolutionMemory>,
    classifier: Arc<ErrorClassifier>,
    harness: ValidationHarness,
    workflow: ChangeWorkflow,
    adapter: Arc<dyn ContentAdapter>,
}

impl Orchestrator {
    /// Build a session whose gate verifies tokens against `verifying_key`
    ///
    /// # Errors
    /// Fails when a configured audit directory or solution store cannot
    /// be opened.
    pub fn new(
        session_id: impl Into<String>,
        config: WardenConfig,
        verifying_key: VerifyingKey,
        adapter: Arc<dyn ContentAdapter>,
    ) -> Result<Self, CoreError> {
        let session_id = session_id.into();

        let ledger = Arc::new(match &config.audit_dir {
            Some(dir) => AuditLedger::with_log_dir(&session_id, dir)?,
            None => AuditLedger::in_memory(&session_id),
        });
        let memory = Arc::new(match &config.solutions_path {
            Some(path) => SolutionMemory::open(path)?,
            None => SolutionMemory::in_memory(),
        });
        let classifier = Arc::new(ErrorClassifier::new(Arc::clone(&ledger), Arc::clone(&memory)));
        let workflow = match &config.records_dir {
            Some(dir) => ChangeWorkflow::with_records_dir(Arc::clone(&ledger), dir),
            None => ChangeWorkflow::new(Arc::clone(&ledger)),
        };
        let harness = ValidationHarness::new(config.validation());

        tracing::info!(session = %session_id, "governance session started");
        Ok(Self {
            session_id,
            config,
            vault: SessionVault::new(),
            gate: Arc::new(AuthorizationGate::new(verifying_key)),
            ledger,
            memory,
            classifier,
            harness,
            workflow,
            adapter,
        })
    }

    /// Build a session with a freshly generated keypair
    ///
    /// Returns the signing key so the embedder can issue [`WriteToken`]s.
    ///
    /// # Errors
    /// Same failure modes as [`Orchestrator::new`].
    pub fn with_generated_key(
        session_id: impl Into<String>,
        config: WardenConfig,
        adapter: Arc<dyn ContentAdapter>,
    ) -> Result<(Self, SigningKey), CoreError> {
        let signing_key = AuthorizationGate::generate_signing_key();
        let orchestrator = Self::new(session_id, config, signing_key.verifying_key(), adapter)?;
        Ok((orchestrator, signing_key))
    }

    /// This session's id
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    // --- change lifecycle -------------------------------------------------

    /// Validate a proposed change and, when it passes, open an approval
    /// request
    ///
    /// The current content is read through the adapter; a target that does
    /// not exist yet validates against empty original content. A failing
    /// verdict is classified and returned as [`CoreError::Validation`]
    /// without opening a request.
    ///
    /// # Errors
    /// [`CoreError::Validation`] for failing verdicts,
    /// [`CoreError::Harness`] for staging io or checker timeout,
    /// [`CoreError::Adapter`] for read failures other than absence.
    pub async fn propose_change(
        &self,
        target_id: &str,
        proposed: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Result<ApprovalRequest, CoreError> {
        let original = match self.adapter.read_current(target_id).await {
            Ok(content) => content,
            Err(AdapterError::NotFound(_)) => String::new(),
            Err(e) => {
                return Err(self.classified(e.into(), "read", target_id, "adapter"));
            }
        };

        let proposal = ChangeProposal::new(target_id, original, proposed, rationale);
        let verdict = self.stage_and_validate(&proposal).await?;

        if !verdict.passed() {
            let err = CoreError::Validation {
                target: target_id.to_string(),
                verdict: Box::new(verdict),
            };
            return Err(self.classified(err, "validate", target_id, "harness"));
        }

        self.request_approval(&proposal, verdict)
    }

    /// Stage, syntax-check, and diff a proposal, recording the check
    ///
    /// # Errors
    /// [`CoreError::Harness`] on staging io failure or checker timeout.
    pub async fn stage_and_validate(
        &self,
        proposal: &ChangeProposal,
    ) -> Result<ValidationVerdict, CoreError> {
        let verdict = match self.harness.evaluate(proposal).await {
            Ok(verdict) => verdict,
            Err(e) => {
                return Err(self.classified(e.into(), "validate", &proposal.target_id, "harness"));
            }
        };

        self.ledger.append(
            AuditEvent::new(AuditAction::ValidationCheck)
                .with("target", proposal.target_id.clone())
                .with("language", proposal.language.name())
                .with("passed", verdict.passed())
                .with("errorCount", verdict.errors.len())
                .with("warningCount", verdict.warnings.len()),
        );
        Ok(verdict)
    }

    /// Open an approval request for an already-validated proposal
    ///
    /// # Errors
    /// [`CoreError::Workflow`] when the verdict is not passing or the
    /// approval artifact cannot be persisted.
    pub fn request_approval(
        &self,
        proposal: &ChangeProposal,
        verdict: ValidationVerdict,
    ) -> Result<ApprovalRequest, CoreError> {
        self.workflow
            .create(proposal, verdict)
            .map_err(|e| self.classified(e.into(), "request_approval", &proposal.target_id, "workflow"))
    }

    /// Approve a pending request
    ///
    /// # Errors
    /// [`CoreError::Workflow`] for unknown ids or already-decided requests.
    pub fn approve(&self, id: ApprovalId) -> Result<ApprovalRequest, CoreError> {
        self.workflow
            .approve(id)
            .map_err(|e| self.classified(e.into(), "approve", &id.to_string(), "workflow"))
    }

    /// Reject a pending request with a reviewer reason
    ///
    /// # Errors
    /// [`CoreError::Workflow`] for unknown ids or already-decided requests.
    pub fn reject(
        &self,
        id: ApprovalId,
        reason: impl Into<String>,
    ) -> Result<ApprovalRequest, CoreError> {
        self.workflow
            .reject(id, reason)
            .map_err(|e| self.classified(e.into(), "reject", &id.to_string(), "workflow"))
    }

    /// Look up an approval request
    #[must_use]
    pub fn get_approval(&self, id: ApprovalId) -> Option<ApprovalRequest> {
        self.workflow.get(id)
    }

    /// Approval requests still awaiting a decision
    #[must_use]
    pub fn pending_approvals(&self) -> Vec<ApprovalRequest> {
        self.workflow.pending()
    }

    /// Write an approved change through the content adapter
    ///
    /// Requires the request to be `Approved` and the authorization gate
    /// to be open. A successful write is audited and closes the
    /// error/solution loop for the target.
    ///
    /// # Errors
    /// [`CoreError::Workflow`] for unknown or undecided/rejected requests,
    /// [`CoreError::Authorization`] when the gate is closed,
    /// [`CoreError::Adapter`] when the external write fails.
    pub async fn apply(&self, id: ApprovalId) -> Result<ApprovalRequest, CoreError> {
        let Some(request) = self.workflow.get(id) else {
            let err = WorkflowError::NotFound(id).into();
            return Err(self.classified(err, "apply", &id.to_string(), "workflow"));
        };
        if request.status != ApprovalStatus::Approved {
            let err = WorkflowError::InvalidState {
                id,
                status: request.status,
            }
            .into();
            return Err(self.classified(err, "apply", &request.target_id, "workflow"));
        }

        self.guarded_write("write", &request.target_id, &request.new_content)
            .await?;

        self.ledger.append(
            AuditEvent::new(AuditAction::ChangeApplied)
                .with("approvalId", id.to_string())
                .with("target", request.target_id.clone())
                .with("newSize", request.new_size),
        );
        tracing::info!(id = %id, target = %request.target_id, "change applied");

        // A landed change resolves whatever failure was last pending for
        // this target.
        self.classifier
            .mark_resolved(&request.target_id, &request.reason);
        Ok(request)
    }

    /// Write content directly, skipping validation and approval
    ///
    /// Still requires an open gate, and is audited as an explicit bypass.
    ///
    /// # Errors
    /// [`CoreError::Authorization`] when the gate is closed,
    /// [`CoreError::Adapter`] when the external write fails.
    pub async fn force_apply(
        &self,
        target_id: &str,
        content: &str,
        reason: &str,
    ) -> Result<(), CoreError> {
        self.guarded_write("force_write", target_id, content).await?;

        self.ledger.append(
            AuditEvent::new(AuditAction::AuthorizedBypass)
                .with("target", target_id)
                .with("reason", reason),
        );
        tracing::warn!(target = %target_id, reason, "bypass write applied");
        Ok(())
    }

    async fn guarded_write(
        &self,
        operation: &str,
        target_id: &str,
        content: &str,
    ) -> Result<(), CoreError> {
        if !self.gate.is_authorized(operation, target_id) {
            self.ledger.append(
                AuditEvent::new(AuditAction::WriteBlocked)
                    .with("operation", operation)
                    .with("target", target_id),
            );
            let err = CoreError::Authorization {
                operation: operation.to_string(),
                target: target_id.to_string(),
            };
            return Err(self.classified(err, operation, target_id, "gate"));
        }

        if let Err(e) = self.adapter.write_approved(target_id, content).await {
            return Err(self.classified(e.into(), operation, target_id, "adapter"));
        }
        Ok(())
    }

    // --- authorization ----------------------------------------------------

    /// Open the gate iff `token` verifies against this session's key
    pub fn authorize(&self, token: &WriteToken) -> bool {
        self.gate.authorize(token)
    }

    /// Close the gate
    pub fn revoke_authorization(&self) {
        self.gate.revoke();
    }

    /// Whether `operation` on `target` would currently be permitted
    ///
    /// Denied checks are recorded on the gate's attempt list.
    pub fn is_authorized(&self, operation: &str, target: &str) -> bool {
        self.gate.is_authorized(operation, target)
    }

    /// The session's authorization gate
    #[must_use]
    pub fn gate(&self) -> &AuthorizationGate {
        &self.gate
    }

    // --- credentials ------------------------------------------------------

    /// Store a session secret with the configured TTL and auto-renewal
    pub fn store_session(&self, id: impl Into<String>, secret: &str) {
        self.vault.store(
            id,
            secret,
            self.config.session_ttl,
            true,
            self.config.renew_threshold,
        );
    }

    /// Fetch a session secret, or `None` if unknown or expired
    #[must_use]
    pub fn get_session(&self, id: &str) -> Option<String> {
        self.vault.get(id)
    }

    /// Scrub one credential session and audit the clear
    ///
    /// Returns `false` for unknown ids (nothing is audited).
    pub fn close_session(&self, id: &str) -> bool {
        let cleared = self.vault.clear(id);
        if cleared {
            self.ledger
                .append(AuditEvent::new(AuditAction::SessionCleared).with("credentialId", id));
        }
        cleared
    }

    /// The session's credential vault
    #[must_use]
    pub fn vault(&self) -> &SessionVault {
        &self.vault
    }

    // --- triage and reporting ---------------------------------------------

    /// Classify an externally observed error in this session's context
    pub fn classify(&self, message: &str, context: &ErrorContext) -> Classification {
        self.classifier.classify(message, context)
    }

    /// Record a solution attempt in the session's solution store
    ///
    /// # Errors
    /// [`CoreError::Memory`] when the backing file cannot be written.
    pub fn save_solution(
        &self,
        problem: &str,
        solution: impl Into<String>,
        succeeded: bool,
    ) -> Result<(), CoreError> {
        Ok(self.memory.save(problem, solution, succeeded)?)
    }

    /// The session's solution store
    #[must_use]
    pub fn memory(&self) -> &SolutionMemory {
        &self.memory
    }

    /// The session's error classifier
    #[must_use]
    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    /// The session's audit ledger
    #[must_use]
    pub fn ledger(&self) -> &AuditLedger {
        &self.ledger
    }

    /// Aggregate audit report for this session
    #[must_use]
    pub fn report(&self) -> AuditReport {
        self.ledger.report()
    }

    /// Classify a failing operation's error, then hand it back unchanged.
    fn classified(
        &self,
        err: CoreError,
        operation: &str,
        target: &str,
        module: &str,
    ) -> CoreError {
        self.classifier.classify(
            &err.to_string(),
            &ErrorContext::new(operation, target, module),
        );
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MemoryAdapter;

    fn session() -> (tempfile::TempDir, Orchestrator, SigningKey, Arc<MemoryAdapter>) {
        let dir = tempfile::tempdir().unwrap();
        let adapter = Arc::new(MemoryAdapter::new());
        let config = WardenConfig::new().with_staging_dir(dir.path().join("staging"));
        let (orchestrator, key) =
            Orchestrator::with_generated_key("test-session", config, Arc::clone(&adapter) as _)
                .unwrap();
        (dir, orchestrator, key, adapter)
    }

    #[tokio::test]
    async fn propose_on_missing_target_validates_against_empty() {
        let (_dir, orchestrator, _key, _adapter) = session();

        let request = orchestrator
            .propose_change("fresh.json", r#"{"a": 1}"#, "create config")
            .await
            .unwrap();

        assert_eq!(request.original_content, "");
        assert_eq!(request.status, ApprovalStatus::Pending);
        assert!(request.comparison.added > 0);
    }

    #[tokio::test]
    async fn apply_requires_approval_and_open_gate() {
        let (_dir, orchestrator, key, adapter) = session();
        adapter.seed("config.json", "{}");

        let request = orchestrator
            .propose_change("config.json", r#"{"a": 1}"#, "add field")
            .await
            .unwrap();

        // Pending request cannot be applied.
        let err = orchestrator.apply(request.id).await.unwrap_err();
        assert!(err.is_invalid_state());

        orchestrator.approve(request.id).unwrap();

        // Approved but gate closed: blocked and audited.
        let err = orchestrator.apply(request.id).await.unwrap_err();
        assert!(err.is_authorization());
        assert_eq!(orchestrator.ledger().count(AuditAction::WriteBlocked), 1);
        assert!(adapter.content("config.json").unwrap() == "{}");

        // Open the gate; the write lands.
        assert!(orchestrator.authorize(&WriteToken::issue("reviewer", &key)));
        orchestrator.apply(request.id).await.unwrap();
        assert_eq!(adapter.content("config.json").unwrap(), r#"{"a": 1}"#);
        assert_eq!(orchestrator.ledger().count(AuditAction::ChangeApplied), 1);
    }

    #[tokio::test]
    async fn failing_validation_opens_no_request_and_classifies() {
        let (_dir, orchestrator, _key, _adapter) = session();

        let err = orchestrator
            .propose_change("config.json", r#"{"a": "#, "break it")
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Validation { .. }));
        assert!(orchestrator.pending_approvals().is_empty());
        assert_eq!(orchestrator.ledger().count(AuditAction::IssueDetected), 1);
        let records = orchestrator.classifier().records();
        assert_eq!(records.len(), 1);
        assert!(!records[0].resolved);
    }

    #[tokio::test]
    async fn force_apply_is_audited_as_bypass() {
        let (_dir, orchestrator, key, adapter) = session();

        // Closed gate blocks the bypass too.
        let err = orchestrator
            .force_apply("notes.txt", "content", "hotfix")
            .await
            .unwrap_err();
        assert!(err.is_authorization());

        orchestrator.authorize(&WriteToken::issue("ops", &key));
        orchestrator
            .force_apply("notes.txt", "content", "hotfix")
            .await
            .unwrap();

        assert_eq!(adapter.content("notes.txt").unwrap(), "content");
        assert_eq!(orchestrator.ledger().count(AuditAction::AuthorizedBypass), 1);
        // Bypass never opens an approval request.
        assert_eq!(orchestrator.ledger().count(AuditAction::ApprovalRequested), 0);
    }

    #[tokio::test]
    async fn close_session_audits_only_known_ids() {
        let (_dir, orchestrator, _key, _adapter) = session();
        orchestrator.store_session("cred-1", "hunter2");
        assert_eq!(orchestrator.get_session("cred-1").as_deref(), Some("hunter2"));

        assert!(orchestrator.close_session("cred-1"));
        assert!(!orchestrator.close_session("cred-1"));
        assert!(orchestrator.get_session("cred-1").is_none());
        assert_eq!(orchestrator.ledger().count(AuditAction::SessionCleared), 1);
    }

    #[tokio::test]
    async fn successful_apply_resolves_pending_error_record() {
        let (_dir, orchestrator, key, adapter) = session();
        adapter.seed("app.json", "{}");
        orchestrator.authorize(&WriteToken::issue("reviewer", &key));

        // A failed attempt leaves an unresolved record for the target.
        let _ = orchestrator
            .propose_change("app.json", "{oops", "bad attempt")
            .await
            .unwrap_err();
        assert!(!orchestrator.classifier().records()[0].resolved);

        let request = orchestrator
            .propose_change("app.json", r#"{"fixed": true}"#, "corrected attempt")
            .await
            .unwrap();
        orchestrator.approve(request.id).unwrap();
        orchestrator.apply(request.id).await.unwrap();

        assert!(orchestrator.classifier().records()[0].resolved);
        assert_eq!(orchestrator.ledger().count(AuditAction::SolutionRecorded), 1);
    }
}
