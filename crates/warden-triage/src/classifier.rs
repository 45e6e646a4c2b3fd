//! Fingerprint-based error classification
//!
//! The fingerprint table is a fixed, ordered rule set; every rule is a
//! pure match against the error text and is evaluated regardless of how
//! the error was represented upstream. Every match contributes a
//! candidate cause and remedy; when nothing matches, a single generic
//! fallback candidate is produced, so the result list is never empty.

use crate::memory::{SolutionEntry, SolutionMemory};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use warden_audit::{AuditAction, AuditEvent, AuditLedger};

/// Number of leading characters compared by the similarity heuristic
const SIMILARITY_PREFIX_CHARS: usize = 30;

/// Known failure fingerprints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintTag {
    /// Missing file or resource (ENOENT and friends)
    NotFound,
    /// Filesystem or OS permission denial
    PermissionDenied,
    /// Network connection failure or timeout
    ConnectionTimeout,
    /// Unresolvable module or package
    MissingDependency,
    /// Source failed to parse
    SyntaxError,
    /// Listen address already bound
    PortInUse,
    /// Credential or token rejected
    AuthFailure,
    /// Allocation or heap exhaustion
    OutOfMemory,
    /// Fallback when no fingerprint matched
    Unclassified,
}

/// Derived severity for a classified failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Process-threatening; stop and escalate
    Critical,
    /// Security-relevant denial
    High,
    /// Transient or environmental
    Medium,
}

/// One candidate cause with its suggested remedy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Matched fingerprint
    pub tag: FingerprintTag,
    /// Probable cause, phrased for a human reviewer
    pub cause: String,
    /// Suggested remedy
    pub remedy: String,
}

/// Result of classifying one error message
#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    /// Keyword-derived severity
    pub severity: Severity,
    /// Matched candidates; never empty
    pub candidates: Vec<Candidate>,
    /// Previously successful solutions for similar problems
    pub known_solutions: Vec<SolutionEntry>,
}

/// Where an error was observed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Operation being performed (e.g. "write", "validate")
    pub operation: String,
    /// Target the operation addressed
    pub target: String,
    /// Component that raised the error
    pub module: String,
}

impl ErrorContext {
    /// Build a context record
    #[must_use]
    pub fn new(
        operation: impl Into<String>,
        target: impl Into<String>,
        module: impl Into<String>,
    ) -> Self {
        Self {
            operation: operation.into(),
            target: target.into(),
            module: module.into(),
        }
    }
}

/// Durable record of one classified failure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    /// Record id
    pub id: Uuid,
    /// When the error was classified
    pub timestamp: DateTime<Utc>,
    /// Original error text, verbatim
    pub message: String,
    /// Primary (first-matching) fingerprint
    pub classification: FingerprintTag,
    /// Where the error was observed
    pub context: ErrorContext,
    /// Remedies suggested at classification time
    pub suggested_solutions: Vec<String>,
    /// Whether a later operation resolved this failure
    pub resolved: bool,
}

struct FingerprintRule {
    tag: FingerprintTag,
    pattern: Regex,
    cause: &'static str,
    remedy: &'static str,
}

impl FingerprintRule {
    /// Pure match: error text in, candidate out
    fn apply(&self, message: &str) -> Option<Candidate> {
        self.pattern.is_match(message).then(|| Candidate {
            tag: self.tag,
            cause: self.cause.to_string(),
            remedy: self.remedy.to_string(),
        })
    }
}

static RULES: Lazy<Vec<FingerprintRule>> = Lazy::new(|| {
    let rule = |tag, pattern: &str, cause, remedy| FingerprintRule {
        tag,
        pattern: Regex::new(pattern).expect("fingerprint pattern must compile"),
        cause,
        remedy,
    };
    vec![
        rule(
            FingerprintTag::NotFound,
            r"(?i)enoent|not found|no such file",
            "a referenced file or resource does not exist",
            "verify the path and create the resource before retrying",
        ),
        rule(
            FingerprintTag::PermissionDenied,
            r"(?i)eacces|eperm|permission denied|access denied",
            "the process lacks permission for the target",
            "adjust ownership or run with the required privileges",
        ),
        rule(
            FingerprintTag::ConnectionTimeout,
            r"(?i)etimedout|econnrefused|econnreset|timed?\s?out|connection",
            "a network peer is unreachable or slow",
            "check connectivity and retry with a longer budget",
        ),
        rule(
            FingerprintTag::MissingDependency,
            r"(?i)cannot find module|module not found|unresolved import|missing dependency",
            "a required dependency is not installed",
            "install the missing package and re-run",
        ),
        rule(
            FingerprintTag::SyntaxError,
            r"(?i)syntax\s?error|unexpected token|unexpected end of|parse error",
            "the proposed source does not parse",
            "fix the reported syntax error before re-validating",
        ),
        rule(
            FingerprintTag::PortInUse,
            r"(?i)eaddrinuse|address already in use|port .* in use",
            "the listen address is already bound",
            "stop the conflicting process or choose another port",
        ),
        rule(
            FingerprintTag::AuthFailure,
            r"(?i)\b401\b|unauthorized|authentication failed|invalid credentials",
            "credentials were rejected",
            "refresh the session secret and re-authorize",
        ),
        rule(
            FingerprintTag::OutOfMemory,
            r"(?i)out of memory|heap limit|enomem",
            "the process exhausted available memory",
            "reduce the working set or raise the memory limit",
        ),
    ]
});

/// Pattern-based error triage
///
/// Every `classify` call appends an issue event to the audit ledger and
/// retains an [`ErrorRecord`], then returns; the caller still owns and
/// propagates the original error.
pub struct ErrorClassifier {
    ledger: Arc<AuditLedger>,
    memory: Arc<SolutionMemory>,
    records: Mutex<Vec<ErrorRecord>>,
}

impl ErrorClassifier {
    /// Build a classifier over the given ledger and solution memory
    #[must_use]
    pub fn new(ledger: Arc<AuditLedger>, memory: Arc<SolutionMemory>) -> Self {
        Self {
            ledger,
            memory,
            records: Mutex::new(Vec::new()),
        }
    }

    /// Classify an error message observed in `context`
    pub fn classify(&self, message: &str, context: &ErrorContext) -> Classification {
        let mut candidates: Vec<Candidate> =
            RULES.iter().filter_map(|r| r.apply(message)).collect();
        if candidates.is_empty() {
            candidates.push(Candidate {
                tag: FingerprintTag::Unclassified,
                cause: "no known fingerprint matched".to_string(),
                remedy: "inspect the full error output and logs".to_string(),
            });
        }

        let severity = derive_severity(message);
        let known_solutions = self.find_similar(message);

        let record = ErrorRecord {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            message: message.to_string(),
            classification: candidates[0].tag,
            context: context.clone(),
            suggested_solutions: candidates.iter().map(|c| c.remedy.clone()).collect(),
            resolved: false,
        };

        self.ledger.append(
            AuditEvent::new(AuditAction::IssueDetected)
                .with("message", message)
                .with("severity", serde_json::json!(severity))
                .with("classification", serde_json::json!(record.classification))
                .with("operation", context.operation.as_str())
                .with("target", context.target.as_str())
                .with("module", context.module.as_str()),
        );
        tracing::warn!(
            target = %context.target,
            operation = %context.operation,
            classification = ?record.classification,
            "error classified"
        );
        self.records.lock().push(record);

        Classification {
            severity,
            candidates,
            known_solutions,
        }
    }

    /// Best-effort lookup of previously successful solutions
    ///
    /// Compares the first [`SIMILARITY_PREFIX_CHARS`] characters of the
    /// normalized message against stored keys, substring in either
    /// direction; returns the most recent succeeded entry per matching key.
    #[must_use]
    pub fn find_similar(&self, message: &str) -> Vec<SolutionEntry> {
        let normalized = SolutionMemory::normalize_key(message);
        let probe: String = normalized.chars().take(SIMILARITY_PREFIX_CHARS).collect();
        if probe.is_empty() {
            return Vec::new();
        }

        let mut matches = Vec::new();
        for key in self.memory.keys() {
            let key_prefix: String = key.chars().take(SIMILARITY_PREFIX_CHARS).collect();
            if key.contains(&probe) || normalized.contains(&key_prefix) {
                if let Some(entry) = self.memory.latest_succeeded(&key) {
                    matches.push(entry);
                }
            }
        }
        matches
    }

    /// Snapshot of retained error records, oldest first
    #[must_use]
    pub fn records(&self) -> Vec<ErrorRecord> {
        self.records.lock().clone()
    }

    /// Mark the most recent unresolved record for `target` as resolved
    ///
    /// Also files `solution` as a succeeded entry under the record's
    /// message, closing the error/solution loop. Returns the updated
    /// record, or `None` when nothing was pending for the target.
    pub fn mark_resolved(&self, target: &str, solution: &str) -> Option<ErrorRecord> {
        let resolved = {
            let mut guard = self.records.lock();
            let record = guard
                .iter_mut()
                .rev()
                .find(|r| r.context.target == target && !r.resolved)?;
            record.resolved = true;
            record.clone()
        };

        if let Err(e) = self.memory.save(&resolved.message, solution, true) {
            tracing::warn!(error = %e, "solution store update failed");
        }
        self.ledger.append(
            AuditEvent::new(AuditAction::SolutionRecorded)
                .with("target", target)
                .with("solution", solution),
        );
        Some(resolved)
    }
}

fn derive_severity(message: &str) -> Severity {
    let lower = message.to_lowercase();
    if lower.contains("fatal") || lower.contains("critical") {
        Severity::Critical
    } else if lower.contains("permission") || lower.contains("unauthorized") {
        Severity::High
    } else {
        // Timeout/connection and everything else triage as medium.
        Severity::Medium
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> ErrorClassifier {
        ErrorClassifier::new(
            Arc::new(AuditLedger::in_memory("test")),
            Arc::new(SolutionMemory::in_memory()),
        )
    }

    #[test]
    fn enoent_matches_not_found() {
        let c = classifier();
        let result = c.classify(
            "ENOENT: no such file or directory, open 'config.json'",
            &ErrorContext::new("read", "config.json", "adapter"),
        );

        assert!(result.candidates.iter().any(|x| x.tag == FingerprintTag::NotFound));
    }

    #[test]
    fn unterminated_source_matches_syntax_error() {
        let c = classifier();
        let result = c.classify(
            "SyntaxError: Unexpected end of input",
            &ErrorContext::new("validate", "app.js", "harness"),
        );

        assert_eq!(result.candidates[0].tag, FingerprintTag::SyntaxError);
    }

    #[test]
    fn unmatched_message_gets_single_generic_candidate() {
        let c = classifier();
        let result = c.classify("zorp happened", &ErrorContext::default());

        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.candidates[0].tag, FingerprintTag::Unclassified);
    }

    #[test]
    fn severity_keyword_heuristics() {
        let c = classifier();
        let ctx = ErrorContext::default();

        assert_eq!(c.classify("FATAL: disk gone", &ctx).severity, Severity::Critical);
        assert_eq!(c.classify("permission denied", &ctx).severity, Severity::High);
        assert_eq!(c.classify("connection timed out", &ctx).severity, Severity::Medium);
        assert_eq!(c.classify("weird failure", &ctx).severity, Severity::Medium);
    }

    #[test]
    fn classify_records_audit_issue_and_error_record() {
        let ledger = Arc::new(AuditLedger::in_memory("test"));
        let c = ErrorClassifier::new(Arc::clone(&ledger), Arc::new(SolutionMemory::in_memory()));

        c.classify("ENOENT", &ErrorContext::new("read", "a.js", "adapter"));

        assert_eq!(ledger.count(AuditAction::IssueDetected), 1);
        let records = c.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].classification, FingerprintTag::NotFound);
        assert!(!records[0].resolved);
    }

    #[test]
    fn find_similar_surfaces_succeeded_solutions() {
        let memory = Arc::new(SolutionMemory::in_memory());
        memory
            .save("cannot find module 'express'", "npm install express", true)
            .unwrap();
        memory
            .save("cannot find module 'express'", "restart editor", false)
            .unwrap();
        let c = ErrorClassifier::new(Arc::new(AuditLedger::in_memory("test")), memory);

        let similar = c.find_similar("Cannot find module 'express' at require");
        assert_eq!(similar.len(), 1);
        assert_eq!(similar[0].solution, "npm install express");
    }

    #[test]
    fn find_similar_ignores_unrelated_keys() {
        let memory = Arc::new(SolutionMemory::in_memory());
        memory.save("port 3000 already in use", "kill -9", true).unwrap();
        let c = ErrorClassifier::new(Arc::new(AuditLedger::in_memory("test")), memory);

        assert!(c.find_similar("ENOENT: missing file").is_empty());
    }

    #[test]
    fn mark_resolved_closes_the_loop() {
        let memory = Arc::new(SolutionMemory::in_memory());
        let c = ErrorClassifier::new(
            Arc::new(AuditLedger::in_memory("test")),
            Arc::clone(&memory),
        );
        c.classify("write failed: EACCES", &ErrorContext::new("write", "app.js", "adapter"));

        let record = c.mark_resolved("app.js", "granted write permission").unwrap();
        assert!(record.resolved);
        assert!(c.records()[0].resolved);

        let saved = memory.get(&record.message);
        assert_eq!(saved.len(), 1);
        assert!(saved[0].succeeded);

        assert!(c.mark_resolved("app.js", "again").is_none());
    }
}
