//! The validation harness

use crate::diff::{diff_lines, DiffSummary};
use crate::error::ValidationError;
use crate::proposal::{ChangeProposal, LanguageKind};
use crate::scan::scan_for_secrets;
use crate::staging::StagingArea;
use crate::syntax::{check_syntax, SyntaxReport};
use crate::verdict::{Overall, ValidationVerdict};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Harness thresholds and locations
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Directory holding staging copies
    pub staging_dir: PathBuf,
    /// Wall-clock budget for one external syntax check
    pub syntax_timeout: Duration,
    /// Character count above which a size warning is attached
    pub max_content_chars: usize,
    /// Line count above which a size warning is attached
    pub max_content_lines: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            staging_dir: std::env::temp_dir().join("warden-staging"),
            syntax_timeout: Duration::from_secs(10),
            max_content_chars: 1_000_000,
            max_content_lines: 10_000,
        }
    }
}

/// Stages proposals, syntax-checks them, and produces verdicts
#[derive(Debug, Clone)]
pub struct ValidationHarness {
    config: ValidationConfig,
    staging: StagingArea,
}

impl ValidationHarness {
    /// Build a harness over `config`
    #[must_use]
    pub fn new(config: ValidationConfig) -> Self {
        let staging = StagingArea::new(config.staging_dir.clone());
        Self { config, staging }
    }

    /// Harness configuration
    #[must_use]
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Write the staging copy for a proposal
    ///
    /// # Errors
    /// Returns [`ValidationError::Staging`] on io failure.
    pub async fn stage(&self, target_id: &str, content: &str) -> Result<PathBuf, ValidationError> {
        self.staging.stage(target_id, content).await
    }

    /// Syntax-check a staged copy
    ///
    /// # Errors
    /// Returns [`ValidationError::Timeout`] if the checker overruns its
    /// budget; launch failures degrade to a passing report with a warning.
    pub async fn check_syntax(
        &self,
        staged: &Path,
        language: LanguageKind,
    ) -> Result<SyntaxReport, ValidationError> {
        check_syntax(staged, language, self.config.syntax_timeout).await
    }

    /// Positional line diff of original versus proposed content
    #[must_use]
    pub fn diff(&self, original: &str, proposed: &str) -> DiffSummary {
        diff_lines(original, proposed)
    }

    /// Stage, check, diff, and decide
    ///
    /// `overall` is `Pass` iff the syntax check accepted the content and
    /// the proposed content is non-empty. Oversized content and credential
    /// findings attach warnings without failing the verdict.
    ///
    /// # Errors
    /// Returns [`ValidationError`] on staging io failure or checker timeout.
    pub async fn evaluate(
        &self,
        proposal: &ChangeProposal,
    ) -> Result<ValidationVerdict, ValidationError> {
        let staged = self.stage(&proposal.target_id, &proposal.proposed).await?;
        let syntax = self.check_syntax(&staged, proposal.language).await?;

        let mut errors = syntax.errors;
        let mut warnings = syntax.warnings;

        if proposal.proposed.chars().count() > self.config.max_content_chars {
            warnings.push(format!(
                "proposed content exceeds {} characters",
                self.config.max_content_chars
            ));
        }
        if proposal.proposed.lines().count() > self.config.max_content_lines {
            warnings.push(format!(
                "proposed content exceeds {} lines",
                self.config.max_content_lines
            ));
        }
        warnings.extend(scan_for_secrets(&proposal.proposed));

        let empty = proposal.proposed.is_empty();
        if empty {
            errors.push("proposed content is empty".to_string());
        }

        let overall = if syntax.valid && !empty {
            Overall::Pass
        } else {
            Overall::Fail
        };

        tracing::debug!(
            target = %proposal.target_id,
            language = proposal.language.name(),
            syntax_valid = syntax.valid,
            pass = overall == Overall::Pass,
            "proposal evaluated"
        );

        Ok(ValidationVerdict {
            syntax_valid: syntax.valid,
            errors,
            warnings,
            diff_summary: diff_lines(&proposal.original, &proposal.proposed),
            overall,
        })
    }
}

impl Default for ValidationHarness {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}
