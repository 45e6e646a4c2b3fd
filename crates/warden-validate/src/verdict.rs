//! Validation verdicts

use crate::diff::DiffSummary;
use serde::{Deserialize, Serialize};

/// Final pass/fail decision for a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Overall {
    /// Proposal may enter the approval workflow
    Pass,
    /// Proposal must not proceed
    Fail,
}

/// Immutable result of validating one proposal
///
/// Produced once per proposal by the harness; `overall` is `Pass` iff the
/// syntax check accepted the content and the proposed content is
/// non-empty. Oversized content only warns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationVerdict {
    /// Whether the syntax check accepted the content
    pub syntax_valid: bool,
    /// Fatal findings
    pub errors: Vec<String>,
    /// Advisory findings (size, credential scan, unwired checkers)
    pub warnings: Vec<String>,
    /// Positional comparison against the original content
    pub diff_summary: DiffSummary,
    /// Final decision
    pub overall: Overall,
}

impl ValidationVerdict {
    /// Whether the verdict allows an approval request
    #[must_use]
    pub fn passed(&self) -> bool {
        self.overall == Overall::Pass
    }
}
