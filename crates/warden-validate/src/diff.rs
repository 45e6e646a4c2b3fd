//! Line-positional comparison
//!
//! Lines are compared index-by-index up to `max(len(original),
//! len(proposed))`. A purely inserted or deleted line shifts every
//! subsequent index, so lines past the shift point report as modified
//! rather than added/removed. This is a documented property of the
//! algorithm, kept deliberately; consumers needing a minimal edit script
//! should diff elsewhere.

use serde::{Deserialize, Serialize};

/// Kind of change at one line position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Line exists only in the proposed content
    Added,
    /// Line exists only in the original content
    Removed,
    /// Line differs between original and proposed
    Modified,
}

/// One changed line position (1-based)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineChange {
    /// 1-based line number
    pub line: usize,
    /// What happened at this position
    pub kind: ChangeKind,
    /// Original line, absent for additions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    /// Proposed line, absent for removals
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposed: Option<String>,
}

/// Positional diff counters with per-line details
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSummary {
    /// Lines present only in the proposed content
    pub added: usize,
    /// Lines present only in the original content
    pub removed: usize,
    /// Lines differing at the same position
    pub modified: usize,
    /// Every changed position, in line order
    pub details: Vec<LineChange>,
}

impl DiffSummary {
    /// Whether the contents compared identical
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.added == 0 && self.removed == 0 && self.modified == 0
    }
}

/// Compare `original` and `proposed` position by position
#[must_use]
pub fn diff_lines(original: &str, proposed: &str) -> DiffSummary {
    let old: Vec<&str> = original.lines().collect();
    let new: Vec<&str> = proposed.lines().collect();
    let mut summary = DiffSummary::default();

    for i in 0..old.len().max(new.len()) {
        match (old.get(i), new.get(i)) {
            (Some(a), Some(b)) if a != b => {
                summary.modified += 1;
                summary.details.push(LineChange {
                    line: i + 1,
                    kind: ChangeKind::Modified,
                    original: Some((*a).to_string()),
                    proposed: Some((*b).to_string()),
                });
            }
            (None, Some(b)) => {
                summary.added += 1;
                summary.details.push(LineChange {
                    line: i + 1,
                    kind: ChangeKind::Added,
                    original: None,
                    proposed: Some((*b).to_string()),
                });
            }
            (Some(a), None) => {
                summary.removed += 1;
                summary.details.push(LineChange {
                    line: i + 1,
                    kind: ChangeKind::Removed,
                    original: Some((*a).to_string()),
                    proposed: None,
                });
            }
            _ => {}
        }
    }

    summary
}
