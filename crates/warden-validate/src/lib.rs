//! Pre-write validation harness
//!
//! A [`ChangeProposal`] is validated before it may enter the approval
//! workflow:
//! 1. the proposed content is written to an isolated staging copy
//! 2. a language-specific syntax check runs against the staging copy
//!    (external checker process with a hard timeout; JSON in-process)
//! 3. a line-positional diff against the original is computed
//! 4. size and credential-scan warnings are attached
//!
//! The result is an immutable [`ValidationVerdict`]. The staging copy is
//! a scratch area for syntax testing only, not a security boundary.

mod diff;
mod error;
mod harness;
mod proposal;
mod scan;
mod staging;
mod syntax;
mod verdict;

pub use diff::{diff_lines, ChangeKind, DiffSummary, LineChange};
pub use error::ValidationError;
pub use harness::{ValidationConfig, ValidationHarness};
pub use proposal::{ChangeProposal, LanguageKind};
pub use scan::scan_for_secrets;
pub use staging::StagingArea;
pub use syntax::SyntaxReport;
pub use verdict::{Overall, ValidationVerdict};
