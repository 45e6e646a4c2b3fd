//! Error triage and solution memory
//!
//! Provides:
//! - [`SolutionMemory`] - bounded, persisted store of past problem/solution
//!   pairs (at most 10 entries per problem key, oldest dropped)
//! - [`ErrorClassifier`] - fingerprint-based triage of error messages that
//!   records every classified failure in the audit ledger and consults the
//!   solution memory for previously successful remedies
//!
//! Classification never suppresses the original error; callers classify,
//! then propagate.

mod classifier;
mod memory;

pub use classifier::{
    Candidate, Classification, ErrorClassifier, ErrorContext, ErrorRecord, FingerprintTag,
    Severity,
};
pub use memory::{MemoryError, SolutionEntry, SolutionMemory, MAX_ENTRIES_PER_KEY};
