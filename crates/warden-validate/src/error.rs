//! Validation error types

/// Errors raised while staging or syntax-checking a proposal
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// The staging copy could not be written
    #[error("staging failed for '{target}': {source}")]
    Staging {
        /// Target the proposal addressed
        target: String,
        /// Underlying io failure
        #[source]
        source: std::io::Error,
    },

    /// The external checker exceeded its wall-clock budget
    ///
    /// The checker subprocess is terminated before this is raised.
    #[error("syntax check for {language} timed out after {budget_secs}s")]
    Timeout {
        /// Language whose checker overran
        language: &'static str,
        /// Budget that was exceeded, in seconds
        budget_secs: u64,
    },

    /// Reading the staged copy or collecting checker output failed
    #[error("syntax check io failure: {0}")]
    Io(#[from] std::io::Error),
}
