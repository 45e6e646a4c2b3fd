//! Core configuration
//!
//! Every tunable threshold lives here, with defaults and
//! `WARDEN_`-prefixed environment overrides. Unparseable overrides fall
//! back to the default with a warning.

use std::path::PathBuf;
use std::time::Duration;
use warden_validate::ValidationConfig;

/// Configuration for the governance core
#[derive(Debug, Clone)]
pub struct WardenConfig {
    /// Default credential session lifetime
    pub session_ttl: Duration,
    /// Fraction of the TTL remaining at which auto-renewal fires
    pub renew_threshold: f64,
    /// Wall-clock budget for one external syntax check
    pub syntax_timeout: Duration,
    /// Character count above which validation warns
    pub max_content_chars: usize,
    /// Line count above which validation warns
    pub max_content_lines: usize,
    /// Directory for staging copies
    pub staging_dir: PathBuf,
    /// Directory for audit JSONL files; `None` keeps the ledger in memory
    pub audit_dir: Option<PathBuf>,
    /// Directory for approval artifacts; `None` keeps requests in memory
    pub records_dir: Option<PathBuf>,
    /// Backing file for the solution store; `None` keeps it in memory
    pub solutions_path: Option<PathBuf>,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(30 * 60),
            renew_threshold: 0.20,
            syntax_timeout: Duration::from_secs(10),
            max_content_chars: 1_000_000,
            max_content_lines: 10_000,
            staging_dir: std::env::temp_dir().join("warden-staging"),
            audit_dir: None,
            records_dir: None,
            solutions_path: None,
        }
    }
}

impl WardenConfig {
    /// Default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with `WARDEN_*` environment variables
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(secs) = env_parse::<u64>("WARDEN_SESSION_TTL_SECS") {
            config.session_ttl = Duration::from_secs(secs);
        }
        if let Some(threshold) = env_parse::<f64>("WARDEN_RENEW_THRESHOLD") {
            config.renew_threshold = threshold.clamp(0.0, 1.0);
        }
        if let Some(secs) = env_parse::<u64>("WARDEN_SYNTAX_TIMEOUT_SECS") {
            config.syntax_timeout = Duration::from_secs(secs);
        }
        if let Some(chars) = env_parse::<usize>("WARDEN_MAX_CONTENT_CHARS") {
            config.max_content_chars = chars;
        }
        if let Some(lines) = env_parse::<usize>("WARDEN_MAX_CONTENT_LINES") {
            config.max_content_lines = lines;
        }
        if let Ok(dir) = std::env::var("WARDEN_STAGING_DIR") {
            config.staging_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("WARDEN_AUDIT_DIR") {
            config.audit_dir = Some(PathBuf::from(dir));
        }
        if let Ok(dir) = std::env::var("WARDEN_RECORDS_DIR") {
            config.records_dir = Some(PathBuf::from(dir));
        }
        if let Ok(path) = std::env::var("WARDEN_SOLUTIONS_PATH") {
            config.solutions_path = Some(PathBuf::from(path));
        }

        config
    }

    /// With a staging directory
    #[must_use]
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    /// With a durable audit directory
    #[must_use]
    pub fn with_audit_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.audit_dir = Some(dir.into());
        self
    }

    /// With a durable approval-artifact directory
    #[must_use]
    pub fn with_records_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.records_dir = Some(dir.into());
        self
    }

    /// With a backing file for the solution store
    #[must_use]
    pub fn with_solutions_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.solutions_path = Some(path.into());
        self
    }

    /// With a session TTL
    #[must_use]
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// The validation-harness slice of this configuration
    #[must_use]
    pub fn validation(&self) -> ValidationConfig {
        ValidationConfig {
            staging_dir: self.staging_dir.clone(),
            syntax_timeout: self.syntax_timeout,
            max_content_chars: self.max_content_chars,
            max_content_lines: self.max_content_lines,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, raw, "unparseable configuration override ignored");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_thresholds() {
        let config = WardenConfig::default();
        assert_eq!(config.session_ttl, Duration::from_secs(1800));
        assert!((config.renew_threshold - 0.20).abs() < f64::EPSILON);
        assert_eq!(config.max_content_chars, 1_000_000);
        assert_eq!(config.max_content_lines, 10_000);
    }

    #[test]
    fn builder_methods_override() {
        let config = WardenConfig::new()
            .with_session_ttl(Duration::from_secs(60))
            .with_staging_dir("/tmp/stage")
            .with_audit_dir("/tmp/audit");

        assert_eq!(config.session_ttl, Duration::from_secs(60));
        assert_eq!(config.staging_dir, PathBuf::from("/tmp/stage"));
        assert_eq!(config.audit_dir, Some(PathBuf::from("/tmp/audit")));
    }

    #[test]
    fn validation_slice_carries_thresholds() {
        let config = WardenConfig::new().with_staging_dir("/tmp/s");
        let validation = config.validation();
        assert_eq!(validation.staging_dir, PathBuf::from("/tmp/s"));
        assert_eq!(validation.max_content_lines, 10_000);
    }
}
