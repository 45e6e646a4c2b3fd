//! Credential pre-flight scan
//!
//! Flags assignments that look like hardcoded secrets (api keys, tokens,
//! passwords) in proposed content. Findings are advisory: they become
//! verdict warnings for the human reviewer and never fail validation.

use once_cell::sync::Lazy;
use regex::Regex;

static SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)(api[_-]?key|secret|password|auth[_-]?token|private[_-]?key|access[_-]?token)\s*=\s*['"][a-zA-Z0-9_\-]{10,}['"]"#,
    )
    .expect("secret pattern must compile")
});

/// Scan `content` for likely hardcoded credentials
///
/// Returns one warning per offending line, with its 1-based line number.
#[must_use]
pub fn scan_for_secrets(content: &str) -> Vec<String> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| SECRET_PATTERN.is_match(line))
        .map(|(i, _)| format!("possible hardcoded credential on line {}", i + 1))
        .collect()
}
