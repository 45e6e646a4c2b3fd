//! Change proposals and language dispatch

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Language of the proposed content, selecting the syntax checker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageKind {
    /// Checked with `node --check`
    JavaScript,
    /// No checker wired; validated permissively with a warning
    TypeScript,
    /// Checked with `python3 -m py_compile`
    Python,
    /// Parsed in-process with serde_json
    Json,
    /// Plain text; no syntax semantics
    Text,
}

impl LanguageKind {
    /// Infer the language from a target id's file extension
    #[must_use]
    pub fn from_target(target_id: &str) -> Self {
        match Path::new(target_id)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
        {
            "js" | "jsx" | "mjs" => LanguageKind::JavaScript,
            "ts" | "tsx" => LanguageKind::TypeScript,
            "py" => LanguageKind::Python,
            "json" => LanguageKind::Json,
            _ => LanguageKind::Text,
        }
    }

    /// Human-readable name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            LanguageKind::JavaScript => "javascript",
            LanguageKind::TypeScript => "typescript",
            LanguageKind::Python => "python",
            LanguageKind::Json => "json",
            LanguageKind::Text => "text",
        }
    }
}

/// A candidate content mutation awaiting validation
///
/// Ephemeral: created per call and consumed by the harness and workflow.
#[derive(Debug, Clone)]
pub struct ChangeProposal {
    /// Identifier of the content being changed (path, document id, ...)
    pub target_id: String,
    /// Content currently live at the target
    pub original: String,
    /// Content the agent wants to write
    pub proposed: String,
    /// Why the agent proposes this change
    pub rationale: String,
    /// Language of the proposed content
    pub language: LanguageKind,
}

impl ChangeProposal {
    /// Build a proposal, inferring the language from the target id
    #[must_use]
    pub fn new(
        target_id: impl Into<String>,
        original: impl Into<String>,
        proposed: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Self {
        let target_id = target_id.into();
        let language = LanguageKind::from_target(&target_id);
        Self {
            target_id,
            original: original.into(),
            proposed: proposed.into(),
            rationale: rationale.into(),
            language,
        }
    }

    /// Override the inferred language
    #[must_use]
    pub fn with_language(mut self, language: LanguageKind) -> Self {
        self.language = language;
        self
    }
}
