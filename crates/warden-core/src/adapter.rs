//! Content adapter contract
//!
//! The governance core never touches external resources directly; reads
//! and approved writes go through a [`ContentAdapter`] supplied by the
//! embedder (document store, browser bridge, HTTP client, ...). The core
//! calls `write_approved` only for requests that are approved and pass
//! the authorization gate.

use async_trait::async_trait;
use dashmap::DashMap;

/// Failures crossing the adapter boundary
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The target does not exist on the external side
    #[error("target '{0}' not found")]
    NotFound(String),
    /// The external operation failed
    #[error("adapter {operation} failed for '{target}': {source}")]
    Failed {
        /// Operation being performed ("read" or "write")
        operation: &'static str,
        /// Target of the operation
        target: String,
        /// Underlying failure
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Bridge between the governance core and an external resource
#[async_trait]
pub trait ContentAdapter: Send + Sync {
    /// Current content of `target_id`
    ///
    /// # Errors
    /// [`AdapterError::NotFound`] when the target does not exist yet.
    async fn read_current(&self, target_id: &str) -> Result<String, AdapterError>;

    /// Write approved content to `target_id`
    ///
    /// Called only after approval and an open authorization gate.
    ///
    /// # Errors
    /// [`AdapterError::Failed`] when the external write fails.
    async fn write_approved(&self, target_id: &str, content: &str) -> Result<(), AdapterError>;
}

/// In-memory adapter for tests and self-contained embeddings
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    contents: DashMap<String, String>,
}

impl MemoryAdapter {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a target's content
    pub fn seed(&self, target_id: impl Into<String>, content: impl Into<String>) {
        self.contents.insert(target_id.into(), content.into());
    }

    /// Read a target without going through the adapter contract
    #[must_use]
    pub fn content(&self, target_id: &str) -> Option<String> {
        self.contents.get(target_id).map(|c| c.clone())
    }
}

#[async_trait]
impl ContentAdapter for MemoryAdapter {
    async fn read_current(&self, target_id: &str) -> Result<String, AdapterError> {
        self.contents
            .get(target_id)
            .map(|c| c.clone())
            .ok_or_else(|| AdapterError::NotFound(target_id.to_string()))
    }

    async fn write_approved(&self, target_id: &str, content: &str) -> Result<(), AdapterError> {
        self.contents
            .insert(target_id.to_string(), content.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_missing_target_is_not_found() {
        let adapter = MemoryAdapter::new();
        let err = adapter.read_current("ghost.txt").await.unwrap_err();
        assert!(matches!(err, AdapterError::NotFound(t) if t == "ghost.txt"));
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let adapter = MemoryAdapter::new();
        adapter.write_approved("notes.txt", "hello").await.unwrap();
        assert_eq!(adapter.read_current("notes.txt").await.unwrap(), "hello");
    }
}
