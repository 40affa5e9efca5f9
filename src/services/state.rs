//! Readiness marker for the host application.
//!
//! After a successful run a small JSON document is written so the host can
//! tell that a knowledge graph is available without querying the store.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Contents of the marker file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphState {
    /// True once a graph has been built.
    pub knowledge_graph_ready: bool,
}

/// Reads and writes the readiness marker.
#[derive(Debug, Clone)]
pub struct GraphStateMarker {
    path: PathBuf,
}

impl GraphStateMarker {
    /// Creates a marker at the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the marker path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records that the graph is ready.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn mark_ready(&self) -> Result<()> {
        let state = GraphState {
            knowledge_graph_ready: true,
        };
        let json = serde_json::to_string(&state).map_err(|e| Error::OperationFailed {
            operation: "serialize_graph_state".to_string(),
            cause: e.to_string(),
        })?;
        std::fs::write(&self.path, json).map_err(|e| Error::OperationFailed {
            operation: "write_graph_state".to_string(),
            cause: format!("{}: {e}", self.path.display()),
        })?;
        tracing::debug!(path = %self.path.display(), "Marked knowledge graph ready");
        Ok(())
    }

    /// Returns true if the marker exists and says the graph is ready.
    ///
    /// A missing or unreadable marker reads as not ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|contents| serde_json::from_str::<GraphState>(&contents).ok())
            .is_some_and(|state| state.knowledge_graph_ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mark_ready() {
        let dir = TempDir::new().unwrap();
        let marker = GraphStateMarker::new(dir.path().join("knowledge_graph_state.json"));

        assert!(!marker.is_ready());
        marker.mark_ready().unwrap();
        assert!(marker.is_ready());

        let contents = std::fs::read_to_string(marker.path()).unwrap();
        assert_eq!(contents, r#"{"knowledge_graph_ready":true}"#);
    }

    #[test]
    fn test_malformed_marker_is_not_ready() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(!GraphStateMarker::new(path).is_ready());
    }

    #[test]
    fn test_unwritable_marker_fails() {
        let marker = GraphStateMarker::new("/nonexistent/dir/state.json");
        assert!(marker.mark_ready().is_err());
    }
}
