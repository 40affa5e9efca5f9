//! # Clinigraph
//!
//! Builds a typed property graph from tabular clinical records and renders a
//! navigable 3D view of a sample of it.
//!
//! Each record is resolved into a fixed set of sixteen node types (patients,
//! admissions, diagnoses, medications, tests and their attributes) joined by
//! seventeen relationship types. Nodes are identified purely by their key
//! attributes, so ingesting the same batch any number of times leaves the
//! store with exactly one node per key and one edge per endpoint pair.
//!
//! ## Pipeline
//!
//! 1. [`io::CsvRecordSource`] reads a bounded sample of normalized records
//! 2. [`services::EntityResolver`] derives node keys and edges per record
//! 3. [`services::GraphIngestService`] merges all nodes, then all edges
//! 4. [`services::GraphSampler`] enumerates labelled edges, dropping unknowns
//! 5. [`layout::SpringLayout`] places every sampled node in 3D
//! 6. [`rendering::SceneBuilder`] writes a static HTML scene
//!
//! ## Example
//!
//! ```rust,ignore
//! use clinigraph::config::ClinigraphConfig;
//! use clinigraph::services::GraphPipeline;
//!
//! let pipeline = GraphPipeline::new(ClinigraphConfig::default());
//! let summary = pipeline.run("admissions.csv".as_ref())?;
//! println!("{}", serde_json::to_string(&summary)?);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use std::path::PathBuf;
use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod io;
pub mod layout;
pub mod models;
pub mod observability;
pub mod rendering;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use config::ClinigraphConfig;
pub use models::{EdgeType, GraphNode, NodeId, NodeKey, NodeLabel, Record, UNKNOWN};
pub use services::{EntityResolver, GraphIngestService, GraphPipeline, GraphSampler, GraphSummary};
pub use storage::{GraphBackend, InMemoryGraphBackend, SqliteGraphBackend};

/// Error type for clinigraph operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Malformed CSV, bad configuration values |
/// | `InputNotFound` | The input file does not exist |
/// | `OperationFailed` | Store, filesystem, or serialization failures |
/// | `MissingEndpoint` | An edge references a node that was never merged |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The input file could not be found.
    ///
    /// Raised before any store connection is opened.
    #[error("file at {} does not exist", path.display())]
    InputNotFound {
        /// Path that was requested.
        path: PathBuf,
    },

    /// An operation failed.
    ///
    /// Raised when:
    /// - `SQLite` statements fail or the store cannot be opened
    /// - Filesystem I/O errors occur while writing artifacts
    /// - JSON serialization fails
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A relationship endpoint does not exist in the store.
    #[error("edge {edge_type} references missing node {endpoint}")]
    MissingEndpoint {
        /// Wire name of the edge type.
        edge_type: String,
        /// Display form of the missing endpoint key.
        endpoint: String,
    },
}

impl Error {
    /// Builds an [`Error::OperationFailed`] from an operation name and cause.
    pub fn operation(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for clinigraph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Falls back to 0 if the system clock is before the Unix epoch.
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
