//! Graph storage backends for the clinical property graph.
//!
//! This module provides implementations of the [`GraphBackend`] trait for
//! merging nodes and edges and enumerating them back out.
//!
//! # Available Backends
//!
//! | Backend | Use Case | Features |
//! |---------|----------|----------|
//! | [`SqliteGraphBackend`] | Default; embedded | `ON CONFLICT` upserts, batch transactions |
//! | [`InMemoryGraphBackend`] | Testing | Fast, no persistence |
//!
//! # Example
//!
//! ```rust,ignore
//! use clinigraph::models::{GraphNode, NodeKey, NodeLabel};
//! use clinigraph::storage::graph::SqliteGraphBackend;
//! use clinigraph::storage::traits::GraphBackend;
//!
//! let backend = SqliteGraphBackend::new("graph.db")?;
//! let node = GraphNode::new(NodeKey::new(NodeLabel::Diagnosis).with("description", "flu"));
//! backend.merge_node(&node)?;
//! backend.close()?;
//! ```

mod memory;
mod sqlite;

pub use memory::InMemoryGraphBackend;
pub use sqlite::SqliteGraphBackend;

// Re-export trait for convenience
pub use crate::storage::traits::graph::{GraphBackend, GraphStats};
