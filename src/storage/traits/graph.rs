//! Graph backend trait for the clinical property graph store.
//!
//! The store is an external collaborator reached only through this contract:
//! idempotent node merges keyed on a label and key tuple, idempotent edge
//! merges between already-merged nodes, aggregate counts, and a bounded edge
//! enumeration.
//!
//! # Available Implementations
//!
//! | Backend | Use Case | Features |
//! |---------|----------|----------|
//! | `SqliteGraphBackend` | Default; embedded | Upsert via `ON CONFLICT`, per-record transactions |
//! | `InMemoryGraphBackend` | Testing | Fast, no persistence |
//!
//! # Error Modes and Guarantees
//!
//! | Operation | Guarantee |
//! |-----------|-----------|
//! | `merge_node` | Exactly one node per key; non-key properties overwritten |
//! | `merge_edge` | Exactly one edge per (from, to, type); fails if an endpoint is missing |
//! | `edges` | Insertion order, at most `limit` rows |
//!
//! All backends return `Result<T>` with errors propagated via [`crate::Error`].
//! There is no cross-record atomicity; `merge_nodes` and `merge_edges` are
//! atomic per call only where the backend supports transactions.

use crate::Result;
use crate::models::{EdgeType, EdgeView, GraphEdge, GraphNode, NodeId, NodeLabel};
use std::collections::HashMap;

/// Trait for graph store backends.
///
/// # Implementor Notes
///
/// - Methods use `&self` to enable sharing via `Arc<dyn GraphBackend>`
/// - Use interior mutability (e.g., `Mutex<Connection>`) for mutable state
/// - Node identity is [`NodeId::for_key`]; never create a second node for a key
/// - `merge_edge` must match existing endpoints and never create them
pub trait GraphBackend: Send + Sync {
    // ========================================================================
    // Merge Operations
    // ========================================================================

    /// Merges a node, matched solely on its key.
    ///
    /// Creates the node if absent; otherwise overwrites its non-key properties.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn merge_node(&self, node: &GraphNode) -> Result<NodeId>;

    /// Merges every node derived from one record.
    ///
    /// Backends with transactions apply the whole slice atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if any merge fails.
    fn merge_nodes(&self, nodes: &[GraphNode]) -> Result<usize> {
        for node in nodes {
            self.merge_node(node)?;
        }
        Ok(nodes.len())
    }

    /// Merges a directed edge between two existing nodes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MissingEndpoint`] if either endpoint has not been
    /// merged, or an error if the storage operation fails.
    fn merge_edge(&self, edge: &GraphEdge) -> Result<()>;

    /// Merges every edge derived from one record.
    ///
    /// # Errors
    ///
    /// Returns an error if any merge fails.
    fn merge_edges(&self, edges: &[GraphEdge]) -> Result<usize> {
        for edge in edges {
            self.merge_edge(edge)?;
        }
        Ok(edges.len())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Retrieves a node by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn get_node(&self, id: &NodeId) -> Result<Option<GraphNode>>;

    /// Enumerates up to `limit` edges with both endpoints materialized.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn edges(&self, limit: usize) -> Result<Vec<EdgeView>>;

    /// Returns aggregate counts for the whole store.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn stats(&self) -> Result<GraphStats>;

    /// Clears all graph data.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    fn clear(&self) -> Result<()>;
}

/// Aggregate counts over the whole store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphStats {
    /// Total number of nodes.
    pub node_count: usize,
    /// Number of nodes by label.
    pub nodes_by_label: HashMap<NodeLabel, usize>,
    /// Total number of edges.
    pub relationship_count: usize,
    /// Number of edges by type.
    pub relationships_by_type: HashMap<EdgeType, usize>,
}

impl GraphStats {
    /// Creates empty stats.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_stats_default() {
        let stats = GraphStats::default();
        assert_eq!(stats.node_count, 0);
        assert_eq!(stats.relationship_count, 0);
        assert!(stats.nodes_by_label.is_empty());
    }
}
