//! In-memory graph backend for testing.
//!
//! Provides a fast, non-persistent implementation of [`GraphBackend`] with the
//! same merge semantics as the `SQLite` backend, so services can be exercised
//! against it without touching disk.

use crate::models::{EdgeType, EdgeView, GraphEdge, GraphNode, NodeId};
use crate::storage::traits::graph::{GraphBackend, GraphStats};
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// Stored edge: type plus endpoint IDs.
type EdgeRow = (EdgeType, NodeId, NodeId);

/// In-memory graph backend for testing.
///
/// Uses `RwLock` for thread-safe access with reader-writer semantics.
/// Locks are always taken nodes first, then edges.
///
/// # Example
///
/// ```rust
/// use clinigraph::models::{GraphNode, NodeKey, NodeLabel};
/// use clinigraph::storage::{GraphBackend, InMemoryGraphBackend};
///
/// let backend = InMemoryGraphBackend::new();
/// let node = GraphNode::new(NodeKey::new(NodeLabel::Route).with("route", "PO"));
/// backend.merge_node(&node).unwrap();
/// backend.merge_node(&node).unwrap();
/// assert_eq!(backend.node_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryGraphBackend {
    nodes: RwLock<HashMap<NodeId, GraphNode>>,
    edges: RwLock<EdgeTable>,
}

/// Edges in insertion order with a uniqueness index.
#[derive(Debug, Default)]
struct EdgeTable {
    rows: Vec<EdgeRow>,
    index: HashSet<EdgeRow>,
}

impl InMemoryGraphBackend {
    /// Creates a new empty in-memory graph backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of nodes stored.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.read().map(|n| n.len()).unwrap_or(0)
    }

    /// Returns the number of edges stored.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.read().map(|e| e.rows.len()).unwrap_or(0)
    }
}

impl GraphBackend for InMemoryGraphBackend {
    fn merge_node(&self, node: &GraphNode) -> Result<NodeId> {
        let mut nodes = self.nodes.write().map_err(|_| Error::OperationFailed {
            operation: "merge_node".to_string(),
            cause: "Lock poisoned".to_string(),
        })?;

        let id = node.id();
        nodes
            .entry(id.clone())
            .and_modify(|existing| existing.properties.clone_from(&node.properties))
            .or_insert_with(|| node.clone());

        Ok(id)
    }

    fn merge_edge(&self, edge: &GraphEdge) -> Result<()> {
        let nodes = self.nodes.read().map_err(|_| Error::OperationFailed {
            operation: "merge_edge".to_string(),
            cause: "Lock poisoned".to_string(),
        })?;

        let from = edge.from.id();
        let to = edge.to.id();
        for (id, key) in [(&from, &edge.from), (&to, &edge.to)] {
            if !nodes.contains_key(id) {
                return Err(Error::MissingEndpoint {
                    edge_type: edge.edge_type.to_string(),
                    endpoint: key.to_string(),
                });
            }
        }

        let mut edges = self.edges.write().map_err(|_| Error::OperationFailed {
            operation: "merge_edge".to_string(),
            cause: "Lock poisoned".to_string(),
        })?;

        let row = (edge.edge_type, from, to);
        if edges.index.insert(row.clone()) {
            edges.rows.push(row);
        }

        Ok(())
    }

    fn get_node(&self, id: &NodeId) -> Result<Option<GraphNode>> {
        let nodes = self.nodes.read().map_err(|_| Error::OperationFailed {
            operation: "get_node".to_string(),
            cause: "Lock poisoned".to_string(),
        })?;

        Ok(nodes.get(id).cloned())
    }

    fn edges(&self, limit: usize) -> Result<Vec<EdgeView>> {
        let nodes = self.nodes.read().map_err(|_| Error::OperationFailed {
            operation: "edges".to_string(),
            cause: "Lock poisoned".to_string(),
        })?;
        let edges = self.edges.read().map_err(|_| Error::OperationFailed {
            operation: "edges".to_string(),
            cause: "Lock poisoned".to_string(),
        })?;

        Ok(edges
            .rows
            .iter()
            .filter_map(|(edge_type, from, to)| {
                Some(EdgeView {
                    edge_type: *edge_type,
                    from: nodes.get(from)?.clone(),
                    to: nodes.get(to)?.clone(),
                })
            })
            .take(limit)
            .collect())
    }

    fn stats(&self) -> Result<GraphStats> {
        let nodes = self.nodes.read().map_err(|_| Error::OperationFailed {
            operation: "stats".to_string(),
            cause: "Lock poisoned".to_string(),
        })?;
        let edges = self.edges.read().map_err(|_| Error::OperationFailed {
            operation: "stats".to_string(),
            cause: "Lock poisoned".to_string(),
        })?;

        let mut stats = GraphStats {
            node_count: nodes.len(),
            relationship_count: edges.rows.len(),
            ..GraphStats::default()
        };
        for node in nodes.values() {
            *stats.nodes_by_label.entry(node.label()).or_insert(0) += 1;
        }
        for (edge_type, _, _) in &edges.rows {
            *stats.relationships_by_type.entry(*edge_type).or_insert(0) += 1;
        }

        Ok(stats)
    }

    fn clear(&self) -> Result<()> {
        let mut nodes = self.nodes.write().map_err(|_| Error::OperationFailed {
            operation: "clear".to_string(),
            cause: "Lock poisoned".to_string(),
        })?;
        let mut edges = self.edges.write().map_err(|_| Error::OperationFailed {
            operation: "clear".to_string(),
            cause: "Lock poisoned".to_string(),
        })?;

        nodes.clear();
        edges.rows.clear();
        edges.index.clear();
        Ok(())
    }
}
