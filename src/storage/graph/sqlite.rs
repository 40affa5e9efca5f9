//! `SQLite` graph backend for the clinical property graph.
//!
//! Nodes and edges are stored in two tables and merged with `ON CONFLICT`
//! upserts, so replaying a batch never duplicates anything.

// Allow cast_possible_truncation and cast_sign_loss for SQLite i64 to usize conversions.
// SQLite returns i64, but counts are inherently non-negative.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
// Allow cast_possible_wrap - usize to i64 casts for LIMIT parameters won't wrap.
#![allow(clippy::cast_possible_wrap)]

use crate::models::{EdgeType, EdgeView, GraphEdge, GraphNode, NodeId, NodeKey, NodeLabel};
use crate::storage::traits::graph::{GraphBackend, GraphStats};
use crate::{Error, Result, current_timestamp};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::instrument;

/// Helper to acquire mutex lock with poison recovery.
fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("Graph SQLite mutex was poisoned, recovering");
            metrics::counter!("graph_sqlite_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// `SQLite`-based graph backend.
///
/// # Concurrency Model
///
/// Uses a `Mutex<Connection>` for thread-safe access. WAL mode and `busy_timeout`
/// handle concurrent access gracefully.
///
/// # Schema
///
/// Two tables store the graph:
/// - `graph_nodes`: one row per node key, with key values and properties as JSON
/// - `graph_edges`: directed typed edges, unique per (from, to, type)
pub struct SqliteGraphBackend {
    /// Connection to the `SQLite` database.
    conn: Mutex<Connection>,
    /// Path to the database (None for in-memory).
    db_path: Option<PathBuf>,
}

/// Raw node columns as read from a row.
struct NodeRow {
    label: String,
    key_json: String,
    properties_json: Option<String>,
}

impl NodeRow {
    fn into_node(self) -> Result<GraphNode> {
        let label = NodeLabel::parse(&self.label).ok_or_else(|| Error::OperationFailed {
            operation: "parse_graph_node".to_string(),
            cause: format!("unknown node label: {}", self.label),
        })?;
        let values: Vec<(String, String)> =
            serde_json::from_str(&self.key_json).map_err(|e| Error::OperationFailed {
                operation: "parse_graph_node_key".to_string(),
                cause: e.to_string(),
            })?;
        let properties: BTreeMap<String, String> = self
            .properties_json
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();

        Ok(GraphNode {
            key: NodeKey { label, values },
            properties,
        })
    }
}

impl SqliteGraphBackend {
    /// Creates a new `SQLite` graph backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        let conn = Connection::open(&db_path).map_err(|e| Error::OperationFailed {
            operation: "open_graph_sqlite".to_string(),
            cause: e.to_string(),
        })?;

        let backend = Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        };

        backend.initialize()?;
        tracing::debug!(path = ?backend.db_path, "Opened graph store");
        Ok(backend)
    }

    /// Creates an in-memory `SQLite` graph backend (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::OperationFailed {
            operation: "open_graph_sqlite_memory".to_string(),
            cause: e.to_string(),
        })?;

        let backend = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };

        backend.initialize()?;
        Ok(backend)
    }

    /// Returns the database path.
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Closes the connection, surfacing any error from the final flush.
    ///
    /// # Errors
    ///
    /// Returns an error if `SQLite` fails to close the connection.
    pub fn close(self) -> Result<()> {
        let conn = self
            .conn
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        conn.close().map_err(|(_, e)| Error::OperationFailed {
            operation: "close_graph_sqlite".to_string(),
            cause: e.to_string(),
        })?;
        tracing::debug!(path = ?self.db_path, "Closed graph store");
        Ok(())
    }

    /// Initializes the database schema.
    fn initialize(&self) -> Result<()> {
        let conn = acquire_lock(&self.conn);

        let _ = conn.pragma_update(None, "journal_mode", "WAL");
        let _ = conn.pragma_update(None, "synchronous", "NORMAL");
        let _ = conn.pragma_update(None, "busy_timeout", "5000");
        let _ = conn.pragma_update(None, "foreign_keys", "ON");

        conn.execute(
            "CREATE TABLE IF NOT EXISTS graph_nodes (
                id TEXT PRIMARY KEY,
                label TEXT NOT NULL,
                key_json TEXT NOT NULL,
                properties_json TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )
        .map_err(|e| Error::OperationFailed {
            operation: "create_graph_nodes_table".to_string(),
            cause: e.to_string(),
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS graph_edges (
                from_id TEXT NOT NULL,
                to_id TEXT NOT NULL,
                edge_type TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (from_id, to_id, edge_type),
                FOREIGN KEY (from_id) REFERENCES graph_nodes(id) ON DELETE CASCADE,
                FOREIGN KEY (to_id) REFERENCES graph_nodes(id) ON DELETE CASCADE
            )",
            [],
        )
        .map_err(|e| Error::OperationFailed {
            operation: "create_graph_edges_table".to_string(),
            cause: e.to_string(),
        })?;

        let _ = conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_graph_nodes_label ON graph_nodes(label)",
            [],
        );
        let _ = conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_graph_edges_to ON graph_edges(to_id)",
            [],
        );

        Ok(())
    }

    /// Upserts one node on an open connection or transaction.
    fn upsert_node(conn: &Connection, node: &GraphNode) -> Result<NodeId> {
        let id = node.id();
        let key_json = serde_json::to_string(&node.key.values).map_err(|e| Error::OperationFailed {
            operation: "serialize_node_key".to_string(),
            cause: e.to_string(),
        })?;
        let properties_json =
            serde_json::to_string(&node.properties).unwrap_or_else(|_| "{}".to_string());
        let now = current_timestamp() as i64;

        conn.execute(
            "INSERT INTO graph_nodes (id, label, key_json, properties_json, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(id) DO UPDATE SET
                properties_json = excluded.properties_json,
                updated_at = excluded.updated_at",
            params![id.as_str(), node.label().as_str(), key_json, properties_json, now],
        )
        .map_err(|e| Error::OperationFailed {
            operation: "merge_node".to_string(),
            cause: e.to_string(),
        })?;

        Ok(id)
    }

    /// Inserts one edge unless it already exists; both endpoints must exist.
    fn upsert_edge(conn: &Connection, edge: &GraphEdge) -> Result<bool> {
        let from = edge.from.id();
        let to = edge.to.id();

        for (id, key) in [(&from, &edge.from), (&to, &edge.to)] {
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM graph_nodes WHERE id = ?1",
                    params![id.as_str()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| Error::OperationFailed {
                    operation: "merge_edge_lookup".to_string(),
                    cause: e.to_string(),
                })?;
            if exists.is_none() {
                return Err(Error::MissingEndpoint {
                    edge_type: edge.edge_type.to_string(),
                    endpoint: key.to_string(),
                });
            }
        }

        let inserted = conn
            .execute(
                "INSERT INTO graph_edges (from_id, to_id, edge_type, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(from_id, to_id, edge_type) DO NOTHING",
                params![
                    from.as_str(),
                    to.as_str(),
                    edge.edge_type.as_str(),
                    current_timestamp() as i64
                ],
            )
            .map_err(|e| Error::OperationFailed {
                operation: "merge_edge".to_string(),
                cause: e.to_string(),
            })?;

        Ok(inserted > 0)
    }

    /// Reads the six endpoint columns of an edge query row.
    fn parse_edge_row(row: &Row<'_>) -> rusqlite::Result<(String, NodeRow, NodeRow)> {
        Ok((
            row.get(0)?,
            NodeRow {
                label: row.get(1)?,
                key_json: row.get(2)?,
                properties_json: row.get(3)?,
            },
            NodeRow {
                label: row.get(4)?,
                key_json: row.get(5)?,
                properties_json: row.get(6)?,
            },
        ))
    }

    /// Runs a `label, COUNT(*)` style grouping query.
    fn grouped_counts(
        conn: &Connection,
        sql: &str,
        operation: &str,
    ) -> Result<Vec<(String, usize)>> {
        let mut stmt = conn.prepare(sql).map_err(|e| Error::OperationFailed {
            operation: operation.to_string(),
            cause: e.to_string(),
        })?;

        let rows = stmt
            .query_map([], |row| {
                let name: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((name, count as usize))
            })
            .map_err(|e| Error::OperationFailed {
                operation: operation.to_string(),
                cause: e.to_string(),
            })?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::OperationFailed {
                operation: operation.to_string(),
                cause: e.to_string(),
            })
    }
}

impl GraphBackend for SqliteGraphBackend {
    #[instrument(skip(self, node), fields(label = %node.label()))]
    fn merge_node(&self, node: &GraphNode) -> Result<NodeId> {
        let conn = acquire_lock(&self.conn);
        let id = Self::upsert_node(&conn, node)?;
        metrics::counter!("graph_nodes_merged_total").increment(1);
        Ok(id)
    }

    #[instrument(skip(self, nodes), fields(count = nodes.len()))]
    fn merge_nodes(&self, nodes: &[GraphNode]) -> Result<usize> {
        let mut conn = acquire_lock(&self.conn);
        let tx = conn.transaction().map_err(|e| Error::OperationFailed {
            operation: "merge_nodes_begin".to_string(),
            cause: e.to_string(),
        })?;

        for node in nodes {
            Self::upsert_node(&tx, node)?;
        }

        tx.commit().map_err(|e| Error::OperationFailed {
            operation: "merge_nodes_commit".to_string(),
            cause: e.to_string(),
        })?;

        metrics::counter!("graph_nodes_merged_total").increment(nodes.len() as u64);
        Ok(nodes.len())
    }

    #[instrument(skip(self, edge), fields(edge_type = %edge.edge_type))]
    fn merge_edge(&self, edge: &GraphEdge) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        Self::upsert_edge(&conn, edge)?;
        metrics::counter!("graph_edges_merged_total").increment(1);
        Ok(())
    }

    #[instrument(skip(self, edges), fields(count = edges.len()))]
    fn merge_edges(&self, edges: &[GraphEdge]) -> Result<usize> {
        let mut conn = acquire_lock(&self.conn);
        let tx = conn.transaction().map_err(|e| Error::OperationFailed {
            operation: "merge_edges_begin".to_string(),
            cause: e.to_string(),
        })?;

        let mut created = 0usize;
        for edge in edges {
            if Self::upsert_edge(&tx, edge)? {
                created += 1;
            }
        }

        tx.commit().map_err(|e| Error::OperationFailed {
            operation: "merge_edges_commit".to_string(),
            cause: e.to_string(),
        })?;

        tracing::trace!(created, "Merged edge batch");
        metrics::counter!("graph_edges_merged_total").increment(edges.len() as u64);
        Ok(edges.len())
    }

    #[instrument(skip(self), fields(node_id = %id))]
    fn get_node(&self, id: &NodeId) -> Result<Option<GraphNode>> {
        let conn = acquire_lock(&self.conn);

        let row = conn
            .query_row(
                "SELECT label, key_json, properties_json FROM graph_nodes WHERE id = ?1",
                params![id.as_str()],
                |row| {
                    Ok(NodeRow {
                        label: row.get(0)?,
                        key_json: row.get(1)?,
                        properties_json: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(|e| Error::OperationFailed {
                operation: "get_node".to_string(),
                cause: e.to_string(),
            })?;

        row.map(NodeRow::into_node).transpose()
    }

    #[instrument(skip(self))]
    fn edges(&self, limit: usize) -> Result<Vec<EdgeView>> {
        let conn = acquire_lock(&self.conn);

        let mut stmt = conn
            .prepare(
                "SELECT e.edge_type,
                        f.label, f.key_json, f.properties_json,
                        t.label, t.key_json, t.properties_json
                 FROM graph_edges e
                 JOIN graph_nodes f ON f.id = e.from_id
                 JOIN graph_nodes t ON t.id = e.to_id
                 ORDER BY e.rowid
                 LIMIT ?1",
            )
            .map_err(|e| Error::OperationFailed {
                operation: "edges_prepare".to_string(),
                cause: e.to_string(),
            })?;

        let rows = stmt
            .query_map(params![limit as i64], Self::parse_edge_row)
            .map_err(|e| Error::OperationFailed {
                operation: "edges".to_string(),
                cause: e.to_string(),
            })?;

        let mut views = Vec::new();
        for row in rows {
            let (edge_type, from, to) = row.map_err(|e| Error::OperationFailed {
                operation: "edges_row".to_string(),
                cause: e.to_string(),
            })?;
            let edge_type = EdgeType::parse(&edge_type).ok_or_else(|| Error::OperationFailed {
                operation: "parse_graph_edge".to_string(),
                cause: format!("unknown edge type: {edge_type}"),
            })?;
            views.push(EdgeView {
                edge_type,
                from: from.into_node()?,
                to: to.into_node()?,
            });
        }

        Ok(views)
    }

    #[instrument(skip(self))]
    fn stats(&self) -> Result<GraphStats> {
        let conn = acquire_lock(&self.conn);

        let mut stats = GraphStats::new();

        for (label, count) in Self::grouped_counts(
            &conn,
            "SELECT label, COUNT(*) FROM graph_nodes GROUP BY label",
            "stats_nodes_by_label",
        )? {
            stats.node_count += count;
            if let Some(label) = NodeLabel::parse(&label) {
                stats.nodes_by_label.insert(label, count);
            }
        }

        for (edge_type, count) in Self::grouped_counts(
            &conn,
            "SELECT edge_type, COUNT(*) FROM graph_edges GROUP BY edge_type",
            "stats_edges_by_type",
        )? {
            stats.relationship_count += count;
            if let Some(edge_type) = EdgeType::parse(&edge_type) {
                stats.relationships_by_type.insert(edge_type, count);
            }
        }

        Ok(stats)
    }

    #[instrument(skip(self))]
    fn clear(&self) -> Result<()> {
        let conn = acquire_lock(&self.conn);

        conn.execute("DELETE FROM graph_edges", [])
            .map_err(|e| Error::OperationFailed {
                operation: "clear_graph_edges".to_string(),
                cause: e.to_string(),
            })?;

        conn.execute("DELETE FROM graph_nodes", [])
            .map_err(|e| Error::OperationFailed {
                operation: "clear_graph_nodes".to_string(),
                cause: e.to_string(),
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn medication(drug: &str) -> GraphNode {
        GraphNode::new(NodeKey::new(NodeLabel::Medication).with("drug_name", drug))
    }

    fn strength(value: &str) -> GraphNode {
        GraphNode::new(NodeKey::new(NodeLabel::Strength).with("prod_strength", value))
    }

    fn has_strength(drug: &str, value: &str) -> GraphEdge {
        GraphEdge::new(EdgeType::HasStrength, medication(drug).key, strength(value).key)
    }

    #[test]
    fn test_merge_and_get_node() {
        let backend = SqliteGraphBackend::in_memory().unwrap();
        let node = GraphNode::new(
            NodeKey::new(NodeLabel::Admission)
                .with("hadm_id", "200")
                .with("admission_type", "URGENT"),
        )
        .with_property("admission_location", "ER");

        let id = backend.merge_node(&node).unwrap();
        let stored = backend.get_node(&id).unwrap().unwrap();

        assert_eq!(stored, node);
        assert!(backend.get_node(&NodeId::new("node_missing")).unwrap().is_none());
    }

    #[test]
    fn test_merge_node_upserts_properties() {
        let backend = SqliteGraphBackend::in_memory().unwrap();
        let key = NodeKey::new(NodeLabel::Patient).with("subject_id", "1");

        backend
            .merge_node(&GraphNode::new(key.clone()).with_property("anchor_age", "40"))
            .unwrap();
        backend
            .merge_node(&GraphNode::new(key.clone()).with_property("anchor_age", "41"))
            .unwrap();

        let stats = backend.stats().unwrap();
        assert_eq!(stats.node_count, 1);
        let stored = backend.get_node(&key.id()).unwrap().unwrap();
        assert_eq!(stored.attribute("anchor_age"), Some("41"));
    }

    #[test]
    fn test_merge_nodes_batch() {
        let backend = SqliteGraphBackend::in_memory().unwrap();
        let nodes = vec![medication("aspirin"), strength("81mg"), medication("aspirin")];

        assert_eq!(backend.merge_nodes(&nodes).unwrap(), 3);
        assert_eq!(backend.stats().unwrap().node_count, 2);
    }

    #[test]
    fn test_merge_edges_idempotent() {
        let backend = SqliteGraphBackend::in_memory().unwrap();
        backend
            .merge_nodes(&[medication("aspirin"), strength("81mg")])
            .unwrap();

        backend.merge_edge(&has_strength("aspirin", "81mg")).unwrap();
        backend
            .merge_edges(&[has_strength("aspirin", "81mg"), has_strength("aspirin", "81mg")])
            .unwrap();

        let stats = backend.stats().unwrap();
        assert_eq!(stats.relationship_count, 1);
        assert_eq!(
            stats.relationships_by_type.get(&EdgeType::HasStrength),
            Some(&1)
        );
    }

    #[test]
    fn test_merge_edge_missing_endpoint() {
        let backend = SqliteGraphBackend::in_memory().unwrap();
        backend.merge_node(&medication("aspirin")).unwrap();

        let err = backend.merge_edge(&has_strength("aspirin", "81mg")).unwrap_err();
        assert!(matches!(err, Error::MissingEndpoint { .. }));
        assert_eq!(backend.stats().unwrap().relationship_count, 0);
    }

    #[test]
    fn test_edges_materialize_endpoints() {
        let backend = SqliteGraphBackend::in_memory().unwrap();
        backend
            .merge_nodes(&[medication("aspirin"), strength("81mg"), strength("325mg")])
            .unwrap();
        backend
            .merge_edges(&[has_strength("aspirin", "81mg"), has_strength("aspirin", "325mg")])
            .unwrap();

        let edges = backend.edges(1000).unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].edge_type, EdgeType::HasStrength);
        assert_eq!(edges[0].from.display_label(), "aspirin");
        assert_eq!(edges[0].to.display_label(), "81mg");
        assert_eq!(edges[1].to.display_label(), "325mg");

        assert_eq!(backend.edges(1).unwrap().len(), 1);
        assert!(backend.edges(0).unwrap().is_empty());
    }

    #[test]
    fn test_clear() {
        let backend = SqliteGraphBackend::in_memory().unwrap();
        backend
            .merge_nodes(&[medication("aspirin"), strength("81mg")])
            .unwrap();
        backend.merge_edge(&has_strength("aspirin", "81mg")).unwrap();

        backend.clear().unwrap();
        assert_eq!(backend.stats().unwrap(), GraphStats::default());
    }

    #[test]
    fn test_file_backed_store_persists_across_connections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("graph.db");

        let backend = SqliteGraphBackend::new(&path).unwrap();
        assert_eq!(backend.db_path(), Some(path.as_path()));
        backend
            .merge_nodes(&[medication("aspirin"), strength("81mg")])
            .unwrap();
        backend.merge_edge(&has_strength("aspirin", "81mg")).unwrap();
        backend.close().unwrap();

        let reopened = SqliteGraphBackend::new(&path).unwrap();
        let stats = reopened.stats().unwrap();
        assert_eq!(stats.node_count, 2);
        assert_eq!(stats.relationship_count, 1);
        reopened.close().unwrap();
    }
}
