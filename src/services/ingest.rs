//! Two-pass graph ingestion.
//!
//! Every node of every record is merged before any edge is, so edge merges
//! always find their endpoints. Within each pass, one record's nodes (or
//! edges) are merged as one backend batch.

use crate::Result;
use crate::models::Record;
use crate::services::resolver::{EntityResolver, ResolvedRecord};
use crate::storage::GraphBackend;
use std::time::Instant;
use tracing::instrument;

/// Counts from one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Records ingested.
    pub records: usize,
    /// Node merge operations issued.
    pub node_merges: usize,
    /// Edge merge operations issued.
    pub edge_merges: usize,
}

/// Merges resolved records into a graph store.
///
/// # Example
///
/// ```rust
/// use clinigraph::models::Record;
/// use clinigraph::services::GraphIngestService;
/// use clinigraph::storage::{GraphBackend, InMemoryGraphBackend};
///
/// let backend = InMemoryGraphBackend::new();
/// let records = vec![Record::new().with_field("subject_id", "1")];
///
/// let service = GraphIngestService::new(&backend);
/// service.ingest(&records).unwrap();
/// service.ingest(&records).unwrap();
///
/// assert_eq!(backend.stats().unwrap().node_count, 16);
/// assert_eq!(backend.stats().unwrap().relationship_count, 17);
/// ```
pub struct GraphIngestService<'a, B: GraphBackend + ?Sized> {
    backend: &'a B,
    resolver: EntityResolver,
}

impl<'a, B: GraphBackend + ?Sized> GraphIngestService<'a, B> {
    /// Creates an ingest service over a backend.
    #[must_use]
    pub const fn new(backend: &'a B) -> Self {
        Self {
            backend,
            resolver: EntityResolver::new(),
        }
    }

    /// Ingests a batch of records.
    ///
    /// # Errors
    ///
    /// Returns the first backend error; records merged before it stay merged.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub fn ingest(&self, records: &[Record]) -> Result<IngestReport> {
        let start = Instant::now();
        let resolved: Vec<ResolvedRecord> = records
            .iter()
            .map(|record| self.resolver.resolve(record))
            .collect();

        let mut report = IngestReport {
            records: records.len(),
            ..IngestReport::default()
        };

        for record in &resolved {
            report.node_merges += self.backend.merge_nodes(&record.nodes)?;
        }
        tracing::debug!(node_merges = report.node_merges, "Node pass complete");

        for record in &resolved {
            report.edge_merges += self.backend.merge_edges(&record.edges)?;
        }
        tracing::debug!(edge_merges = report.edge_merges, "Edge pass complete");

        metrics::histogram!("graph_ingest_duration_ms")
            .record(start.elapsed().as_secs_f64() * 1000.0);
        tracing::info!(
            records = report.records,
            node_merges = report.node_merges,
            edge_merges = report.edge_merges,
            "Ingested batch"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::models::{EdgeType, EdgeView, GraphEdge, GraphNode, NodeId, NodeLabel};
    use crate::storage::{GraphStats, InMemoryGraphBackend};
    use std::sync::Mutex;

    fn record(subject: &str, diagnosis: &str, drug: &str) -> Record {
        Record::new()
            .with_field("subject_id", subject)
            .with_field("hadm_id", "100")
            .with_field("admission_type", "URGENT")
            .with_field("description", diagnosis)
            .with_field("drug", drug)
    }

    #[test]
    fn test_ingest_is_idempotent() {
        let backend = InMemoryGraphBackend::new();
        let records = vec![record("1", "flu", "ibuprofen"), record("2", "flu", "acetaminophen")];
        let service = GraphIngestService::new(&backend);

        service.ingest(&records).unwrap();
        let once = backend.stats().unwrap();
        service.ingest(&records).unwrap();
        let twice = backend.stats().unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_report_counts() {
        let backend = InMemoryGraphBackend::new();
        let report = GraphIngestService::new(&backend)
            .ingest(&[record("1", "flu", "ibuprofen")])
            .unwrap();

        assert_eq!(
            report,
            IngestReport {
                records: 1,
                node_merges: 16,
                edge_merges: 17,
            }
        );
    }

    #[test]
    fn test_empty_batch() {
        let backend = InMemoryGraphBackend::new();
        let report = GraphIngestService::new(&backend).ingest(&[]).unwrap();

        assert_eq!(report, IngestReport::default());
        assert_eq!(backend.stats().unwrap(), GraphStats::default());
    }

    #[test]
    fn test_shared_diagnosis_collapses() {
        let backend = InMemoryGraphBackend::new();
        GraphIngestService::new(&backend)
            .ingest(&[record("1", "flu", "ibuprofen"), record("2", "flu", "acetaminophen")])
            .unwrap();

        let stats = backend.stats().unwrap();
        assert_eq!(stats.nodes_by_label.get(&NodeLabel::Diagnosis), Some(&1));
        assert_eq!(stats.nodes_by_label.get(&NodeLabel::Patient), Some(&2));
        assert_eq!(stats.relationships_by_type.get(&EdgeType::HasCondition), Some(&2));
        assert_eq!(stats.relationships_by_type.get(&EdgeType::TreatedWith), Some(&2));
    }

    /// Records the order of backend calls.
    #[derive(Default)]
    struct RecordingBackend {
        inner: InMemoryGraphBackend,
        calls: Mutex<Vec<&'static str>>,
    }

    impl GraphBackend for RecordingBackend {
        fn merge_node(&self, node: &GraphNode) -> Result<NodeId> {
            self.calls.lock().unwrap().push("node");
            self.inner.merge_node(node)
        }

        fn merge_edge(&self, edge: &GraphEdge) -> Result<()> {
            self.calls.lock().unwrap().push("edge");
            self.inner.merge_edge(edge)
        }

        fn get_node(&self, id: &NodeId) -> Result<Option<GraphNode>> {
            self.inner.get_node(id)
        }

        fn edges(&self, limit: usize) -> Result<Vec<EdgeView>> {
            self.inner.edges(limit)
        }

        fn stats(&self) -> Result<GraphStats> {
            self.inner.stats()
        }

        fn clear(&self) -> Result<()> {
            self.inner.clear()
        }
    }

    #[test]
    fn test_all_nodes_merged_before_any_edge() {
        let backend = RecordingBackend::default();
        GraphIngestService::new(&backend)
            .ingest(&[record("1", "flu", "ibuprofen"), record("2", "cold", "aspirin")])
            .unwrap();

        let calls = backend.calls.lock().unwrap();
        let first_edge = calls.iter().position(|c| *c == "edge").unwrap();
        let last_node = calls.iter().rposition(|c| *c == "node").unwrap();
        assert_eq!(first_edge, 32);
        assert!(last_node < first_edge);
    }

    /// Fails every write.
    struct UnavailableBackend;

    impl GraphBackend for UnavailableBackend {
        fn merge_node(&self, _node: &GraphNode) -> Result<NodeId> {
            Err(Error::operation("merge_node", "store unavailable"))
        }

        fn merge_edge(&self, _edge: &GraphEdge) -> Result<()> {
            Err(Error::operation("merge_edge", "store unavailable"))
        }

        fn get_node(&self, _id: &NodeId) -> Result<Option<GraphNode>> {
            Ok(None)
        }

        fn edges(&self, _limit: usize) -> Result<Vec<EdgeView>> {
            Ok(Vec::new())
        }

        fn stats(&self) -> Result<GraphStats> {
            Ok(GraphStats::default())
        }

        fn clear(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_store_failure_fails_batch() {
        let err = GraphIngestService::new(&UnavailableBackend)
            .ingest(&[record("1", "flu", "ibuprofen")])
            .unwrap_err();
        assert!(matches!(err, Error::OperationFailed { .. }));
    }
}
