//! End-to-end graph build.
//!
//! Reads a record sample, merges it into the store, samples the stored edges,
//! lays them out and writes the scene. The store connection is opened for the
//! batch only and closed before the run returns.

use crate::config::ClinigraphConfig;
use crate::io::CsvRecordSource;
use crate::layout::{LayoutAlgorithm, LayoutGraph, SpringLayout};
use crate::models::Record;
use crate::rendering::SceneBuilder;
use crate::services::ingest::GraphIngestService;
use crate::services::sampler::GraphSampler;
use crate::services::state::GraphStateMarker;
use crate::storage::{GraphBackend, SqliteGraphBackend};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::instrument;

/// Result of a run, as reported to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSummary {
    /// Absolute path of the written scene.
    pub graph_path: String,
    /// Total nodes in the store.
    pub node_count: usize,
    /// Total relationships in the store.
    pub rel_count: usize,
}

/// Builds the graph and its scene from an input file.
pub struct GraphPipeline {
    config: ClinigraphConfig,
    layout: Box<dyn LayoutAlgorithm + Send + Sync>,
    scene: SceneBuilder,
}

impl GraphPipeline {
    /// Creates a pipeline using the spring layout configured in `config`.
    #[must_use]
    pub fn new(config: ClinigraphConfig) -> Self {
        let layout = SpringLayout::from(config.layout);
        Self {
            config,
            layout: Box::new(layout),
            scene: SceneBuilder::new(),
        }
    }

    /// Replaces the layout algorithm.
    #[must_use]
    pub fn with_layout(mut self, layout: impl LayoutAlgorithm + Send + Sync + 'static) -> Self {
        self.layout = Box::new(layout);
        self
    }

    /// Runs the full pipeline against the configured `SQLite` store.
    ///
    /// The input is checked before the store is opened, so a missing file
    /// leaves no trace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputNotFound`] if the input does not exist, or the
    /// first error from reading, storing, or rendering.
    #[instrument(skip(self), fields(input = %input.display()))]
    pub fn run(&self, input: &Path) -> Result<GraphSummary> {
        let start = Instant::now();

        let mut source = CsvRecordSource::from_path(input)?;
        tracing::debug!(columns = ?source.columns(), "Reading input");
        let records = source.read_sample(self.config.sample_size)?;

        ensure_parent_dir(&self.config.store_path)?;
        let backend = SqliteGraphBackend::new(&self.config.store_path)?;
        let summary = self.run_with_backend(&records, &backend)?;
        backend.close()?;

        let state_path = self.config.resolved_state_path();
        ensure_parent_dir(&state_path)?;
        GraphStateMarker::new(state_path).mark_ready()?;

        metrics::histogram!("graph_pipeline_duration_ms")
            .record(start.elapsed().as_secs_f64() * 1000.0);
        Ok(summary)
    }

    /// Runs ingestion, sampling, layout and rendering against a given store.
    ///
    /// # Errors
    ///
    /// Returns the first error from the store or from writing the scene.
    #[instrument(skip(self, records, backend), fields(records = records.len()))]
    pub fn run_with_backend<B: GraphBackend + ?Sized>(
        &self,
        records: &[Record],
        backend: &B,
    ) -> Result<GraphSummary> {
        GraphIngestService::new(backend).ingest(records)?;
        let stats = backend.stats()?;

        let sample = GraphSampler::new(backend).sample(self.config.edge_limit)?;
        let graph = LayoutGraph::from_sampled_edges(&sample.edges);
        let layout = self.layout.layout(&graph);

        ensure_parent_dir(&self.config.output_path)?;
        self.scene
            .build(&graph, &layout)
            .write_html(&self.config.output_path)?;

        let summary = GraphSummary {
            graph_path: absolute(&self.config.output_path)
                .to_string_lossy()
                .into_owned(),
            node_count: stats.node_count,
            rel_count: stats.relationship_count,
        };
        tracing::info!(
            node_count = summary.node_count,
            rel_count = summary.rel_count,
            sampled_edges = sample.edges.len(),
            "Graph build complete"
        );
        Ok(summary)
    }
}

/// Creates the parent directory of a file path if it is missing.
fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            std::fs::create_dir_all(dir).map_err(|e| Error::OperationFailed {
                operation: "create_dir".to_string(),
                cause: format!("{}: {e}", dir.display()),
            })
        },
        _ => Ok(()),
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Layout, Point3};
    use crate::storage::InMemoryGraphBackend;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> ClinigraphConfig {
        ClinigraphConfig::default()
            .with_store_path(dir.path().join("store").join("graph.db"))
            .with_output_path(dir.path().join("graph_output.html"))
    }

    #[test]
    fn test_summary_serializes_with_host_keys() {
        let summary = GraphSummary {
            graph_path: "/tmp/graph_output.html".to_string(),
            node_count: 3,
            rel_count: 2,
        };
        assert_eq!(
            serde_json::to_string(&summary).unwrap(),
            r#"{"graph_path":"/tmp/graph_output.html","node_count":3,"rel_count":2}"#
        );
    }

    #[test]
    fn test_run_with_backend_empty_batch() {
        let dir = TempDir::new().unwrap();
        let pipeline = GraphPipeline::new(config(&dir));
        let backend = InMemoryGraphBackend::new();

        let summary = pipeline.run_with_backend(&[], &backend).unwrap();

        assert_eq!(summary.node_count, 0);
        assert_eq!(summary.rel_count, 0);
        assert!(Path::new(&summary.graph_path).is_absolute());
        assert!(Path::new(&summary.graph_path).exists());
    }

    /// Places every node at the origin.
    struct Collapsed;

    impl LayoutAlgorithm for Collapsed {
        fn layout(&self, graph: &LayoutGraph) -> Layout {
            Layout::from_parts(graph.nodes().to_vec(), vec![Point3::ORIGIN; graph.node_count()])
        }
    }

    #[test]
    fn test_layout_is_pluggable() {
        let dir = TempDir::new().unwrap();
        let pipeline = GraphPipeline::new(config(&dir)).with_layout(Collapsed);
        let backend = InMemoryGraphBackend::new();
        let records = vec![
            Record::new()
                .with_field("subject_id", "1")
                .with_field("description", "flu"),
        ];

        pipeline.run_with_backend(&records, &backend).unwrap();

        let html = std::fs::read_to_string(dir.path().join("graph_output.html")).unwrap();
        assert!(html.contains(r#""x":[0.0,0.0,null]"#));
    }

    #[test]
    fn test_run_missing_input_does_not_open_store() {
        let dir = TempDir::new().unwrap();
        let pipeline = GraphPipeline::new(config(&dir));

        let err = pipeline.run(&dir.path().join("missing.csv")).unwrap_err();

        assert!(matches!(err, Error::InputNotFound { .. }));
        assert!(!dir.path().join("store").exists());
        assert!(!dir.path().join("graph_output.html").exists());
    }

    #[test]
    fn test_run_writes_state_marker() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("admissions.csv");
        std::fs::write(&input, "subject_id,description\n1,flu\n").unwrap();
        let pipeline = GraphPipeline::new(config(&dir));

        let summary = pipeline.run(&input).unwrap();

        assert_eq!(summary.node_count, 16);
        assert_eq!(summary.rel_count, 17);
        assert!(GraphStateMarker::new(dir.path().join("knowledge_graph_state.json")).is_ready());
    }
}
