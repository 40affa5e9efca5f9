//! Edge sampling for visualization.

use crate::Result;
use crate::models::SampledEdge;
use crate::storage::GraphBackend;
use tracing::instrument;

/// Default maximum number of edges enumerated.
pub const DEFAULT_EDGE_LIMIT: usize = 1000;

/// Edges kept for layout plus the number filtered out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleResult {
    /// Edges whose endpoints both have a known display label.
    pub edges: Vec<SampledEdge>,
    /// Enumerated edges dropped because an endpoint label was `"Unknown"`.
    pub discarded: usize,
}

/// Reads a bounded, labelled edge list from the store.
///
/// Edges touching a node whose display label is `"Unknown"` are dropped so
/// that unrelated unknown-valued nodes do not collapse into one hub.
pub struct GraphSampler<'a, B: GraphBackend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: GraphBackend + ?Sized> GraphSampler<'a, B> {
    /// Creates a sampler over a backend.
    #[must_use]
    pub const fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Enumerates up to `limit` edges and filters out unknown endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge query fails.
    #[instrument(skip(self))]
    pub fn sample(&self, limit: usize) -> Result<SampleResult> {
        let views = self.backend.edges(limit)?;
        let total = views.len();

        let edges: Vec<SampledEdge> = views
            .iter()
            .map(SampledEdge::from_view)
            .filter(|edge| !edge.touches_unknown())
            .collect();
        let discarded = total - edges.len();

        metrics::counter!("graph_sample_rows_discarded_total").increment(discarded as u64);
        tracing::debug!(total, kept = edges.len(), discarded, "Sampled edges");
        Ok(SampleResult { edges, discarded })
    }
}
