//! Business logic services.
//!
//! Services sit between the record source, the graph store, and the scene:
//! resolving records into nodes and edges, merging them in two passes,
//! sampling labelled edges back out, and running the whole build.

mod ingest;
mod pipeline;
mod resolver;
mod sampler;
mod state;

pub use ingest::{GraphIngestService, IngestReport};
pub use pipeline::{GraphPipeline, GraphSummary};
pub use resolver::{EntityResolver, ResolvedRecord};
pub use sampler::{DEFAULT_EDGE_LIMIT, GraphSampler, SampleResult};
pub use state::{GraphState, GraphStateMarker};
