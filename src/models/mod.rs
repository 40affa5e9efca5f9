//! Data models for clinigraph.
//!
//! This module contains the schema table, input records, and the graph values
//! passed between services and storage.

pub mod graph;
mod record;
pub mod schema;

pub use graph::{EdgeView, GraphEdge, GraphNode, NodeId, NodeKey, SampledEdge, node_name};
pub use record::{MISSING_MARKERS, Record, UNKNOWN, normalize_column, normalize_value};
pub use schema::{
    AttributeSpec, DISPLAY_ATTRIBUTES, EDGE_SCHEMA, EdgeDescriptor, EdgeType, NODE_SCHEMA,
    NodeDescriptor, NodeLabel,
};
