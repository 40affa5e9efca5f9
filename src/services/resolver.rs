//! Entity resolution.
//!
//! Maps one normalized record onto the fixed schema: one node per label and
//! one edge per edge type, every time, even when values are `"Unknown"`.
//! Resolution is pure and deterministic; the same record always yields the
//! same keys, which is what makes the downstream merges idempotent.

use crate::models::{
    AttributeSpec, EDGE_SCHEMA, GraphEdge, GraphNode, NODE_SCHEMA, NodeDescriptor, NodeKey, Record,
};

/// Nodes and edges derived from a single record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRecord {
    /// One node per label, in schema order.
    pub nodes: Vec<GraphNode>,
    /// One edge per edge type, in schema order.
    pub edges: Vec<GraphEdge>,
}

/// Derives typed node keys and edges from flat records.
///
/// # Example
///
/// ```rust
/// use clinigraph::models::{NodeLabel, Record};
/// use clinigraph::services::EntityResolver;
///
/// let record = Record::new()
///     .with_field("subject_id", "1")
///     .with_field("description", "flu");
/// let resolved = EntityResolver::new().resolve(&record);
///
/// assert_eq!(resolved.nodes.len(), 16);
/// assert_eq!(resolved.edges.len(), 17);
/// let diagnosis = &resolved.nodes[NodeLabel::Diagnosis as usize];
/// assert_eq!(diagnosis.key.get("description"), Some("flu"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityResolver;

impl EntityResolver {
    /// Creates a resolver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Resolves every node and edge implied by a record.
    #[must_use]
    pub fn resolve(&self, record: &Record) -> ResolvedRecord {
        let nodes: Vec<GraphNode> = NODE_SCHEMA
            .iter()
            .map(|descriptor| Self::resolve_node(descriptor, record))
            .collect();

        let edges = EDGE_SCHEMA
            .iter()
            .map(|descriptor| {
                GraphEdge::new(
                    descriptor.edge_type,
                    nodes[descriptor.from as usize].key.clone(),
                    nodes[descriptor.to as usize].key.clone(),
                )
            })
            .collect();

        ResolvedRecord { nodes, edges }
    }

    /// Resolves only the node keys of a record.
    #[must_use]
    pub fn resolve_keys(&self, record: &Record) -> Vec<NodeKey> {
        NODE_SCHEMA
            .iter()
            .map(|descriptor| Self::resolve_node(descriptor, record).key)
            .collect()
    }

    fn resolve_node(descriptor: &NodeDescriptor, record: &Record) -> GraphNode {
        let key = descriptor
            .key
            .iter()
            .fold(NodeKey::new(descriptor.label), |key, attr| {
                key.with(attr.name, record.get(attr.column))
            });

        descriptor
            .properties
            .iter()
            .fold(GraphNode::new(key), |node, attr: &AttributeSpec| {
                node.with_property(attr.name, record.get(attr.column))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EdgeType, NodeLabel, UNKNOWN};

    fn full_record() -> Record {
        Record::new()
            .with_field("subject_id", "10")
            .with_field("hadm_id", "200")
            .with_field("admission_type", "URGENT")
            .with_field("admission_location", "EMERGENCY ROOM")
            .with_field("description", "flu")
            .with_field("drug", "ibuprofen")
            .with_field("test_name", "CBC")
            .with_field("prod_strength", "200mg")
            .with_field("route", "PO")
            .with_field("comments", "normal")
            .with_field("drg_mortality", "2")
            .with_field("order_type", "Medications")
            .with_field("order_subtype", "Oral")
            .with_field("insurance", "Medicare")
            .with_field("marital_status", "MARRIED")
            .with_field("race", "WHITE")
            .with_field("gender", "F")
            .with_field("anchor_age", "52")
    }

    fn node(resolved: &ResolvedRecord, label: NodeLabel) -> &GraphNode {
        &resolved.nodes[label as usize]
    }

    #[test]
    fn test_resolves_every_label_in_schema_order() {
        let resolved = EntityResolver::new().resolve(&full_record());
        let labels: Vec<NodeLabel> = resolved.nodes.iter().map(GraphNode::label).collect();
        assert_eq!(labels, NodeLabel::all());
    }

    #[test]
    fn test_column_mapping() {
        let resolved = EntityResolver::new().resolve(&full_record());

        assert_eq!(
            node(&resolved, NodeLabel::Medication).key.get("drug_name"),
            Some("ibuprofen")
        );
        let demographics = &node(&resolved, NodeLabel::Demographics).key;
        assert_eq!(demographics.get("race"), Some("WHITE"));
        assert_eq!(demographics.get("gender"), Some("F"));
        assert_eq!(demographics.get("age"), Some("52"));

        let admission = node(&resolved, NodeLabel::Admission);
        assert_eq!(admission.key.get("hadm_id"), Some("200"));
        assert_eq!(admission.key.get("admission_type"), Some("URGENT"));
        assert_eq!(admission.attribute("admission_location"), Some("EMERGENCY ROOM"));

        let patient = node(&resolved, NodeLabel::Patient);
        assert_eq!(patient.properties.get("anchor_age").map(String::as_str), Some("52"));
    }

    #[test]
    fn test_edges_connect_resolved_keys() {
        let resolved = EntityResolver::new().resolve(&full_record());

        for (edge, descriptor) in resolved.edges.iter().zip(EDGE_SCHEMA.iter()) {
            assert_eq!(edge.edge_type, descriptor.edge_type);
            assert_eq!(edge.from, node(&resolved, descriptor.from).key);
            assert_eq!(edge.to, node(&resolved, descriptor.to).key);
        }

        let subtype = &resolved.edges[EdgeType::HasSubtype as usize];
        assert_eq!(subtype.from.get("order_type"), Some("Medications"));
        assert_eq!(subtype.to.get("order_subtype"), Some("Oral"));
    }

    #[test]
    fn test_missing_values_resolve_to_unknown() {
        let resolved = EntityResolver::new().resolve(&Record::new().with_field("subject_id", "1"));

        assert!(node(&resolved, NodeLabel::Route).key.is_unknown());
        assert_eq!(
            node(&resolved, NodeLabel::Diagnosis).key.get("description"),
            Some(UNKNOWN)
        );
        assert!(!node(&resolved, NodeLabel::Patient).key.is_unknown());
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let resolver = EntityResolver::new();
        let record = full_record();
        assert_eq!(resolver.resolve(&record), resolver.resolve(&record));
        assert_eq!(resolver.resolve_keys(&record), resolver.resolve_keys(&record));
    }

    #[test]
    fn test_shared_demographics_collapse() {
        let resolver = EntityResolver::new();
        let a = resolver.resolve(&full_record());
        let b = resolver.resolve(&full_record().with_field("subject_id", "11"));

        assert_ne!(node(&a, NodeLabel::Patient).id(), node(&b, NodeLabel::Patient).id());
        assert_eq!(
            node(&a, NodeLabel::Demographics).id(),
            node(&b, NodeLabel::Demographics).id()
        );
    }
}
