//! 3D graph layout.
//!
//! A [`LayoutGraph`] is the sampled edge list reduced to a directed simple
//! graph over node names of the form `"value (Type)"`. A [`LayoutAlgorithm`]
//! maps it to a [`Layout`]: one [`Point3`] per node.
//!
//! # Example
//!
//! ```rust
//! use clinigraph::layout::{LayoutAlgorithm, LayoutGraph, SpringLayout};
//! use clinigraph::models::EdgeType;
//!
//! let mut graph = LayoutGraph::new();
//! graph.add_edge("1 (Patient)", "flu (Diagnosis)", EdgeType::HasCondition);
//!
//! let layout = SpringLayout::default().layout(&graph);
//! assert_eq!(layout.len(), 2);
//! assert!(layout.get("flu (Diagnosis)").is_some());
//! ```

mod rng;
mod spring;

pub use rng::XorShift64Star;
pub use spring::SpringLayout;

use crate::models::{EdgeType, SampledEdge};
use serde::Serialize;
use std::collections::HashMap;

/// A point in 3D space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point3 {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Point3 {
    /// The origin.
    pub const ORIGIN: Self = Self::new(0.0, 0.0, 0.0);

    /// Creates a point.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Maps a graph to node coordinates.
///
/// Implementations must be deterministic: the same graph always produces the
/// same layout. Empty and single-node graphs are valid input.
pub trait LayoutAlgorithm {
    /// Computes a position for every node in the graph.
    fn layout(&self, graph: &LayoutGraph) -> Layout;
}

/// Directed simple graph over node names.
///
/// Nodes keep first-appearance order. Adding an edge between an ordered pair
/// that is already connected replaces its type. Edges are enumerated grouped
/// by source node, each group in insertion order.
#[derive(Debug, Clone, Default)]
pub struct LayoutGraph {
    nodes: Vec<String>,
    index: HashMap<String, usize>,
    adjacency: Vec<Vec<(usize, EdgeType)>>,
    edge_count: usize,
}

impl LayoutGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from sampled edges.
    #[must_use]
    pub fn from_sampled_edges(edges: &[SampledEdge]) -> Self {
        let mut graph = Self::new();
        for edge in edges {
            graph.add_edge(&edge.from_name(), &edge.to_name(), edge.relation);
        }
        graph
    }

    /// Adds a node if absent and returns its index.
    pub fn add_node(&mut self, name: &str) -> usize {
        if let Some(&i) = self.index.get(name) {
            return i;
        }
        let i = self.nodes.len();
        self.nodes.push(name.to_string());
        self.index.insert(name.to_string(), i);
        self.adjacency.push(Vec::new());
        i
    }

    /// Adds a directed edge, creating endpoints as needed.
    pub fn add_edge(&mut self, from: &str, to: &str, edge_type: EdgeType) {
        let from = self.add_node(from);
        let to = self.add_node(to);
        let targets = &mut self.adjacency[from];
        if let Some(existing) = targets.iter_mut().find(|(target, _)| *target == to) {
            existing.1 = edge_type;
        } else {
            targets.push((to, edge_type));
            self.edge_count += 1;
        }
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of distinct directed edges.
    #[must_use]
    pub const fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Node names in first-appearance order.
    #[must_use]
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// Index of a node by name.
    #[must_use]
    pub fn node_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Iterates edges as `(from, to, type)` index triples.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, EdgeType)> + '_ {
        self.adjacency.iter().enumerate().flat_map(|(from, targets)| {
            targets
                .iter()
                .map(move |&(to, edge_type)| (from, to, edge_type))
        })
    }
}

/// Node positions produced by a [`LayoutAlgorithm`], in graph node order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    names: Vec<String>,
    points: Vec<Point3>,
}

impl Layout {
    /// Creates a layout from parallel name and point lists.
    ///
    /// Both lists are truncated to the shorter one.
    #[must_use]
    pub fn from_parts(mut names: Vec<String>, mut points: Vec<Point3>) -> Self {
        let len = names.len().min(points.len());
        names.truncate(len);
        points.truncate(len);
        Self { names, points }
    }

    /// Number of positioned nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if no nodes are positioned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Position of the node at `index` in graph order.
    #[must_use]
    pub fn point(&self, index: usize) -> Option<Point3> {
        self.points.get(index).copied()
    }

    /// Position of a node by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Point3> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.points[i])
    }

    /// Iterates `(name, point)` pairs in graph order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Point3)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.points.iter().copied())
    }
}
