//! Graph values exchanged between the resolver, the store, and the sampler.
//!
//! Node identity is derived entirely from a [`NodeKey`]: the node label plus
//! the ordered tuple of its key attribute values. Two keys that compare equal
//! always hash to the same [`NodeId`], which is what makes repeated merges
//! collapse onto one stored node.
//!
//! # Example
//!
//! ```rust
//! use clinigraph::models::{NodeKey, NodeLabel};
//!
//! let a = NodeKey::new(NodeLabel::Diagnosis).with("description", "flu");
//! let b = NodeKey::new(NodeLabel::Diagnosis).with("description", "flu");
//! assert_eq!(a.id(), b.id());
//! ```

use crate::models::record::UNKNOWN;
use crate::models::schema::{DISPLAY_ATTRIBUTES, EdgeType, NodeLabel};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Field separator used when hashing key tuples.
const UNIT_SEPARATOR: u8 = 0x1f;
/// Record separator used when hashing key tuples.
const RECORD_SEPARATOR: u8 = 0x1e;

/// Deterministic identifier for a graph node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a node ID from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derives the node ID for a key.
    ///
    /// The ID is `node_` followed by the first 24 hex characters of the
    /// SHA-256 of the label and key tuple.
    #[must_use]
    pub fn for_key(key: &NodeKey) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(key.label.as_str().as_bytes());
        for (name, value) in &key.values {
            hasher.update([RECORD_SEPARATOR]);
            hasher.update(name.as_bytes());
            hasher.update([UNIT_SEPARATOR]);
            hasher.update(value.as_bytes());
        }
        let digest = hex::encode(hasher.finalize());
        Self(format!("node_{}", &digest[..24]))
    }

    /// Returns the node ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identity of a node: its label and ordered key attribute values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
    /// Node label.
    pub label: NodeLabel,
    /// Key attribute name/value pairs in schema order.
    pub values: Vec<(String, String)>,
}

impl NodeKey {
    /// Creates a key with no attribute values yet.
    #[must_use]
    pub const fn new(label: NodeLabel) -> Self {
        Self {
            label,
            values: Vec::new(),
        }
    }

    /// Appends a key attribute.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.push((name.into(), value.into()));
        self
    }

    /// Returns the value of a key attribute.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the deterministic ID for this key.
    #[must_use]
    pub fn id(&self) -> NodeId {
        NodeId::for_key(self)
    }

    /// Returns true if every key value is the missing-value sentinel.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.values.iter().all(|(_, v)| v == UNKNOWN)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.label)?;
        for (i, (name, value)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        write!(f, "}}")
    }
}

/// A node with its key and non-key attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Identity of the node.
    pub key: NodeKey,
    /// Non-key attributes, overwritten on every merge.
    pub properties: BTreeMap<String, String>,
}

impl GraphNode {
    /// Creates a node with no properties.
    #[must_use]
    pub const fn new(key: NodeKey) -> Self {
        Self {
            key,
            properties: BTreeMap::new(),
        }
    }

    /// Adds a non-key property.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Returns the node ID.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.key.id()
    }

    /// Returns the node label.
    #[must_use]
    pub const fn label(&self) -> NodeLabel {
        self.key.label
    }

    /// Looks up an attribute among key values, then properties.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.key
            .get(name)
            .or_else(|| self.properties.get(name).map(String::as_str))
    }

    /// Resolves the display label by the first present display attribute.
    ///
    /// Falls back to [`UNKNOWN`] when the node carries none of them. Labels
    /// with a composite display join all key values with `" / "` once the
    /// leading attribute is known, so distinct keys stay distinct points.
    #[must_use]
    pub fn display_label(&self) -> Cow<'_, str> {
        let leading = DISPLAY_ATTRIBUTES
            .iter()
            .find_map(|name| self.attribute(name))
            .unwrap_or(UNKNOWN);
        if leading == UNKNOWN || !self.label().descriptor().composite_display {
            return Cow::Borrowed(leading);
        }
        let values: Vec<&str> = self.key.values.iter().map(|(_, v)| v.as_str()).collect();
        Cow::Owned(values.join(" / "))
    }
}

/// A directed edge between two node keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Edge type.
    pub edge_type: EdgeType,
    /// Source node key.
    pub from: NodeKey,
    /// Target node key.
    pub to: NodeKey,
}

impl GraphEdge {
    /// Creates a new edge.
    #[must_use]
    pub const fn new(edge_type: EdgeType, from: NodeKey, to: NodeKey) -> Self {
        Self {
            edge_type,
            from,
            to,
        }
    }
}

/// An enumerated edge with both endpoint nodes materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeView {
    /// Edge type.
    pub edge_type: EdgeType,
    /// Source node.
    pub from: GraphNode,
    /// Target node.
    pub to: GraphNode,
}

/// An edge as handed to the layout engine: typed endpoints with display labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampledEdge {
    /// Source node label.
    pub from_type: NodeLabel,
    /// Source display label.
    pub from: String,
    /// Edge type.
    pub relation: EdgeType,
    /// Target node label.
    pub to_type: NodeLabel,
    /// Target display label.
    pub to: String,
}

impl SampledEdge {
    /// Builds a sampled edge from an enumerated edge.
    #[must_use]
    pub fn from_view(view: &EdgeView) -> Self {
        Self {
            from_type: view.from.label(),
            from: view.from.display_label().into_owned(),
            relation: view.edge_type,
            to_type: view.to.label(),
            to: view.to.display_label().into_owned(),
        }
    }

    /// Layout identity of the source node, `"value (Type)"`.
    #[must_use]
    pub fn from_name(&self) -> String {
        node_name(&self.from, self.from_type)
    }

    /// Layout identity of the target node, `"value (Type)"`.
    #[must_use]
    pub fn to_name(&self) -> String {
        node_name(&self.to, self.to_type)
    }

    /// Returns true if either endpoint label is the missing-value sentinel.
    #[must_use]
    pub fn touches_unknown(&self) -> bool {
        self.from == UNKNOWN || self.to == UNKNOWN
    }
}

/// Formats a node's layout identity.
#[must_use]
pub fn node_name(label: &str, node_type: NodeLabel) -> String {
    format!("{label} ({node_type})")
}
