//! Declarative schema for the clinical knowledge graph.
//!
//! The graph has a closed set of node labels and edge types. Each label has a
//! [`NodeDescriptor`] naming its key attributes (which alone determine node
//! identity) and its non-key attributes (overwritten on every merge). Each edge
//! type has an [`EdgeDescriptor`] naming its source and target labels.
//!
//! The resolver and the ingest service iterate these tables; nothing else in
//! the crate hard-codes a label or an edge.
//!
//! # Node Labels
//!
//! | Label | Key attributes | Source columns |
//! |-------|----------------|----------------|
//! | `Patient` | `subject_id` | `subject_id` |
//! | `Admission` | `hadm_id`, `admission_type` | same |
//! | `Diagnosis` | `description` | same |
//! | `Medication` | `drug_name` | `drug` |
//! | `Test` | `test_name` | same |
//! | `Strength` | `prod_strength` | same |
//! | `Route` | `route` | same |
//! | `AdmissionType` | `admission_type` | same |
//! | `Location` | `admission_location` | same |
//! | `TestResult` | `comments` | same |
//! | `MortalityRisk` | `drg_mortality` | same |
//! | `OrderType` | `order_type` | same |
//! | `OrderSubType` | `order_subtype` | same |
//! | `Insurance` | `insurance` | same |
//! | `MaritalStatus` | `marital_status` | same |
//! | `Demographics` | `race`, `gender`, `age` | `race`, `gender`, `anchor_age` |
//!
//! `Demographics` is displayed by all of its key values, since `race` alone
//! would draw different nodes as one point.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A node attribute and the record column it is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSpec {
    /// Attribute name as stored on the node.
    pub name: &'static str,
    /// Normalized record column supplying the value.
    pub column: &'static str,
}

impl AttributeSpec {
    /// Attribute read from a column of the same name.
    const fn same(name: &'static str) -> Self {
        Self { name, column: name }
    }

    /// Attribute read from a differently named column.
    const fn from_column(name: &'static str, column: &'static str) -> Self {
        Self { name, column }
    }
}

/// Schema entry for one node label.
#[derive(Debug, Clone, Copy)]
pub struct NodeDescriptor {
    /// The label this entry describes.
    pub label: NodeLabel,
    /// Attributes that determine identity, in key-tuple order.
    pub key: &'static [AttributeSpec],
    /// Attributes set or overwritten on every merge.
    pub properties: &'static [AttributeSpec],
    /// Whether the display label joins every key value instead of the first
    /// display attribute alone.
    pub composite_display: bool,
}

/// Schema entry for one edge type.
#[derive(Debug, Clone, Copy)]
pub struct EdgeDescriptor {
    /// The edge type this entry describes.
    pub edge_type: EdgeType,
    /// Label of the source node.
    pub from: NodeLabel,
    /// Label of the target node.
    pub to: NodeLabel,
}

/// Label of a node in the clinical graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeLabel {
    /// One per distinct patient.
    Patient,
    /// A hospital admission, keyed with its admission type.
    Admission,
    /// A diagnosis, identified by its text description.
    Diagnosis,
    /// A prescribed drug.
    Medication,
    /// A lab or diagnostic test.
    Test,
    /// Product strength of a medication.
    Strength,
    /// Administration route.
    Route,
    /// Admission type as a standalone node.
    AdmissionType,
    /// Admission location.
    Location,
    /// Free-text test result comments.
    TestResult,
    /// DRG mortality risk band.
    MortalityRisk,
    /// Order type of a prescription.
    OrderType,
    /// Order subtype of a prescription.
    OrderSubType,
    /// Insurance category.
    Insurance,
    /// Marital status.
    MaritalStatus,
    /// Race, gender and age, shared by every patient with the same triple.
    Demographics,
}

impl NodeLabel {
    /// Returns all node labels in schema order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Patient,
            Self::Admission,
            Self::Diagnosis,
            Self::Medication,
            Self::Test,
            Self::Strength,
            Self::Route,
            Self::AdmissionType,
            Self::Location,
            Self::TestResult,
            Self::MortalityRisk,
            Self::OrderType,
            Self::OrderSubType,
            Self::Insurance,
            Self::MaritalStatus,
            Self::Demographics,
        ]
    }

    /// Returns the label as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Patient => "Patient",
            Self::Admission => "Admission",
            Self::Diagnosis => "Diagnosis",
            Self::Medication => "Medication",
            Self::Test => "Test",
            Self::Strength => "Strength",
            Self::Route => "Route",
            Self::AdmissionType => "AdmissionType",
            Self::Location => "Location",
            Self::TestResult => "TestResult",
            Self::MortalityRisk => "MortalityRisk",
            Self::OrderType => "OrderType",
            Self::OrderSubType => "OrderSubType",
            Self::Insurance => "Insurance",
            Self::MaritalStatus => "MaritalStatus",
            Self::Demographics => "Demographics",
        }
    }

    /// Parses a label from its exact string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|label| label.as_str() == s)
    }

    /// Returns the schema entry for this label.
    #[must_use]
    pub fn descriptor(&self) -> &'static NodeDescriptor {
        &NODE_SCHEMA[*self as usize]
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for NodeLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown node label: {s}"))
    }
}

/// Type of a directed edge in the clinical graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    /// Patient → Admission.
    HasAdmission,
    /// Patient → Diagnosis.
    HasCondition,
    /// Patient → Medication.
    HasPrescription,
    /// Patient → Test.
    UnderwentTest,
    /// Patient → Insurance.
    HasInsurance,
    /// Patient → `MaritalStatus`.
    HasMaritalStatus,
    /// Patient → Demographics.
    HasDemographics,
    /// Patient → Location.
    AdmittedFrom,
    /// Patient → `AdmissionType`.
    HasAdmissionType,
    /// Diagnosis → Medication.
    TreatedWith,
    /// Diagnosis → Route.
    AssociatedWithRoute,
    /// Diagnosis → Test.
    RequiresTest,
    /// Medication → Strength.
    HasStrength,
    /// Medication → `MortalityRisk`.
    HasMortalityRisk,
    /// Medication → `OrderType`.
    OrderedUnder,
    /// Test → `TestResult`.
    HasResult,
    /// `OrderType` → `OrderSubType`.
    HasSubtype,
}

impl EdgeType {
    /// Returns all edge types in schema order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::HasAdmission,
            Self::HasCondition,
            Self::HasPrescription,
            Self::UnderwentTest,
            Self::HasInsurance,
            Self::HasMaritalStatus,
            Self::HasDemographics,
            Self::AdmittedFrom,
            Self::HasAdmissionType,
            Self::TreatedWith,
            Self::AssociatedWithRoute,
            Self::RequiresTest,
            Self::HasStrength,
            Self::HasMortalityRisk,
            Self::OrderedUnder,
            Self::HasResult,
            Self::HasSubtype,
        ]
    }

    /// Returns the wire name of the edge type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HasAdmission => "HAS_ADMISSION",
            Self::HasCondition => "HAS_CONDITION",
            Self::HasPrescription => "HAS_PRESCRIPTION",
            Self::UnderwentTest => "UNDERWENT_TEST",
            Self::HasInsurance => "HAS_INSURANCE",
            Self::HasMaritalStatus => "HAS_MARITAL_STATUS",
            Self::HasDemographics => "HAS_DEMOGRAPHICS",
            Self::AdmittedFrom => "ADMITTED_FROM",
            Self::HasAdmissionType => "HAS_ADMISSION_TYPE",
            Self::TreatedWith => "TREATED_WITH",
            Self::AssociatedWithRoute => "ASSOCIATED_WITH_ROUTE",
            Self::RequiresTest => "REQUIRES_TEST",
            Self::HasStrength => "HAS_STRENGTH",
            Self::HasMortalityRisk => "HAS_MORTALITY_RISK",
            Self::OrderedUnder => "ORDERED_UNDER",
            Self::HasResult => "HAS_RESULT",
            Self::HasSubtype => "HAS_SUBTYPE",
        }
    }

    /// Parses an edge type from its wire name (case-insensitive, `-` allowed).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_uppercase().replace('-', "_");
        Self::all()
            .iter()
            .copied()
            .find(|edge_type| edge_type.as_str() == normalized)
    }

    /// Returns the schema entry for this edge type.
    #[must_use]
    pub fn descriptor(&self) -> &'static EdgeDescriptor {
        &EDGE_SCHEMA[*self as usize]
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EdgeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown edge type: {s}"))
    }
}

const NO_PROPERTIES: &[AttributeSpec] = &[];

/// Node schema, indexed by `NodeLabel as usize`.
pub static NODE_SCHEMA: [NodeDescriptor; 16] = [
    NodeDescriptor {
        label: NodeLabel::Patient,
        key: &[AttributeSpec::same("subject_id")],
        properties: &[AttributeSpec::same("gender"), AttributeSpec::same("anchor_age")],
        composite_display: false,
    },
    NodeDescriptor {
        label: NodeLabel::Admission,
        key: &[
            AttributeSpec::same("hadm_id"),
            AttributeSpec::same("admission_type"),
        ],
        properties: &[AttributeSpec::same("admission_location")],
        composite_display: false,
    },
    NodeDescriptor {
        label: NodeLabel::Diagnosis,
        key: &[AttributeSpec::same("description")],
        properties: NO_PROPERTIES,
        composite_display: false,
    },
    NodeDescriptor {
        label: NodeLabel::Medication,
        key: &[AttributeSpec::from_column("drug_name", "drug")],
        properties: NO_PROPERTIES,
        composite_display: false,
    },
    NodeDescriptor {
        label: NodeLabel::Test,
        key: &[AttributeSpec::same("test_name")],
        properties: NO_PROPERTIES,
        composite_display: false,
    },
    NodeDescriptor {
        label: NodeLabel::Strength,
        key: &[AttributeSpec::same("prod_strength")],
        properties: NO_PROPERTIES,
        composite_display: false,
    },
    NodeDescriptor {
        label: NodeLabel::Route,
        key: &[AttributeSpec::same("route")],
        properties: NO_PROPERTIES,
        composite_display: false,
    },
    NodeDescriptor {
        label: NodeLabel::AdmissionType,
        key: &[AttributeSpec::same("admission_type")],
        properties: NO_PROPERTIES,
        composite_display: false,
    },
    NodeDescriptor {
        label: NodeLabel::Location,
        key: &[AttributeSpec::same("admission_location")],
        properties: NO_PROPERTIES,
        composite_display: false,
    },
    NodeDescriptor {
        label: NodeLabel::TestResult,
        key: &[AttributeSpec::same("comments")],
        properties: NO_PROPERTIES,
        composite_display: false,
    },
    NodeDescriptor {
        label: NodeLabel::MortalityRisk,
        key: &[AttributeSpec::same("drg_mortality")],
        properties: NO_PROPERTIES,
        composite_display: false,
    },
    NodeDescriptor {
        label: NodeLabel::OrderType,
        key: &[AttributeSpec::same("order_type")],
        properties: NO_PROPERTIES,
        composite_display: false,
    },
    NodeDescriptor {
        label: NodeLabel::OrderSubType,
        key: &[AttributeSpec::same("order_subtype")],
        properties: NO_PROPERTIES,
        composite_display: false,
    },
    NodeDescriptor {
        label: NodeLabel::Insurance,
        key: &[AttributeSpec::same("insurance")],
        properties: NO_PROPERTIES,
        composite_display: false,
    },
    NodeDescriptor {
        label: NodeLabel::MaritalStatus,
        key: &[AttributeSpec::same("marital_status")],
        properties: NO_PROPERTIES,
        composite_display: false,
    },
    NodeDescriptor {
        label: NodeLabel::Demographics,
        key: &[
            AttributeSpec::same("race"),
            AttributeSpec::same("gender"),
            AttributeSpec::from_column("age", "anchor_age"),
        ],
        properties: NO_PROPERTIES,
        composite_display: true,
    },
];

/// Edge schema, indexed by `EdgeType as usize`.
pub static EDGE_SCHEMA: [EdgeDescriptor; 17] = [
    edge(EdgeType::HasAdmission, NodeLabel::Patient, NodeLabel::Admission),
    edge(EdgeType::HasCondition, NodeLabel::Patient, NodeLabel::Diagnosis),
    edge(EdgeType::HasPrescription, NodeLabel::Patient, NodeLabel::Medication),
    edge(EdgeType::UnderwentTest, NodeLabel::Patient, NodeLabel::Test),
    edge(EdgeType::HasInsurance, NodeLabel::Patient, NodeLabel::Insurance),
    edge(EdgeType::HasMaritalStatus, NodeLabel::Patient, NodeLabel::MaritalStatus),
    edge(EdgeType::HasDemographics, NodeLabel::Patient, NodeLabel::Demographics),
    edge(EdgeType::AdmittedFrom, NodeLabel::Patient, NodeLabel::Location),
    edge(EdgeType::HasAdmissionType, NodeLabel::Patient, NodeLabel::AdmissionType),
    edge(EdgeType::TreatedWith, NodeLabel::Diagnosis, NodeLabel::Medication),
    edge(EdgeType::AssociatedWithRoute, NodeLabel::Diagnosis, NodeLabel::Route),
    edge(EdgeType::RequiresTest, NodeLabel::Diagnosis, NodeLabel::Test),
    edge(EdgeType::HasStrength, NodeLabel::Medication, NodeLabel::Strength),
    edge(EdgeType::HasMortalityRisk, NodeLabel::Medication, NodeLabel::MortalityRisk),
    edge(EdgeType::OrderedUnder, NodeLabel::Medication, NodeLabel::OrderType),
    edge(EdgeType::HasResult, NodeLabel::Test, NodeLabel::TestResult),
    edge(EdgeType::HasSubtype, NodeLabel::OrderType, NodeLabel::OrderSubType),
];

const fn edge(edge_type: EdgeType, from: NodeLabel, to: NodeLabel) -> EdgeDescriptor {
    EdgeDescriptor {
        edge_type,
        from,
        to,
    }
}

/// Attribute names consulted, in order, when choosing a node's display label.
///
/// A node is shown by the value of the first attribute it carries; nodes with
/// none of these resolve to [`crate::models::UNKNOWN`].
pub const DISPLAY_ATTRIBUTES: &[&str] = &[
    "subject_id",
    "hadm_id",
    "description",
    "drug_name",
    "test_name",
    "prod_strength",
    "route",
    "insurance",
    "marital_status",
    "order_type",
    "order_subtype",
    "admission_type",
    "admission_location",
    "comments",
    "drg_mortality",
    "race",
];
