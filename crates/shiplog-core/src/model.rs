use crate::ids::{EdgeId, ItemId, NodeId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Type tag carried by every concept node.
pub const NODE_KIND: &str = "concept";
/// Default `markerEnd.type` for edges.
pub const ARROW_CLOSED: &str = "arrowclosed";

pub const DEFAULT_NODE_TITLE: &str = "New Concept";
pub const UNTITLED: &str = "Untitled";

pub const BASE_NODE_WIDTH: f64 = 260.0;
pub const BASE_NODE_HEIGHT: f64 = 120.0;

/// Generate `as_str()` and `from_str()` for a lowercase enum.
macro_rules! str_enum {
    ($T:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $T {
            pub const ALL: &'static [$T] = &[$($T::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self { $( $T::$variant => $s, )+ }
            }
            pub fn from_str(s: &str) -> Option<$T> {
                match s { $( $s => Some($T::$variant), )+ _ => None }
            }
        }
        impl std::fmt::Display for $T {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorLabel {
    Purple,
    Orange,
    Green,
    Blue,
    Gray,
    Red,
    Yellow,
    Teal,
}

str_enum!(ColorLabel {
    Purple => "purple",
    Orange => "orange",
    Green => "green",
    Blue => "blue",
    Gray => "gray",
    Red => "red",
    Yellow => "yellow",
    Teal => "teal",
});

/// A node's color as stored. Imported documents may carry strings outside
/// the palette; those are kept verbatim and left to the renderer's fallback.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeColor {
    Label(ColorLabel),
    Unrecognized(String),
}

impl NodeColor {
    pub fn as_str(&self) -> &str {
        match self {
            NodeColor::Label(label) => label.as_str(),
            NodeColor::Unrecognized(s) => s,
        }
    }

    pub fn label(&self) -> Option<ColorLabel> {
        match self {
            NodeColor::Label(label) => Some(*label),
            NodeColor::Unrecognized(_) => None,
        }
    }
}

impl Default for NodeColor {
    fn default() -> Self {
        NodeColor::Label(ColorLabel::Gray)
    }
}

impl From<ColorLabel> for NodeColor {
    fn from(label: ColorLabel) -> Self {
        NodeColor::Label(label)
    }
}

impl From<String> for NodeColor {
    fn from(s: String) -> Self {
        match ColorLabel::from_str(&s) {
            Some(label) => NodeColor::Label(label),
            None => NodeColor::Unrecognized(s),
        }
    }
}

impl From<NodeColor> for String {
    fn from(color: NodeColor) -> Self {
        match color {
            NodeColor::Label(label) => label.as_str().to_string(),
            NodeColor::Unrecognized(s) => s,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Position { x, y }
    }
}

/// An ordered, independently editable text fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextItem {
    pub id: ItemId,
    pub text: String,
}

impl TextItem {
    pub fn new(text: impl Into<String>) -> Self {
        TextItem {
            id: ItemId::generate(),
            text: text.into(),
        }
    }
}

pub type DetailItem = TextItem;
pub type EdgeMetaItem = TextItem;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub title: String,
    pub color: NodeColor,
    pub details: Vec<DetailItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: String,
    pub position: Position,
    pub data: NodeData,
}

impl ConceptNode {
    pub fn new(id: NodeId, title: impl Into<String>, color: NodeColor, position: Position) -> Self {
        ConceptNode {
            id,
            kind: NODE_KIND.to_string(),
            position,
            data: NodeData {
                title: title.into(),
                color,
                details: Vec::new(),
            },
        }
    }

    pub fn with_details(mut self, details: Vec<DetailItem>) -> Self {
        self.data.details = details;
        self
    }
}

/// Renderer hint for the arrow drawn at an edge's target end. Fields other
/// than `type` are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeMarker {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for EdgeMarker {
    fn default() -> Self {
        EdgeMarker {
            kind: ARROW_CLOSED.to_string(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EdgeData {
    pub meta: Vec<EdgeMetaItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptEdge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(rename = "markerEnd")]
    pub marker_end: EdgeMarker,
    pub data: EdgeData,
}

impl ConceptEdge {
    pub fn new(id: EdgeId, source: NodeId, target: NodeId) -> Self {
        ConceptEdge {
            id,
            source,
            target,
            marker_end: EdgeMarker::default(),
            data: EdgeData::default(),
        }
    }

    pub fn touches(&self, node_id: &NodeId) -> bool {
        &self.source == node_id || &self.target == node_id
    }
}

/// The complete graph at one point in time.
///
/// Entities sit behind `Arc` so successive snapshots share whatever a
/// mutation did not touch; `Arc::ptr_eq` tells a renderer what changed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub nodes: Vec<Arc<ConceptNode>>,
    pub edges: Vec<Arc<ConceptEdge>>,
}

impl Snapshot {
    pub fn new(nodes: Vec<ConceptNode>, edges: Vec<ConceptEdge>) -> Self {
        Snapshot {
            nodes: nodes.into_iter().map(Arc::new).collect(),
            edges: edges.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn node(&self, id: &NodeId) -> Option<&ConceptNode> {
        self.nodes.iter().find(|n| &n.id == id).map(Arc::as_ref)
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&ConceptEdge> {
        self.edges.iter().find(|e| &e.id == id).map(Arc::as_ref)
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.iter().any(|n| &n.id == id)
    }

    pub fn contains_edge(&self, id: &EdgeId) -> bool {
        self.edges.iter().any(|e| &e.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeSize {
    pub width: f64,
    pub height: f64,
}

/// How a node's on-canvas size follows from its detail count.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SizePolicy {
    /// Every node gets the base size.
    #[default]
    Fixed,
    /// Height grows by `step` per detail, counting at most `max_details`.
    Graduated { step: f64, max_details: usize },
}

pub fn size_of(detail_count: usize, policy: SizePolicy) -> NodeSize {
    match policy {
        SizePolicy::Fixed => NodeSize {
            width: BASE_NODE_WIDTH,
            height: BASE_NODE_HEIGHT,
        },
        SizePolicy::Graduated { step, max_details } => NodeSize {
            width: BASE_NODE_WIDTH,
            height: BASE_NODE_HEIGHT + step * detail_count.min(max_details) as f64,
        },
    }
}
