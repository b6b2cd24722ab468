//! What the external canvas renderer receives, and how its change
//! notifications turn back into editor actions.

use crate::editor::{Action, Selection};
use crate::ids::{EdgeId, NodeId};
use crate::model::{size_of, EdgeMarker, NodeColor, NodeSize, Position, SizePolicy, Snapshot};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    pub id: NodeId,
    pub position: Position,
    pub title: String,
    pub color: NodeColor,
    pub detail_count: usize,
    pub size: NodeSize,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeView {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub marker_end: EdgeMarker,
    pub meta_count: usize,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CanvasView {
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
}

pub fn project(snapshot: &Snapshot, selection: &Selection, policy: SizePolicy) -> CanvasView {
    let nodes = snapshot
        .nodes
        .iter()
        .map(|n| NodeView {
            id: n.id.clone(),
            position: n.position,
            title: n.data.title.clone(),
            color: n.data.color.clone(),
            detail_count: n.data.details.len(),
            size: size_of(n.data.details.len(), policy),
            selected: selection.node() == Some(&n.id),
        })
        .collect();
    let edges = snapshot
        .edges
        .iter()
        .map(|e| EdgeView {
            id: e.id.clone(),
            source: e.source.clone(),
            target: e.target.clone(),
            marker_end: e.marker_end.clone(),
            meta_count: e.data.meta.len(),
            selected: selection.edge() == Some(&e.id),
        })
        .collect();
    CanvasView { nodes, edges }
}

/// A change notification from the renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum RendererChange {
    Position {
        id: NodeId,
        position: Position,
        dragging: bool,
    },
    Connect {
        source: NodeId,
        target: NodeId,
    },
    NodeClick(NodeId),
    EdgeClick(EdgeId),
    PaneClick,
}

pub fn translate(change: RendererChange) -> Action {
    match change {
        RendererChange::Position {
            id,
            position,
            dragging,
        } => Action::MoveNode {
            id,
            position,
            dragging,
        },
        RendererChange::Connect { source, target } => Action::Connect { source, target },
        RendererChange::NodeClick(id) => Action::SelectNode(id),
        RendererChange::EdgeClick(id) => Action::SelectEdge(id),
        RendererChange::PaneClick => Action::ClearSelection,
    }
}

/// Translate a whole batch, in order.
pub fn translate_batch(changes: impl IntoIterator<Item = RendererChange>) -> Vec<Action> {
    changes.into_iter().map(translate).collect()
}
