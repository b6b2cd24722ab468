//! Pure snapshot transforms.
//!
//! Each function returns the next snapshot, or `None` when its target does
//! not exist (or the input is rejected) so the caller records nothing.
//! Entities a transform does not touch are carried over as the same `Arc`.

use crate::ids::{EdgeId, ItemId, NodeId};
use crate::model::{
    ConceptEdge, ConceptNode, DetailItem, EdgeMarker, EdgeMetaItem, NodeColor, Position,
    Snapshot, TextItem, DEFAULT_NODE_TITLE,
};
use rand::Rng;
use std::sync::Arc;
use tracing::debug;

/// Partial update of a node's data. `None` fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePatch {
    pub title: Option<String>,
    pub color: Option<NodeColor>,
    pub details: Option<Vec<DetailItem>>,
}

impl NodePatch {
    pub fn title(title: impl Into<String>) -> Self {
        NodePatch {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn color(color: impl Into<NodeColor>) -> Self {
        NodePatch {
            color: Some(color.into()),
            ..Default::default()
        }
    }

    fn apply_to(self, node: &ConceptNode) -> ConceptNode {
        let mut next = node.clone();
        if let Some(title) = self.title {
            next.data.title = title;
        }
        if let Some(color) = self.color {
            next.data.color = color;
        }
        if let Some(details) = self.details {
            next.data.details = details;
        }
        next
    }
}

/// Partial update of an edge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgePatch {
    pub meta: Option<Vec<EdgeMetaItem>>,
    pub marker_end: Option<EdgeMarker>,
}

impl EdgePatch {
    fn apply_to(self, edge: &ConceptEdge) -> ConceptEdge {
        let mut next = edge.clone();
        if let Some(meta) = self.meta {
            next.data.meta = meta;
        }
        if let Some(marker) = self.marker_end {
            next.marker_end = marker;
        }
        next
    }
}

/// A fresh node near `center`, offset by up to `jitter` on each axis.
pub fn spawn_node(center: Position, jitter: f64) -> ConceptNode {
    let mut rng = rand::thread_rng();
    let jitter = jitter.abs();
    let position = Position::new(
        center.x + rng.gen_range(-jitter..=jitter),
        center.y + rng.gen_range(-jitter..=jitter),
    );
    ConceptNode::new(
        NodeId::generate(),
        DEFAULT_NODE_TITLE,
        NodeColor::default(),
        position,
    )
}

pub fn add_node(snapshot: &Snapshot, node: ConceptNode) -> Snapshot {
    debug!(node_id = %node.id, "add_node");
    let mut next = snapshot.clone();
    next.nodes.push(Arc::new(node));
    next
}

pub fn connect(snapshot: &Snapshot, source: &NodeId, target: &NodeId) -> Option<(Snapshot, EdgeId)> {
    if !snapshot.contains_node(source) || !snapshot.contains_node(target) {
        debug!(source = %source, target = %target, "connect: missing endpoint");
        return None;
    }
    let edge = ConceptEdge::new(EdgeId::generate(), source.clone(), target.clone());
    let edge_id = edge.id.clone();
    debug!(edge_id = %edge_id, source = %source, target = %target, "connect");
    let mut next = snapshot.clone();
    next.edges.push(Arc::new(edge));
    Some((next, edge_id))
}

/// Remove a node together with every edge that starts or ends at it.
pub fn delete_node(snapshot: &Snapshot, node_id: &NodeId) -> Option<Snapshot> {
    if !snapshot.contains_node(node_id) {
        return None;
    }
    let nodes = snapshot
        .nodes
        .iter()
        .filter(|n| &n.id != node_id)
        .cloned()
        .collect();
    let edges: Vec<_> = snapshot
        .edges
        .iter()
        .filter(|e| !e.touches(node_id))
        .cloned()
        .collect();
    debug!(
        node_id = %node_id,
        edges_removed = snapshot.edges.len() - edges.len(),
        "delete_node"
    );
    Some(Snapshot { nodes, edges })
}

pub fn delete_edge(snapshot: &Snapshot, edge_id: &EdgeId) -> Option<Snapshot> {
    if !snapshot.contains_edge(edge_id) {
        return None;
    }
    debug!(edge_id = %edge_id, "delete_edge");
    let edges = snapshot
        .edges
        .iter()
        .filter(|e| &e.id != edge_id)
        .cloned()
        .collect();
    Some(Snapshot {
        nodes: snapshot.nodes.clone(),
        edges,
    })
}

pub fn update_node(snapshot: &Snapshot, node_id: &NodeId, patch: NodePatch) -> Option<Snapshot> {
    debug!(node_id = %node_id, "update_node");
    map_node(snapshot, node_id, |node| Some(patch.apply_to(node)))
}

pub fn update_edge(snapshot: &Snapshot, edge_id: &EdgeId, patch: EdgePatch) -> Option<Snapshot> {
    debug!(edge_id = %edge_id, "update_edge");
    map_edge(snapshot, edge_id, |edge| Some(patch.apply_to(edge)))
}

pub fn move_node(snapshot: &Snapshot, node_id: &NodeId, position: Position) -> Option<Snapshot> {
    map_node(snapshot, node_id, |node| {
        let mut next = node.clone();
        next.position = position;
        Some(next)
    })
}

pub fn add_detail(snapshot: &Snapshot, node_id: &NodeId, text: &str) -> Option<(Snapshot, ItemId)> {
    let item = nonblank_item(text)?;
    let item_id = item.id.clone();
    debug!(node_id = %node_id, item_id = %item_id, "add_detail");
    let next = map_node(snapshot, node_id, |node| {
        let mut next = node.clone();
        next.data.details.push(item);
        Some(next)
    })?;
    Some((next, item_id))
}

pub fn update_detail(
    snapshot: &Snapshot,
    node_id: &NodeId,
    item_id: &ItemId,
    text: &str,
) -> Option<Snapshot> {
    debug!(node_id = %node_id, item_id = %item_id, "update_detail");
    map_node(snapshot, node_id, |node| {
        let details = replace_text(&node.data.details, item_id, text)?;
        let mut next = node.clone();
        next.data.details = details;
        Some(next)
    })
}

pub fn delete_detail(snapshot: &Snapshot, node_id: &NodeId, item_id: &ItemId) -> Option<Snapshot> {
    debug!(node_id = %node_id, item_id = %item_id, "delete_detail");
    map_node(snapshot, node_id, |node| {
        let details = remove_item(&node.data.details, item_id)?;
        let mut next = node.clone();
        next.data.details = details;
        Some(next)
    })
}

pub fn add_meta(snapshot: &Snapshot, edge_id: &EdgeId, text: &str) -> Option<(Snapshot, ItemId)> {
    let item = nonblank_item(text)?;
    let item_id = item.id.clone();
    debug!(edge_id = %edge_id, item_id = %item_id, "add_meta");
    let next = map_edge(snapshot, edge_id, |edge| {
        let mut next = edge.clone();
        next.data.meta.push(item);
        Some(next)
    })?;
    Some((next, item_id))
}

pub fn update_meta(
    snapshot: &Snapshot,
    edge_id: &EdgeId,
    item_id: &ItemId,
    text: &str,
) -> Option<Snapshot> {
    debug!(edge_id = %edge_id, item_id = %item_id, "update_meta");
    map_edge(snapshot, edge_id, |edge| {
        let meta = replace_text(&edge.data.meta, item_id, text)?;
        let mut next = edge.clone();
        next.data.meta = meta;
        Some(next)
    })
}

pub fn delete_meta(snapshot: &Snapshot, edge_id: &EdgeId, item_id: &ItemId) -> Option<Snapshot> {
    debug!(edge_id = %edge_id, item_id = %item_id, "delete_meta");
    map_edge(snapshot, edge_id, |edge| {
        let meta = remove_item(&edge.data.meta, item_id)?;
        let mut next = edge.clone();
        next.data.meta = meta;
        Some(next)
    })
}

fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

fn nonblank_item(text: &str) -> Option<TextItem> {
    if is_blank(text) {
        debug!("rejecting blank item text");
        return None;
    }
    Some(TextItem::new(text))
}

fn replace_text(items: &[TextItem], item_id: &ItemId, text: &str) -> Option<Vec<TextItem>> {
    if is_blank(text) || !items.iter().any(|i| &i.id == item_id) {
        return None;
    }
    Some(
        items
            .iter()
            .map(|i| {
                if &i.id == item_id {
                    TextItem {
                        id: i.id.clone(),
                        text: text.to_string(),
                    }
                } else {
                    i.clone()
                }
            })
            .collect(),
    )
}

fn remove_item(items: &[TextItem], item_id: &ItemId) -> Option<Vec<TextItem>> {
    if !items.iter().any(|i| &i.id == item_id) {
        return None;
    }
    Some(items.iter().filter(|i| &i.id != item_id).cloned().collect())
}

fn map_node(
    snapshot: &Snapshot,
    node_id: &NodeId,
    f: impl FnOnce(&ConceptNode) -> Option<ConceptNode>,
) -> Option<Snapshot> {
    let index = snapshot.nodes.iter().position(|n| &n.id == node_id)?;
    let replacement = f(snapshot.nodes[index].as_ref())?;
    let mut nodes = snapshot.nodes.clone();
    nodes[index] = Arc::new(replacement);
    Some(Snapshot {
        nodes,
        edges: snapshot.edges.clone(),
    })
}

fn map_edge(
    snapshot: &Snapshot,
    edge_id: &EdgeId,
    f: impl FnOnce(&ConceptEdge) -> Option<ConceptEdge>,
) -> Option<Snapshot> {
    let index = snapshot.edges.iter().position(|e| &e.id == edge_id)?;
    let replacement = f(snapshot.edges[index].as_ref())?;
    let mut edges = snapshot.edges.clone();
    edges[index] = Arc::new(replacement);
    Some(Snapshot {
        nodes: snapshot.nodes.clone(),
        edges,
    })
}
