//! JSON export and lenient import of snapshot documents.
//!
//! A document is `{"nodes": [...], "edges": [...]}` with no envelope or
//! version tag. Imports are normalized by [`normalize_document`]: absent
//! fields are defaulted and unknown color strings are kept.

use crate::error::ShiplogError;
use crate::ids::{new_id, EdgeId, ItemId, NodeId};
use crate::model::{
    ConceptEdge, ConceptNode, Snapshot, TextItem, ARROW_CLOSED, NODE_KIND, UNTITLED,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use tracing::{info, warn};

/// A serialized snapshot ready to be offered as a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub name: String,
    pub contents: String,
}

pub fn export_json(snapshot: &Snapshot) -> Result<String, ShiplogError> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

/// `<prefix>-<YYYYMMDD-HHMMSS>.json`
pub fn export_file_name(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{prefix}-{}.json", at.format("%Y%m%d-%H%M%S"))
}

pub fn export_document(
    snapshot: &Snapshot,
    prefix: &str,
    at: DateTime<Utc>,
) -> Result<ExportFile, ShiplogError> {
    let file = ExportFile {
        name: export_file_name(prefix, at),
        contents: export_json(snapshot)?,
    };
    info!(
        file = %file.name,
        nodes = snapshot.nodes.len(),
        edges = snapshot.edges.len(),
        "snapshot exported"
    );
    Ok(file)
}

/// Parse and normalize a foreign document.
pub fn import_json(text: &str) -> Result<Snapshot, ShiplogError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| ShiplogError::malformed(format!("not valid JSON: {e}")))?;
    normalize_document(value)
}

/// Turn any `{nodes, edges}` value into a snapshot, filling defaults.
///
/// Fails when the value is not an object, when either key is missing or
/// not an array, or when an entry cannot be coerced into a node or edge.
/// Edges whose endpoints are not among the document's nodes are dropped.
pub fn normalize_document(value: Value) -> Result<Snapshot, ShiplogError> {
    let Value::Object(mut root) = value else {
        return Err(ShiplogError::malformed("top-level value is not an object"));
    };
    let raw_nodes = take_array(&mut root, "nodes")?;
    let raw_edges = take_array(&mut root, "edges")?;

    let mut nodes = raw_nodes
        .into_iter()
        .enumerate()
        .map(|(i, v)| normalize_node(v).map_err(|e| at_index("nodes", i, e)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut seen_nodes = HashSet::new();
    let mut seen_items = HashSet::new();
    for node in nodes.iter_mut() {
        if !seen_nodes.insert(node.id.clone()) {
            let fresh = NodeId::generate();
            warn!(duplicate = %node.id, replacement = %fresh, "renaming duplicate node id");
            node.id = fresh;
            seen_nodes.insert(node.id.clone());
        }
        dedupe_items(&mut node.data.details, &mut seen_items);
    }

    let known: HashSet<&NodeId> = nodes.iter().map(|n| &n.id).collect();
    let mut seen_edges = HashSet::new();
    let mut edges = Vec::with_capacity(raw_edges.len());
    for (i, raw) in raw_edges.into_iter().enumerate() {
        let mut edge = normalize_edge(raw).map_err(|e| at_index("edges", i, e))?;
        if !seen_edges.insert(edge.id.clone()) {
            let fresh = EdgeId::generate();
            warn!(duplicate = %edge.id, replacement = %fresh, "renaming duplicate edge id");
            edge.id = fresh;
            seen_edges.insert(edge.id.clone());
        }
        dedupe_items(&mut edge.data.meta, &mut seen_items);
        if known.contains(&edge.source) && known.contains(&edge.target) {
            edges.push(edge);
        } else {
            warn!(
                edge_id = %edge.id,
                source = %edge.source,
                target = %edge.target,
                "dropping edge with missing endpoint"
            );
        }
    }

    Ok(Snapshot::new(nodes, edges))
}

pub fn normalize_node(value: Value) -> Result<ConceptNode, ShiplogError> {
    let mut node = into_object(value, "node")?;
    fill(&mut node, "id", || Value::String(new_id("node")));
    fill(&mut node, "type", || Value::String(NODE_KIND.to_string()));
    fill(&mut node, "position", || json!({}));
    let position = object_field(&mut node, "position")?;
    fill(position, "x", || json!(0.0));
    fill(position, "y", || json!(0.0));

    fill(&mut node, "data", || json!({}));
    let data = object_field(&mut node, "data")?;
    fill(data, "title", || Value::String(UNTITLED.to_string()));
    fill(data, "color", || Value::String("gray".to_string()));
    fill(data, "details", || json!([]));
    normalize_items(data, "details")?;

    serde_json::from_value(Value::Object(node))
        .map_err(|e| ShiplogError::malformed(e.to_string()))
}

pub fn normalize_edge(value: Value) -> Result<ConceptEdge, ShiplogError> {
    let mut edge = into_object(value, "edge")?;
    fill(&mut edge, "id", || Value::String(new_id("edge")));
    fill(&mut edge, "markerEnd", || json!({ "type": ARROW_CLOSED }));
    let shorthand = edge
        .get("markerEnd")
        .and_then(Value::as_str)
        .map(str::to_string);
    if let Some(kind) = shorthand {
        edge.insert("markerEnd".to_string(), json!({ "type": kind }));
    }

    fill(&mut edge, "data", || json!({}));
    let data = object_field(&mut edge, "data")?;
    fill(data, "meta", || json!([]));
    normalize_items(data, "meta")?;

    serde_json::from_value(Value::Object(edge))
        .map_err(|e| ShiplogError::malformed(e.to_string()))
}

/// Later items reusing an id already seen anywhere in the document get a
/// fresh one.
fn dedupe_items(items: &mut [TextItem], seen: &mut HashSet<ItemId>) {
    for item in items.iter_mut() {
        if !seen.insert(item.id.clone()) {
            let fresh = ItemId::generate();
            warn!(duplicate = %item.id, replacement = %fresh, "renaming duplicate item id");
            item.id = fresh;
            seen.insert(item.id.clone());
        }
    }
}

fn normalize_items(parent: &mut Map<String, Value>, key: &str) -> Result<(), ShiplogError> {
    let Some(Value::Array(items)) = parent.get_mut(key) else {
        return Err(ShiplogError::malformed(format!("`{key}` is not an array")));
    };
    for item in items.iter_mut() {
        let Value::Object(fields) = item else {
            return Err(ShiplogError::malformed(format!("`{key}` entry is not an object")));
        };
        fill(fields, "id", || Value::String(new_id("item")));
        fill(fields, "text", || Value::String(String::new()));
    }
    Ok(())
}

/// Insert `default()` when `key` is absent or null.
fn fill(obj: &mut Map<String, Value>, key: &str, default: impl FnOnce() -> Value) {
    match obj.get(key) {
        None | Some(Value::Null) => {
            obj.insert(key.to_string(), default());
        }
        Some(_) => {}
    }
}

fn take_array(root: &mut Map<String, Value>, key: &str) -> Result<Vec<Value>, ShiplogError> {
    match root.remove(key) {
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(ShiplogError::malformed(format!("`{key}` is not an array"))),
        None => Err(ShiplogError::malformed(format!("missing `{key}`"))),
    }
}

fn into_object(value: Value, what: &str) -> Result<Map<String, Value>, ShiplogError> {
    match value {
        Value::Object(obj) => Ok(obj),
        _ => Err(ShiplogError::malformed(format!("{what} is not an object"))),
    }
}

fn object_field<'a>(
    obj: &'a mut Map<String, Value>,
    key: &str,
) -> Result<&'a mut Map<String, Value>, ShiplogError> {
    match obj.get_mut(key) {
        Some(Value::Object(inner)) => Ok(inner),
        _ => Err(ShiplogError::malformed(format!("`{key}` is not an object"))),
    }
}

fn at_index(list: &str, index: usize, err: ShiplogError) -> ShiplogError {
    match err {
        ShiplogError::MalformedDocument(reason) => {
            ShiplogError::MalformedDocument(format!("{list}[{index}]: {reason}"))
        }
        other => other,
    }
}
