use crate::codec::{self, ExportFile};
use crate::config::EditorConfig;
use crate::error::ShiplogError;
use crate::history::History;
use crate::ids::{EdgeId, ItemId, NodeId};
use crate::model::{Position, Snapshot};
use crate::mutation::{self, EdgePatch, NodePatch};
use crate::persistence::Persistence;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// At most one entity is selected at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Node(NodeId),
    Edge(EdgeId),
}

impl Selection {
    pub fn node(&self) -> Option<&NodeId> {
        match self {
            Selection::Node(id) => Some(id),
            _ => None,
        }
    }

    pub fn edge(&self) -> Option<&EdgeId> {
        match self {
            Selection::Edge(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Selection::None)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Spawn a default node near the configured center.
    AddNode,
    Connect { source: NodeId, target: NodeId },
    DeleteSelection,
    DeleteNode(NodeId),
    DeleteEdge(EdgeId),
    UpdateNode { id: NodeId, patch: NodePatch },
    UpdateEdge { id: EdgeId, patch: EdgePatch },
    /// Position reported by the renderer. While `dragging` the move is
    /// previewed; the final report records one history entry.
    MoveNode { id: NodeId, position: Position, dragging: bool },
    AddDetail { node: NodeId, text: String },
    UpdateDetail { node: NodeId, item: ItemId, text: String },
    DeleteDetail { node: NodeId, item: ItemId },
    AddMeta { edge: EdgeId, text: String },
    UpdateMeta { edge: EdgeId, item: ItemId, text: String },
    DeleteMeta { edge: EdgeId, item: ItemId },
    SelectNode(NodeId),
    SelectEdge(EdgeId),
    ClearSelection,
    Undo,
    Redo,
    /// Adopt a whole new snapshot as one undoable step.
    ReplaceAll(Snapshot),
}

/// What a dispatched action did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Applied {
    /// The present snapshot changed.
    pub changed: bool,
    pub created: Option<Created>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Created {
    Node(NodeId),
    Edge(EdgeId),
    Item(ItemId),
}

impl Applied {
    fn unchanged() -> Self {
        Applied::default()
    }

    fn changed() -> Self {
        Applied {
            changed: true,
            created: None,
        }
    }

    fn created(created: Created) -> Self {
        Applied {
            changed: true,
            created: Some(created),
        }
    }
}

/// Owned editor state: history plus the ephemeral selection.
#[derive(Debug, Clone)]
pub struct EditorState {
    history: History,
    selection: Selection,
    config: EditorConfig,
}

impl EditorState {
    /// Fails with [`ShiplogError::Config`] when `config` does not validate.
    pub fn new(initial: Snapshot, config: EditorConfig) -> Result<Self, ShiplogError> {
        config.validate()?;
        Ok(EditorState {
            history: History::with_limit(initial, config.history_limit),
            selection: Selection::None,
            config,
        })
    }

    pub fn present(&self) -> &Snapshot {
        self.history.present()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Replace the present without an undo step (session restore).
    pub fn restore(&mut self, snapshot: Snapshot) {
        self.history.set_without_recording(snapshot);
        self.selection = Selection::None;
    }

    pub fn dispatch(&mut self, action: Action) -> Applied {
        let present = self.history.present();
        match action {
            Action::AddNode => {
                let node = mutation::spawn_node(self.config.spawn_center, self.config.spawn_jitter);
                let id = node.id.clone();
                let next = mutation::add_node(present, node);
                self.history.record(next);
                Applied::created(Created::Node(id))
            }
            Action::Connect { source, target } => {
                match mutation::connect(present, &source, &target) {
                    Some((next, id)) => {
                        self.history.record(next);
                        Applied::created(Created::Edge(id))
                    }
                    None => Applied::unchanged(),
                }
            }
            Action::DeleteSelection => self.delete_selection(),
            Action::DeleteNode(id) => {
                let next = mutation::delete_node(present, &id);
                let applied = self.commit(next);
                if self.selection.node() == Some(&id) {
                    self.selection = Selection::None;
                }
                applied
            }
            Action::DeleteEdge(id) => {
                let next = mutation::delete_edge(present, &id);
                let applied = self.commit(next);
                if self.selection.edge() == Some(&id) {
                    self.selection = Selection::None;
                }
                applied
            }
            Action::UpdateNode { id, patch } => {
                let next = mutation::update_node(present, &id, patch);
                self.commit(next)
            }
            Action::UpdateEdge { id, patch } => {
                let next = mutation::update_edge(present, &id, patch);
                self.commit(next)
            }
            Action::MoveNode {
                id,
                position,
                dragging,
            } => self.move_node(&id, position, dragging),
            Action::AddDetail { node, text } => {
                let next = mutation::add_detail(present, &node, &text);
                self.commit_created(next)
            }
            Action::UpdateDetail { node, item, text } => {
                let next = mutation::update_detail(present, &node, &item, &text);
                self.commit(next)
            }
            Action::DeleteDetail { node, item } => {
                let next = mutation::delete_detail(present, &node, &item);
                self.commit(next)
            }
            Action::AddMeta { edge, text } => {
                let next = mutation::add_meta(present, &edge, &text);
                self.commit_created(next)
            }
            Action::UpdateMeta { edge, item, text } => {
                let next = mutation::update_meta(present, &edge, &item, &text);
                self.commit(next)
            }
            Action::DeleteMeta { edge, item } => {
                let next = mutation::delete_meta(present, &edge, &item);
                self.commit(next)
            }
            Action::SelectNode(id) => {
                if present.contains_node(&id) {
                    self.selection = Selection::Node(id);
                }
                Applied::unchanged()
            }
            Action::SelectEdge(id) => {
                if present.contains_edge(&id) {
                    self.selection = Selection::Edge(id);
                }
                Applied::unchanged()
            }
            Action::ClearSelection => {
                self.selection = Selection::None;
                Applied::unchanged()
            }
            Action::Undo => {
                let moved = self.history.undo();
                self.drop_stale_selection();
                Applied {
                    changed: moved,
                    created: None,
                }
            }
            Action::Redo => {
                let moved = self.history.redo();
                self.drop_stale_selection();
                Applied {
                    changed: moved,
                    created: None,
                }
            }
            Action::ReplaceAll(snapshot) => {
                self.selection = Selection::None;
                self.history.record(snapshot);
                Applied::changed()
            }
        }
    }

    fn commit(&mut self, next: Option<Snapshot>) -> Applied {
        match next {
            Some(next) => {
                self.history.record(next);
                Applied::changed()
            }
            None => Applied::unchanged(),
        }
    }

    fn commit_created(&mut self, next: Option<(Snapshot, ItemId)>) -> Applied {
        match next {
            Some((next, item)) => {
                self.history.record(next);
                Applied::created(Created::Item(item))
            }
            None => Applied::unchanged(),
        }
    }

    fn delete_selection(&mut self) -> Applied {
        let present = self.history.present();
        let next = match &self.selection {
            Selection::Node(id) => mutation::delete_node(present, id),
            Selection::Edge(id) => mutation::delete_edge(present, id),
            Selection::None => None,
        };
        let Some(next) = next else {
            return Applied::unchanged();
        };
        debug!(selection = ?self.selection, "delete_selection");
        self.selection = Selection::None;
        self.history.record(next);
        Applied::changed()
    }

    fn move_node(&mut self, id: &NodeId, position: Position, dragging: bool) -> Applied {
        let Some(next) = mutation::move_node(self.history.present(), id, position) else {
            return Applied::unchanged();
        };
        if dragging {
            self.history.preview(next);
            return Applied::changed();
        }
        if self.history.in_gesture() {
            self.history.preview(next);
            let recorded = self.history.end_gesture();
            return Applied {
                changed: recorded,
                created: None,
            };
        }
        if &next == self.history.present() {
            return Applied::unchanged();
        }
        self.history.record(next);
        Applied::changed()
    }

    fn drop_stale_selection(&mut self) {
        let present = self.history.present();
        let stale = match &self.selection {
            Selection::Node(id) => !present.contains_node(id),
            Selection::Edge(id) => !present.contains_edge(id),
            Selection::None => false,
        };
        if stale {
            self.selection = Selection::None;
        }
    }
}

/// Reducer form of [`EditorState::dispatch`].
pub fn apply(mut state: EditorState, action: Action) -> EditorState {
    state.dispatch(action);
    state
}

/// Proof that an import was started; redeemed by [`Editor::finish_import`].
#[derive(Debug)]
pub struct ImportTicket {
    _private: (),
}

/// Host-side editor: state plus the storage it mirrors into.
pub struct Editor {
    state: EditorState,
    persistence: Persistence,
    import_pending: bool,
}

impl Editor {
    /// Restore the last session (or the seed) without creating an undo step.
    pub fn open(mut persistence: Persistence, config: EditorConfig) -> Result<Self, ShiplogError> {
        let mut state = EditorState::new(Snapshot::default(), config)?;
        state.restore(persistence.load());
        info!(
            nodes = state.present().nodes.len(),
            edges = state.present().edges.len(),
            "editor opened"
        );
        Ok(Editor {
            state,
            persistence,
            import_pending: false,
        })
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn present(&self) -> &Snapshot {
        self.state.present()
    }

    pub fn selection(&self) -> &Selection {
        self.state.selection()
    }

    pub fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    pub fn dispatch(&mut self, action: Action) -> Applied {
        let applied = self.state.dispatch(action);
        if applied.changed {
            self.persistence.sync(self.state.present());
        }
        applied
    }

    pub fn export(&self, at: DateTime<Utc>) -> Result<ExportFile, ShiplogError> {
        codec::export_document(self.present(), &self.state.config().export_prefix, at)
    }

    pub fn import_pending(&self) -> bool {
        self.import_pending
    }

    /// Start reading an import file. Only one import may be in flight.
    pub fn begin_import(&mut self) -> Result<ImportTicket, ShiplogError> {
        if self.import_pending {
            return Err(ShiplogError::ImportInProgress);
        }
        self.import_pending = true;
        Ok(ImportTicket { _private: () })
    }

    /// Apply the text of a started import. On failure the editor is left
    /// exactly as it was.
    pub fn finish_import(&mut self, ticket: ImportTicket, text: &str) -> Result<Applied, ShiplogError> {
        drop(ticket);
        if !self.import_pending {
            return Err(ShiplogError::NoImportPending);
        }
        self.import_pending = false;
        self.import(text)
    }

    /// Parse `text` and adopt it as an undoable step. Only reachable through
    /// a redeemed ticket.
    fn import(&mut self, text: &str) -> Result<Applied, ShiplogError> {
        let snapshot = match codec::import_json(text) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "import rejected");
                return Err(e);
            }
        };
        info!(
            nodes = snapshot.nodes.len(),
            edges = snapshot.edges.len(),
            "snapshot imported"
        );
        Ok(self.dispatch(Action::ReplaceAll(snapshot)))
    }

    /// Give up on a started import without touching state.
    pub fn cancel_import(&mut self, ticket: ImportTicket) {
        drop(ticket);
        self.import_pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColorLabel, ConceptNode, NodeColor};
    use crate::persistence::{seed_snapshot, MemoryStore};

    fn single() -> Snapshot {
        Snapshot::new(
            vec![ConceptNode::new(
                NodeId::from("a"),
                "A",
                ColorLabel::Blue.into(),
                Position::default(),
            )],
            Vec::new(),
        )
    }

    fn state() -> EditorState {
        EditorState::new(single(), EditorConfig::default()).unwrap()
    }

    fn editor() -> Editor {
        let persistence = Persistence::new(Box::new(MemoryStore::new()), "test");
        Editor::open(persistence, EditorConfig::default()).unwrap()
    }

    fn created_node(applied: &Applied) -> NodeId {
        match &applied.created {
            Some(Created::Node(id)) => id.clone(),
            other => panic!("expected node, got {other:?}"),
        }
    }

    #[test]
    fn test_add_node_then_undo() {
        let mut s = state();
        s.dispatch(Action::AddNode);
        assert_eq!(s.present().nodes.len(), 2);
        assert_eq!(s.history().past().len(), 1);
        assert_eq!(s.history().past()[0], single());
        assert_eq!(s.history().future().len(), 0);

        s.dispatch(Action::Undo);
        assert_eq!(s.present(), &single());
        assert_eq!(s.history().future().len(), 1);
    }

    #[test]
    fn test_apply_reducer_form() {
        let s = apply(state(), Action::AddNode);
        let s = apply(s, Action::Undo);
        let s = apply(s, Action::Redo);
        assert_eq!(s.present().nodes.len(), 2);
    }

    #[test]
    fn test_noop_actions_record_nothing() {
        let mut s = state();
        let ghost = NodeId::from("ghost");
        for action in [
            Action::DeleteSelection,
            Action::DeleteNode(ghost.clone()),
            Action::UpdateNode {
                id: ghost.clone(),
                patch: NodePatch::title("x"),
            },
            Action::AddDetail {
                node: NodeId::from("a"),
                text: "  ".to_string(),
            },
            Action::Connect {
                source: NodeId::from("a"),
                target: ghost.clone(),
            },
            Action::Undo,
            Action::Redo,
        ] {
            assert!(!s.dispatch(action).changed);
        }
        assert!(s.history().past().is_empty());
    }

    #[test]
    fn test_selection_is_exclusive() {
        let mut s = state();
        let b = created_node(&s.dispatch(Action::AddNode));
        let applied = s.dispatch(Action::Connect {
            source: NodeId::from("a"),
            target: b.clone(),
        });
        let Some(Created::Edge(edge)) = applied.created else {
            panic!("expected edge");
        };

        s.dispatch(Action::SelectNode(b.clone()));
        assert_eq!(s.selection(), &Selection::Node(b));
        s.dispatch(Action::SelectEdge(edge.clone()));
        assert_eq!(s.selection(), &Selection::Edge(edge));
        s.dispatch(Action::ClearSelection);
        assert!(s.selection().is_none());

        s.dispatch(Action::SelectNode(NodeId::from("ghost")));
        assert!(s.selection().is_none());
    }

    #[test]
    fn test_delete_selected_node_removes_its_edges() {
        let mut s = state();
        let b = created_node(&s.dispatch(Action::AddNode));
        s.dispatch(Action::Connect {
            source: NodeId::from("a"),
            target: b.clone(),
        });
        s.dispatch(Action::Connect {
            source: b.clone(),
            target: b.clone(),
        });
        assert_eq!(s.present().edges.len(), 2);

        s.dispatch(Action::SelectNode(b.clone()));
        assert!(s.dispatch(Action::DeleteSelection).changed);
        assert!(s.present().edges.is_empty());
        assert!(!s.present().contains_node(&b));
        assert!(s.selection().is_none());

        // the compound delete is a single step
        s.dispatch(Action::Undo);
        assert_eq!(s.present().edges.len(), 2);
    }

    #[test]
    fn test_delete_selected_edge_only() {
        let mut s = state();
        let b = created_node(&s.dispatch(Action::AddNode));
        let applied = s.dispatch(Action::Connect {
            source: NodeId::from("a"),
            target: b,
        });
        let Some(Created::Edge(edge)) = applied.created else {
            panic!("expected edge");
        };
        s.dispatch(Action::SelectEdge(edge));
        s.dispatch(Action::DeleteSelection);
        assert_eq!(s.present().nodes.len(), 2);
        assert!(s.present().edges.is_empty());
        assert!(s.selection().is_none());
    }

    #[test]
    fn test_selection_survives_undo_selection_is_not_history() {
        let mut s = state();
        s.dispatch(Action::SelectNode(NodeId::from("a")));
        s.dispatch(Action::UpdateNode {
            id: NodeId::from("a"),
            patch: NodePatch::color(ColorLabel::Red),
        });
        s.dispatch(Action::Undo);
        assert_eq!(s.selection(), &Selection::Node(NodeId::from("a")));
        assert_eq!(
            s.present().nodes[0].data.color,
            NodeColor::Label(ColorLabel::Blue)
        );
    }

    #[test]
    fn test_undo_clears_selection_of_vanished_node() {
        let mut s = state();
        let b = created_node(&s.dispatch(Action::AddNode));
        s.dispatch(Action::SelectNode(b));
        s.dispatch(Action::Undo);
        assert!(s.selection().is_none());
    }

    #[test]
    fn test_drag_records_one_entry() {
        let mut s = state();
        let a = NodeId::from("a");
        for i in 1..=20 {
            s.dispatch(Action::MoveNode {
                id: a.clone(),
                position: Position::new(i as f64, i as f64),
                dragging: true,
            });
        }
        assert!(s.history().past().is_empty());
        s.dispatch(Action::MoveNode {
            id: a.clone(),
            position: Position::new(50.0, 50.0),
            dragging: false,
        });
        assert_eq!(s.history().past().len(), 1);
        assert_eq!(s.present().nodes[0].position, Position::new(50.0, 50.0));

        s.dispatch(Action::Undo);
        assert_eq!(s.present(), &single());
    }

    #[test]
    fn test_mutation_mid_drag_keeps_drag_as_own_step() {
        let mut s = state();
        let a = NodeId::from("a");
        s.dispatch(Action::MoveNode {
            id: a.clone(),
            position: Position::new(9.0, 9.0),
            dragging: true,
        });
        s.dispatch(Action::AddDetail {
            node: a,
            text: "fact".to_string(),
        });
        assert_eq!(s.history().past().len(), 2);
        s.dispatch(Action::Undo);
        assert_eq!(s.present().nodes[0].position, Position::new(9.0, 9.0));
        s.dispatch(Action::Undo);
        assert_eq!(s.present(), &single());
    }

    #[test]
    fn test_history_limit_from_config() {
        let config = EditorConfig {
            history_limit: Some(3),
            ..Default::default()
        };
        let mut s = EditorState::new(single(), config).unwrap();
        for _ in 0..10 {
            s.dispatch(Action::AddNode);
        }
        assert_eq!(s.history().past().len(), 3);
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let nan_jitter = EditorConfig {
            spawn_jitter: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(
            EditorState::new(single(), nan_jitter.clone()),
            Err(ShiplogError::Config(_))
        ));
        let persistence = Persistence::new(Box::new(MemoryStore::new()), "test");
        assert!(matches!(
            Editor::open(persistence, nan_jitter),
            Err(ShiplogError::Config(_))
        ));

        let huge_jitter = EditorConfig {
            spawn_jitter: 1.0e300,
            ..Default::default()
        };
        assert!(EditorState::new(single(), huge_jitter).is_err());

        let zero_limit = EditorConfig {
            history_limit: Some(0),
            ..Default::default()
        };
        assert!(EditorState::new(single(), zero_limit).is_err());
    }

    #[test]
    fn test_editor_open_restores_without_history() {
        let e = editor();
        assert_eq!(e.present(), &seed_snapshot());
        assert!(!e.state().history().can_undo());
    }

    #[test]
    fn test_editor_persists_changes() {
        let mut e = editor();
        e.dispatch(Action::AddNode);
        let stored = e.persistence().store().get("test").unwrap().unwrap();
        assert_eq!(codec::import_json(&stored).unwrap(), *e.present());
    }

    #[test]
    fn test_import_is_undoable_and_clears_selection() {
        let mut e = editor();
        e.dispatch(Action::SelectNode(NodeId::from("seed-ruins")));
        let ticket = e.begin_import().unwrap();
        assert!(e.import_pending());

        let text = r#"{"nodes": [{"id": "x", "data": {"title": "Imported"}}], "edges": []}"#;
        assert!(e.finish_import(ticket, text).unwrap().changed);
        assert!(!e.import_pending());
        assert!(e.selection().is_none());
        assert_eq!(e.present().nodes.len(), 1);

        e.dispatch(Action::Undo);
        assert_eq!(e.present(), &seed_snapshot());
    }

    #[test]
    fn test_failed_import_leaves_state_untouched() {
        let mut e = editor();
        e.dispatch(Action::AddNode);
        e.dispatch(Action::SelectNode(NodeId::from("seed-ruins")));
        let before_present = e.present().clone();
        let before_history = e.state().history().clone();

        for text in ["{", r#"{"nodes": []}"#, r#"{"edges": []}"#] {
            let ticket = e.begin_import().unwrap();
            let err = e.finish_import(ticket, text).unwrap_err();
            assert!(matches!(err, ShiplogError::MalformedDocument(_)));
        }
        assert_eq!(e.present(), &before_present);
        assert_eq!(e.state().history(), &before_history);
        assert_eq!(e.selection(), &Selection::Node(NodeId::from("seed-ruins")));
        assert!(!e.import_pending());
    }

    #[test]
    fn test_pending_import_lands_only_through_its_ticket() {
        let mut e = editor();
        let ticket = e.begin_import().unwrap();
        let text = r#"{"nodes": [{"id": "only"}], "edges": []}"#;

        // nothing changes while the file is still being read
        assert!(matches!(e.begin_import(), Err(ShiplogError::ImportInProgress)));
        assert_eq!(e.present(), &seed_snapshot());

        assert!(e.finish_import(ticket, text).unwrap().changed);
        assert_eq!(e.present().nodes.len(), 1);
        assert!(!e.import_pending());

        // a second import needs a fresh ticket
        let ticket = e.begin_import().unwrap();
        e.cancel_import(ticket);
        assert_eq!(e.present().nodes.len(), 1);
        assert!(!e.import_pending());
    }

    #[test]
    fn test_concurrent_import_rejected() {
        let mut e = editor();
        let ticket = e.begin_import().unwrap();
        assert!(matches!(e.begin_import(), Err(ShiplogError::ImportInProgress)));
        e.cancel_import(ticket);
        assert!(e.begin_import().is_ok());
    }

    #[test]
    fn test_export_uses_configured_prefix() {
        let e = editor();
        let file = e.export(Utc::now()).unwrap();
        assert!(file.name.starts_with("shiplog-"));
        assert_eq!(codec::import_json(&file.contents).unwrap(), seed_snapshot());
    }
}
