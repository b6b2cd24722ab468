use shiplog_core::persistence::seed_snapshot;
use shiplog_core::{Action, Created, Editor, EditorConfig, FileStore, NodeId, Persistence};
use std::fs;
use tempfile::TempDir;

fn open(dir: &TempDir) -> Editor {
    let config = EditorConfig::default();
    let store = FileStore::open(dir.path()).unwrap();
    let persistence = Persistence::new(Box::new(store), config.storage_key.clone());
    Editor::open(persistence, config).unwrap()
}

#[test]
fn test_session_survives_restart() {
    let tmp = TempDir::new().unwrap();
    let node = {
        let mut editor = open(&tmp);
        let applied = editor.dispatch(Action::AddNode);
        let Some(Created::Node(id)) = applied.created else {
            panic!("expected a node");
        };
        editor.dispatch(Action::AddDetail {
            node: id.clone(),
            text: "Ghost matter is invisible".to_string(),
        });
        id
    };

    let editor = open(&tmp);
    let restored = editor.present().node(&node).unwrap();
    assert_eq!(restored.data.details[0].text, "Ghost matter is invisible");
    // restoring is not an undoable step
    assert!(!editor.state().history().can_undo());
}

#[test]
fn test_corrupt_storage_falls_back_to_seed() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("ow_shiplog_snapshot_v1.json"), "{\"nodes\": [").unwrap();

    let mut editor = open(&tmp);
    assert_eq!(editor.present(), &seed_snapshot());

    // the seed is editable and overwrites the corrupt document
    editor.dispatch(Action::SelectNode(NodeId::from("seed-ruins")));
    editor.dispatch(Action::DeleteSelection);
    let reopened = open(&tmp);
    assert_eq!(reopened.present().nodes.len(), 1);
    assert!(reopened.present().edges.is_empty());
}

#[test]
fn test_undo_is_persisted() {
    let tmp = TempDir::new().unwrap();
    {
        let mut editor = open(&tmp);
        editor.dispatch(Action::AddNode);
        editor.dispatch(Action::Undo);
    }
    assert_eq!(open(&tmp).present(), &seed_snapshot());
}
