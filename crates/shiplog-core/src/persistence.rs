use crate::codec;
use crate::config::validate_storage_key;
use crate::error::ShiplogError;
use crate::ids::{EdgeId, ItemId, NodeId};
use crate::model::{ColorLabel, ConceptEdge, ConceptNode, Position, Snapshot, TextItem};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Durable string storage addressed by key.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, ShiplogError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), ShiplogError>;
}

/// One `<key>.json` file per key inside a directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: &Path) -> Result<Self, ShiplogError> {
        fs::create_dir_all(dir)?;
        Ok(FileStore {
            dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, ShiplogError> {
        validate_storage_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, ShiplogError> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ShiplogError> {
        let path = self.path_for(key)?;
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, value)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let mut store = Self::new();
        store.entries.insert(key.to_string(), value.to_string());
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, ShiplogError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ShiplogError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Mirrors the present snapshot into a single storage key.
pub struct Persistence {
    store: Box<dyn KeyValueStore>,
    key: String,
    last_digest: Option<[u8; 32]>,
}

impl Persistence {
    pub fn new(store: Box<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Persistence {
            store,
            key: key.into(),
            last_digest: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        &*self.store
    }

    /// Restore the persisted snapshot, or the seed when there is none or it
    /// cannot be read. Never fails.
    pub fn load(&mut self) -> Snapshot {
        match self.try_load() {
            Ok(Some(snapshot)) => {
                info!(
                    key = %self.key,
                    nodes = snapshot.nodes.len(),
                    edges = snapshot.edges.len(),
                    "snapshot restored"
                );
                snapshot
            }
            Ok(None) => {
                info!(key = %self.key, "no stored snapshot, using seed");
                seed_snapshot()
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "stored snapshot unusable, using seed");
                seed_snapshot()
            }
        }
    }

    fn try_load(&mut self) -> Result<Option<Snapshot>, ShiplogError> {
        let Some(text) = self.store.get(&self.key)? else {
            return Ok(None);
        };
        let snapshot = codec::import_json(&text)?;
        self.last_digest = Some(digest(&text));
        Ok(Some(snapshot))
    }

    /// Write the snapshot, overwriting the previous value. Identical
    /// documents are not rewritten.
    pub fn save(&mut self, snapshot: &Snapshot) -> Result<bool, ShiplogError> {
        let json = serde_json::to_string(snapshot)?;
        let hash = digest(&json);
        if self.last_digest == Some(hash) {
            return Ok(false);
        }
        debug!(key = %self.key, bytes = json.len(), "persisting snapshot");
        self.store.set(&self.key, &json)?;
        self.last_digest = Some(hash);
        Ok(true)
    }

    /// `save` for the mutation path: failures are logged, not returned.
    pub fn sync(&mut self, snapshot: &Snapshot) {
        if let Err(e) = self.save(snapshot) {
            warn!(key = %self.key, error = %e, "failed to persist snapshot");
        }
    }
}

fn digest(text: &str) -> [u8; 32] {
    Sha256::digest(text.as_bytes()).into()
}

/// Starting canvas for a fresh session: two entries and one link.
pub fn seed_snapshot() -> Snapshot {
    let village = ConceptNode::new(
        NodeId::from("seed-village"),
        "Timber Hearth Village",
        ColorLabel::Green.into(),
        Position::new(160.0, 200.0),
    )
    .with_details(vec![
        TextItem {
            id: ItemId::from("seed-village-1"),
            text: "Launch codes obtained from the observatory".to_string(),
        },
        TextItem {
            id: ItemId::from("seed-village-2"),
            text: "Statue reacted to the translator".to_string(),
        },
    ]);
    let ruins = ConceptNode::new(
        NodeId::from("seed-ruins"),
        "Nomai Ruins",
        ColorLabel::Orange.into(),
        Position::new(560.0, 320.0),
    )
    .with_details(vec![TextItem {
        id: ItemId::from("seed-ruins-1"),
        text: "Writing mentions the Eye of the universe".to_string(),
    }]);

    let mut link = ConceptEdge::new(
        EdgeId::from("seed-link"),
        village.id.clone(),
        ruins.id.clone(),
    );
    link.data.meta.push(TextItem {
        id: ItemId::from("seed-link-1"),
        text: "Signal traced from the village".to_string(),
    });

    Snapshot::new(vec![village, ruins], vec![link])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_STORAGE_KEY;
    use crate::model::NodeColor;
    use tempfile::TempDir;

    fn sample() -> Snapshot {
        Snapshot::new(
            vec![ConceptNode::new(
                NodeId::from("a"),
                "A",
                NodeColor::default(),
                Position::default(),
            )],
            Vec::new(),
        )
    }

    #[test]
    fn test_seed_has_two_nodes_and_valid_edge() {
        let seed = seed_snapshot();
        assert_eq!(seed.nodes.len(), 2);
        assert_eq!(seed.edges.len(), 1);
        let edge = &seed.edges[0];
        assert!(seed.contains_node(&edge.source));
        assert!(seed.contains_node(&edge.target));
    }

    #[test]
    fn test_load_absent_key_uses_seed() {
        let mut persistence = Persistence::new(Box::new(MemoryStore::new()), DEFAULT_STORAGE_KEY);
        assert_eq!(persistence.load(), seed_snapshot());
    }

    #[test]
    fn test_load_corrupt_document_uses_seed() {
        for stored in ["{not json", r#"{"nodes": []}"#, r#"{"edges": []}"#, "null"] {
            let store = MemoryStore::with_entry(DEFAULT_STORAGE_KEY, stored);
            let mut persistence = Persistence::new(Box::new(store), DEFAULT_STORAGE_KEY);
            assert_eq!(persistence.load(), seed_snapshot(), "stored: {stored}");
        }
    }

    #[test]
    fn test_save_then_load_roundtrips() {
        let mut persistence = Persistence::new(Box::new(MemoryStore::new()), "k");
        assert!(persistence.save(&sample()).unwrap());
        let mut reopened = Persistence::new(
            Box::new(MemoryStore::with_entry(
                "k",
                &persistence.store().get("k").unwrap().unwrap(),
            )),
            "k",
        );
        assert_eq!(reopened.load(), sample());
    }

    #[test]
    fn test_unchanged_snapshot_is_not_rewritten() {
        let mut persistence = Persistence::new(Box::new(MemoryStore::new()), "k");
        assert!(persistence.save(&sample()).unwrap());
        assert!(!persistence.save(&sample()).unwrap());
        assert!(persistence.save(&seed_snapshot()).unwrap());
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let tmp = TempDir::new().unwrap();
        {
            let store = FileStore::open(tmp.path()).unwrap();
            let mut persistence = Persistence::new(Box::new(store), DEFAULT_STORAGE_KEY);
            persistence.sync(&sample());
        }
        assert!(tmp.path().join("ow_shiplog_snapshot_v1.json").exists());
        assert!(!tmp.path().join("ow_shiplog_snapshot_v1.tmp").exists());

        let store = FileStore::open(tmp.path()).unwrap();
        let mut persistence = Persistence::new(Box::new(store), DEFAULT_STORAGE_KEY);
        assert_eq!(persistence.load(), sample());
    }

    #[test]
    fn test_file_store_rejects_keys_outside_its_directory() {
        let tmp = TempDir::new().unwrap();
        let mut store = FileStore::open(&tmp.path().join("store")).unwrap();
        for key in ["../escape", "nested/key", ""] {
            assert!(matches!(store.set(key, "{}"), Err(ShiplogError::Config(_))), "key: {key:?}");
            assert!(matches!(store.get(key), Err(ShiplogError::Config(_))), "key: {key:?}");
        }
        assert!(!tmp.path().join("escape.json").exists());
    }

    #[test]
    fn test_file_store_missing_key_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(&tmp.path().join("nested")).unwrap();
        assert!(store.get("absent").unwrap().is_none());
    }
}
