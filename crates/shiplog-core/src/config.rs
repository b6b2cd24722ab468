use crate::error::ShiplogError;
use crate::model::{Position, SizePolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

pub const DEFAULT_STORAGE_KEY: &str = "ow_shiplog_snapshot_v1";
pub const DEFAULT_EXPORT_PREFIX: &str = "shiplog";
/// Largest accepted `spawn_jitter`, in canvas units.
pub const MAX_SPAWN_JITTER: f64 = 1.0e6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Key the present snapshot is persisted under.
    pub storage_key: String,
    pub export_prefix: String,
    /// Maximum undo depth. `None` keeps every step of the session.
    pub history_limit: Option<usize>,
    pub size_policy: SizePolicy,
    /// Where new nodes appear, before jitter.
    pub spawn_center: Position,
    pub spawn_jitter: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            export_prefix: DEFAULT_EXPORT_PREFIX.to_string(),
            history_limit: None,
            size_policy: SizePolicy::Fixed,
            spawn_center: Position::new(400.0, 300.0),
            spawn_jitter: 80.0,
        }
    }
}

impl EditorConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ShiplogError> {
        debug!(path = %path.display(), "loading config");
        let data = fs::read_to_string(path)?;
        let config: EditorConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ShiplogError> {
        validate_storage_key(&self.storage_key)?;
        if self.history_limit == Some(0) {
            return Err(ShiplogError::Config(
                "history_limit must be at least 1".to_string(),
            ));
        }
        if !(0.0..=MAX_SPAWN_JITTER).contains(&self.spawn_jitter) {
            return Err(ShiplogError::Config(format!(
                "spawn_jitter must be between 0 and {MAX_SPAWN_JITTER}, got {}",
                self.spawn_jitter
            )));
        }
        if !self.spawn_center.x.is_finite() || !self.spawn_center.y.is_finite() {
            return Err(ShiplogError::Config("spawn_center must be finite".to_string()));
        }
        Ok(())
    }
}

/// Storage keys name a single file inside the store directory.
pub fn validate_storage_key(key: &str) -> Result<(), ShiplogError> {
    if key.trim().is_empty() {
        return Err(ShiplogError::Config("storage_key is empty".to_string()));
    }
    if key.contains(['/', '\\']) || key.contains("..") {
        return Err(ShiplogError::Config(format!(
            "storage_key `{key}` must not contain path separators or `..`"
        )));
    }
    Ok(())
}
