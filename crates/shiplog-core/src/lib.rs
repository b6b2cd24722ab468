pub mod codec;
pub mod config;
pub mod editor;
mod error;
pub mod history;
pub mod ids;
pub mod keymap;
pub mod model;
pub mod mutation;
pub mod persistence;
pub mod view;

pub use config::EditorConfig;
pub use editor::{apply, Action, Applied, Created, Editor, EditorState, ImportTicket, Selection};
pub use error::ShiplogError;
pub use history::History;
pub use ids::{new_id, EdgeId, ItemId, NodeId};
pub use model::{
    size_of, ColorLabel, ConceptEdge, ConceptNode, DetailItem, EdgeMetaItem, NodeColor,
    NodeSize, Position, SizePolicy, Snapshot, TextItem,
};
pub use persistence::{FileStore, KeyValueStore, MemoryStore, Persistence};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("shiplog_core=info"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .init();
    });
}
