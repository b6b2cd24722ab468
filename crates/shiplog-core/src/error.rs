use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShiplogError {
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("An import is already in progress")]
    ImportInProgress,

    #[error("No import is pending")]
    NoImportPending,

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ShiplogError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        ShiplogError::MalformedDocument(reason.into())
    }
}
