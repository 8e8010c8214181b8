use thiserror::Error;

/// Caller mistakes reported by registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("invalid element name: {0:?} (expected a letter followed by letters, digits or '_')")]
    InvalidName(String),

    #[error("element name already in use: {0}")]
    NameInUse(String),

    #[error("element not found: {0}")]
    NotFound(String),
}

/// Storage backend failure. Logged by the registry, never returned from it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
