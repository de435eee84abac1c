use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by knowledge store backends.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Knowledge entry not found: {0}")]
    EntryNotFound(String),

    #[error("Knowledge store unavailable: {0}")]
    Unavailable(String),
}

impl KnowledgeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        KnowledgeError::Io {
            path: path.into(),
            source,
        }
    }
}
