//! Persistence error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading, saving or deleting history.
///
/// These never abort a conversation: callers log them and carry on with
/// in-memory state.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unrecognized history format in {}", path.display())]
    UnrecognizedFormat { path: PathBuf },
}
