//! Persistent conversation history backed by a single JSON file.

use crate::error::StoreError;
use crate::types::PersistedState;
use parley_types::Turn;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// One way of reading a history file.
pub struct Decoder {
    pub name: &'static str,
    pub decode: fn(&str) -> serde_json::Result<PersistedState>,
}

/// Recognized history formats, newest first. The first decoder that
/// succeeds wins.
pub const DECODERS: &[Decoder] = &[
    Decoder {
        name: "wrapped",
        decode: decode_wrapped,
    },
    Decoder {
        name: "legacy-array",
        decode: decode_legacy_array,
    },
];

/// `{"summary": "...", "history": [...]}`
fn decode_wrapped(data: &str) -> serde_json::Result<PersistedState> {
    serde_json::from_str(data)
}

/// A bare array of turns, written before summaries existed.
fn decode_legacy_array(data: &str) -> serde_json::Result<PersistedState> {
    let history: Vec<Turn> = serde_json::from_str(data)?;
    Ok(PersistedState::new("", history))
}

/// Run `data` through [`DECODERS`] in order. `None` if no format matches.
pub fn decode(data: &str) -> Option<PersistedState> {
    for decoder in DECODERS {
        match (decoder.decode)(data) {
            Ok(state) => {
                tracing::debug!("Decoded history as {} format", decoder.name);
                return Some(state);
            }
            Err(e) => tracing::debug!("History is not {} format: {e}", decoder.name),
        }
    }
    None
}

/// File-based history store.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored state. `Ok(None)` when nothing has been saved yet.
    pub async fn load(&self) -> Result<Option<PersistedState>, StoreError> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        decode(&data)
            .map(Some)
            .ok_or_else(|| StoreError::UnrecognizedFormat {
                path: self.path.clone(),
            })
    }

    /// Save the state, replacing the whole file (atomic write: .tmp → rename).
    pub async fn save(&self, state: &PersistedState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp_path = self.path.with_extension("tmp");
        let json = serde_json::to_string_pretty(state)?;
        tokio::fs::write(&tmp_path, json).await?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Delete the history file. A missing file is not an error.
    pub async fn delete(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
