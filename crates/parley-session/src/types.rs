//! Persisted conversation data.

use parley_types::Turn;
use serde::{Deserialize, Serialize};

/// The on-disk form of a conversation: the running summary plus the turns
/// that have not been folded into it yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(default)]
    pub history: Vec<Turn>,
}

impl PersistedState {
    pub fn new(summary: impl Into<String>, history: Vec<Turn>) -> Self {
        Self {
            summary: summary.into(),
            history,
        }
    }
}
