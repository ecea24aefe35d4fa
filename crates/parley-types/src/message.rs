//! Message types for the Anthropic Messages API.

use serde::{Deserialize, Serialize};

/// Role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Human-readable label used when rendering a transcript.
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// A single role-tagged message in a conversation.
///
/// This is both the persisted history entry and the wire message: the
/// Messages API accepts a plain string as `content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Token usage information from an API response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

impl Usage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }
}

/// A request to the Anthropic Messages API.
#[derive(Debug, Clone, Serialize)]
pub struct CreateMessageRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<Turn>,
}

/// A response from the Anthropic Messages API.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMessageResponse {
    pub content: Vec<ResponseBlock>,
    #[serde(default)]
    pub usage: Usage,
}

impl CreateMessageResponse {
    /// Concatenated text of every text block, or `None` if there is none.
    pub fn text(&self) -> Option<String> {
        let mut text = String::new();
        let mut found = false;
        for block in &self.content {
            if let ResponseBlock::Text { text: t } = block {
                text.push_str(t);
                found = true;
            }
        }
        found.then_some(text)
    }
}

/// A content block in a response. Only text is consumed.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

/// Error response body from the API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub message: String,
}
