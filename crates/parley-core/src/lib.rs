//! Conversation orchestration and context management for Parley.

mod conversation;

pub use conversation::{Conversation, ConversationConfig, Reply};
