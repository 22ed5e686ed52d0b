use serde::{Deserialize, Serialize};

use super::ids::ConversationId;

/// Default conversation title, also substituted for blank titles on load.
pub const DEFAULT_CONVERSATION_TITLE: &str = "New Chat";

/// Storage-local speaker role, intentionally decoupled from the domain sender enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Append-order ordinal; unique and increasing within a snapshot.
    pub seq: u64,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub created_at_unix_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: ConversationId,
    pub title: String,
    pub created_at_unix_seconds: u64,
    pub updated_at_unix_seconds: u64,
    #[serde(default)]
    pub messages: Vec<MessageRecord>,
}

impl ConversationRecord {
    /// Returns the title, falling back to the default for blank legacy rows.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            DEFAULT_CONVERSATION_TITLE
        } else {
            &self.title
        }
    }
}
