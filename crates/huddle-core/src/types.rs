use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// UTC timestamp used across the engine.
pub type Timestamp = DateTime<Utc>;

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// The person typing (or dictating) into the assistant panel.
    User,
    /// The assistant reply produced by the remote service.
    Assistant,
}

impl Sender {
    /// Stable string form used in logs and storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in a conversation.
///
/// User text is immutable once appended. Assistant text grows while a reply
/// is being revealed; the `id` and `timestamp` stay fixed across those
/// overwrites.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender: Sender,
    pub text: String,
    pub timestamp: Timestamp,
}

impl Message {
    /// Create a user message with a fresh id and the current time.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: Sender::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create an assistant message with a fresh id and the current time.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: Sender::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// The same message with different text. Keeps id and timestamp, which
    /// is what a reveal overwrite needs.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            id: self.id,
            sender: self.sender,
            text: text.into(),
            timestamp: self.timestamp,
        }
    }
}

/// The full ordered message history for one chat session.
///
/// Insertion order is display order. Entries are never removed one at a
/// time; the only destructive operation is a whole-history clear.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

// =============================================================================
// Tests
// =============================================================================
