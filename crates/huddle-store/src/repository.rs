//! The conversation repository.
//!
//! Owns the ordered message history for one conversation key and keeps the
//! durable copy in lockstep: every mutation serializes the full history and
//! writes it in a single upsert, so the store either fully reflects the new
//! state or is left exactly as before.

use std::sync::{Arc, Mutex};

use rusqlite::OptionalExtension;
use tracing::{debug, warn};

use huddle_core::error::HuddleError;
use huddle_core::types::{Conversation, Message};

use crate::db::Database;

pub struct ConversationRepository {
    db: Arc<Database>,
    key: String,
    history: Mutex<Vec<Message>>,
}

impl ConversationRepository {
    /// Open the repository for a conversation key, loading any persisted
    /// history. Missing or malformed durable data yields an empty history.
    pub fn open(db: Arc<Database>, key: impl Into<String>) -> Result<Self, HuddleError> {
        let key = key.into();
        let messages = read_durable(&db, &key)?;
        debug!(key = %key, message_count = messages.len(), "Conversation loaded");
        Ok(Self {
            db,
            key,
            history: Mutex::new(messages),
        })
    }

    /// Read the durable snapshot.
    ///
    /// Missing and malformed content both come back as an empty
    /// conversation, never an error.
    pub fn load(&self) -> Conversation {
        match read_durable(&self.db, &self.key) {
            Ok(messages) => Conversation { messages },
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to read conversation, treating as empty");
                Conversation::new()
            }
        }
    }

    /// Current in-memory snapshot.
    pub fn snapshot(&self) -> Conversation {
        let history = self.lock_history();
        Conversation {
            messages: history.clone(),
        }
    }

    /// Append a message to the tail and persist before returning.
    pub fn append(&self, message: Message) -> Result<Conversation, HuddleError> {
        let mut history = self.lock_history();
        history.push(message);
        if let Err(e) = self.persist(&history) {
            history.pop();
            return Err(e);
        }
        Ok(Conversation {
            messages: history.clone(),
        })
    }

    /// Overwrite the most recent entry and persist before returning.
    ///
    /// Used by reveal ticks to grow the visible assistant text. Returns
    /// `EmptyHistory` if there is nothing to overwrite; that is a
    /// programming defect, not a user-facing condition.
    pub fn replace_last(&self, message: Message) -> Result<Conversation, HuddleError> {
        let mut history = self.lock_history();
        let Some(last) = history.last_mut() else {
            return Err(HuddleError::EmptyHistory);
        };
        let previous = std::mem::replace(last, message);
        if let Err(e) = self.persist(&history) {
            *history.last_mut().expect("history cannot be empty here") = previous;
            return Err(e);
        }
        Ok(Conversation {
            messages: history.clone(),
        })
    }

    /// Empty the history and erase the durable snapshot.
    pub fn clear(&self) -> Result<(), HuddleError> {
        let mut history = self.lock_history();
        let previous = std::mem::take(&mut *history);
        let result = self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM conversations WHERE key = ?1",
                rusqlite::params![self.key],
            )
            .map_err(|e| HuddleError::Storage(format!("Failed to clear conversation: {}", e)))?;
            Ok(())
        });
        if let Err(e) = result {
            *history = previous;
            return Err(e);
        }
        debug!(key = %self.key, "Conversation cleared");
        Ok(())
    }

    fn persist(&self, messages: &[Message]) -> Result<(), HuddleError> {
        let serialized = serde_json::to_string(messages)?;
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO conversations (key, history, updated_at)
                 VALUES (?1, ?2, strftime('%s', 'now'))
                 ON CONFLICT(key) DO UPDATE SET
                     history = excluded.history,
                     updated_at = excluded.updated_at",
                rusqlite::params![self.key, serialized],
            )
            .map_err(|e| HuddleError::Storage(format!("Failed to persist conversation: {}", e)))?;
            Ok(())
        })
    }

    fn lock_history(&self) -> std::sync::MutexGuard<'_, Vec<Message>> {
        self.history.lock().expect("history mutex poisoned")
    }
}

impl std::fmt::Debug for ConversationRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationRepository")
            .field("key", &self.key)
            .finish()
    }
}

/// Read and parse the persisted history for a key.
///
/// A missing row or unparseable payload both come back as an empty list;
/// only a database-level failure is an error.
fn read_durable(db: &Database, key: &str) -> Result<Vec<Message>, HuddleError> {
    let raw: Option<String> = db.with_conn(|conn| {
        conn.query_row(
            "SELECT history FROM conversations WHERE key = ?1",
            rusqlite::params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| HuddleError::Storage(format!("Failed to read conversation: {}", e)))
    })?;

    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    match serde_json::from_str(&raw) {
        Ok(messages) => Ok(messages),
        Err(e) => {
            warn!(key = %key, error = %e, "Persisted history is malformed, starting empty");
            Ok(Vec::new())
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> ConversationRepository {
        let db = Arc::new(Database::in_memory().unwrap());
        ConversationRepository::open(db, "test_chat").unwrap()
    }

    // ---- Load ----

    #[test]
    fn test_open_with_no_history() {
        let repo = repo();
        assert!(repo.load().is_empty());
        assert!(repo.snapshot().is_empty());
    }

    #[test]
    fn test_open_with_existing_history() {
        let db = Arc::new(Database::in_memory().unwrap());
        {
            let repo = ConversationRepository::open(Arc::clone(&db), "chat").unwrap();
            repo.append(Message::user("hello")).unwrap();
        }

        let repo = ConversationRepository::open(db, "chat").unwrap();
        let convo = repo.snapshot();
        assert_eq!(convo.len(), 1);
        assert_eq!(convo.messages[0].text, "hello");
    }

    #[test]
    fn test_malformed_history_loads_as_empty() {
        let db = Arc::new(Database::in_memory().unwrap());
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO conversations (key, history) VALUES ('chat', 'not json')",
                [],
            )
            .map_err(|e| HuddleError::Storage(e.to_string()))?;
            Ok(())
        })
        .unwrap();

        let repo = ConversationRepository::open(db, "chat").unwrap();
        assert!(repo.snapshot().is_empty());
        assert!(repo.load().is_empty());
    }

    // ---- Append ----

    #[test]
    fn test_append_returns_updated_snapshot() {
        let repo = repo();
        let convo = repo.append(Message::user("first")).unwrap();
        assert_eq!(convo.len(), 1);

        let convo = repo.append(Message::assistant("second")).unwrap();
        assert_eq!(convo.len(), 2);
        assert_eq!(convo.messages[1].text, "second");
    }

    #[test]
    fn test_append_persists_immediately() {
        let repo = repo();
        repo.append(Message::user("durable")).unwrap();

        // The durable snapshot must equal the in-memory one right away.
        let durable = repo.load();
        assert_eq!(durable, repo.snapshot());
        assert_eq!(durable.messages[0].text, "durable");
    }

    #[test]
    fn test_insertion_order_is_preserved() {
        let repo = repo();
        for i in 0..5 {
            repo.append(Message::user(format!("m{}", i))).unwrap();
        }
        let convo = repo.load();
        for (i, msg) in convo.messages.iter().enumerate() {
            assert_eq!(msg.text, format!("m{}", i));
        }
    }

    // ---- Replace last ----

    #[test]
    fn test_replace_last_grows_tail() {
        let repo = repo();
        repo.append(Message::user("hi")).unwrap();
        let placeholder = Message::assistant("");
        repo.append(placeholder.clone()).unwrap();

        repo.replace_last(placeholder.with_text("hello")).unwrap();
        let convo = repo.replace_last(placeholder.with_text("hello there")).unwrap();

        assert_eq!(convo.len(), 2);
        assert_eq!(convo.last().unwrap().text, "hello there");
        assert_eq!(convo.last().unwrap().id, placeholder.id);
        // Durable copy tracks every overwrite.
        assert_eq!(repo.load().last().unwrap().text, "hello there");
    }

    #[test]
    fn test_replace_last_only_touches_tail() {
        let repo = repo();
        repo.append(Message::user("untouched")).unwrap();
        let placeholder = Message::assistant("");
        repo.append(placeholder.clone()).unwrap();

        repo.replace_last(placeholder.with_text("reply")).unwrap();
        let convo = repo.snapshot();
        assert_eq!(convo.messages[0].text, "untouched");
    }

    #[test]
    fn test_replace_last_on_empty_history() {
        let repo = repo();
        let result = repo.replace_last(Message::assistant("orphan"));
        assert!(matches!(result, Err(HuddleError::EmptyHistory)));
        assert!(repo.snapshot().is_empty());
    }

    // ---- Clear ----

    #[test]
    fn test_clear_empties_memory_and_storage() {
        let repo = repo();
        repo.append(Message::user("a")).unwrap();
        repo.append(Message::assistant("b")).unwrap();

        repo.clear().unwrap();
        assert!(repo.snapshot().is_empty());
        assert!(repo.load().is_empty());
    }

    #[test]
    fn test_clear_survives_reopen() {
        let db = Arc::new(Database::in_memory().unwrap());
        {
            let repo = ConversationRepository::open(Arc::clone(&db), "chat").unwrap();
            repo.append(Message::user("gone soon")).unwrap();
            repo.clear().unwrap();
        }

        let repo = ConversationRepository::open(db, "chat").unwrap();
        assert!(repo.snapshot().is_empty());
    }

    #[test]
    fn test_clear_on_empty_history_is_ok() {
        let repo = repo();
        repo.clear().unwrap();
        assert!(repo.snapshot().is_empty());
    }

    // ---- Key isolation ----

    #[test]
    fn test_keys_are_independent() {
        let db = Arc::new(Database::in_memory().unwrap());
        let a = ConversationRepository::open(Arc::clone(&db), "a").unwrap();
        let b = ConversationRepository::open(Arc::clone(&db), "b").unwrap();

        a.append(Message::user("for a")).unwrap();
        assert!(b.load().is_empty());

        a.clear().unwrap();
        b.append(Message::user("for b")).unwrap();
        assert!(a.load().is_empty());
        assert_eq!(b.load().len(), 1);
    }
}
