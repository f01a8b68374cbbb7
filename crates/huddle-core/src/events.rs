use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Sender, Timestamp};

/// Events emitted by the chat session engine.
///
/// The controller publishes these on a broadcast channel after state
/// changes; the UI layer consumes them to re-render from the current
/// history snapshot and to surface transient notifications.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SessionEvent {
    /// A message was appended to the history.
    MessageAppended {
        message_id: Uuid,
        sender: Sender,
        timestamp: Timestamp,
    },

    /// A reveal job started delivering an assistant reply.
    RevealStarted { message_id: Uuid },

    /// One more word of the assistant reply became visible.
    RevealTick {
        message_id: Uuid,
        revealed_chars: usize,
    },

    /// The assistant reply finished revealing.
    RevealCompleted { message_id: Uuid },

    /// The user stopped generation; the reply stays as far as it got.
    RevealCancelled { message_id: Uuid },

    /// The remote reply call failed and the fallback message was appended.
    ReplyFailed { reason: String },

    /// Voice input was requested but the capability is unavailable.
    VoiceUnsupported,

    /// The whole history was cleared, in memory and on disk.
    HistoryCleared,

    /// The user confirmed leaving the assistant panel.
    Exited,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_event_serde_round_trip() {
        let event = SessionEvent::MessageAppended {
            message_id: Uuid::new_v4(),
            sender: Sender::User,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: SessionEvent = serde_json::from_str(&json).unwrap();
        match back {
            SessionEvent::MessageAppended { sender, .. } => assert_eq!(sender, Sender::User),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_reply_failed_carries_reason() {
        let event = SessionEvent::ReplyFailed {
            reason: "connection refused".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("connection refused"));
    }

    #[test]
    fn test_events_are_cloneable() {
        let event = SessionEvent::HistoryCleared;
        let copy = event.clone();
        assert!(matches!(copy, SessionEvent::HistoryCleared));
    }
}
