//! Error types for the session controller.

use huddle_core::error::HuddleError;
use huddle_voice::VoiceError;

/// Errors from the chat session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("message cannot be empty")]
    EmptyInput,
    #[error("a turn is already in flight")]
    Busy,
    #[error("reply error: {0}")]
    Reply(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("voice error: {0}")]
    Voice(#[from] VoiceError),
}

impl From<HuddleError> for SessionError {
    fn from(err: HuddleError) -> Self {
        match err {
            HuddleError::Reply(message) => SessionError::Reply(message),
            other => SessionError::Storage(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_display() {
        assert_eq!(
            SessionError::EmptyInput.to_string(),
            "message cannot be empty"
        );
        assert_eq!(
            SessionError::Busy.to_string(),
            "a turn is already in flight"
        );
        assert_eq!(
            SessionError::Reply("timed out".to_string()).to_string(),
            "reply error: timed out"
        );
    }

    #[test]
    fn test_from_core_reply_error() {
        let err: SessionError = HuddleError::Reply("upstream 502".to_string()).into();
        assert!(matches!(err, SessionError::Reply(_)));
        assert!(err.to_string().contains("upstream 502"));
    }

    #[test]
    fn test_from_core_storage_error() {
        let err: SessionError = HuddleError::Storage("disk full".to_string()).into();
        assert!(matches!(err, SessionError::Storage(_)));
    }

    #[test]
    fn test_from_core_empty_history() {
        let err: SessionError = HuddleError::EmptyHistory.into();
        assert!(matches!(err, SessionError::Storage(_)));
        assert!(err.to_string().contains("empty history"));
    }

    #[test]
    fn test_from_voice_error() {
        let err: SessionError = VoiceError::Unsupported.into();
        assert!(matches!(err, SessionError::Voice(VoiceError::Unsupported)));
    }
}
