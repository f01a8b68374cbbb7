//! Error types for voice input.

use huddle_core::error::HuddleError;

/// Errors from the voice input adapter.
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error("speech recognition is not supported in this environment")]
    Unsupported,
    #[error("recognition failed: {0}")]
    Recognition(String),
    #[error("invalid voice state transition: {0}")]
    State(String),
}

impl From<VoiceError> for HuddleError {
    fn from(err: VoiceError) -> Self {
        HuddleError::Voice(err.to_string())
    }
}
