use thiserror::Error;

/// Top-level error type for the huddle engine.
///
/// Each variant wraps a subsystem-specific failure. Subsystem crates define
/// their own error types and implement `From<SubsystemError> for HuddleError`
/// so that the `?` operator works seamlessly across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HuddleError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Voice error: {0}")]
    Voice(String),

    #[error("Reply error: {0}")]
    Reply(String),

    #[error("cannot overwrite the last message of an empty history")]
    EmptyHistory,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for HuddleError {
    fn from(err: toml::de::Error) -> Self {
        HuddleError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for HuddleError {
    fn from(err: toml::ser::Error) -> Self {
        HuddleError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for HuddleError {
    fn from(err: serde_json::Error) -> Self {
        HuddleError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for huddle operations.
pub type Result<T> = std::result::Result<T, HuddleError>;
