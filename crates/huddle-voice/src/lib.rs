//! Voice input for the assistant panel.
//!
//! Wraps an external, possibly-absent speech-recognition capability into a
//! small start/stop/result/error event surface. The adapter runs one
//! non-continuous, final-results-only listening session at a time and
//! delivers the trimmed transcript at most once per session.

pub mod adapter;
pub mod capability;
pub mod error;
pub mod state;

pub use adapter::{UtteranceHandlers, VoiceInput};
pub use capability::{NullCapability, SpeechCapability};
pub use error::VoiceError;
pub use state::{StateMachine, VoiceState};
