//! The abstract speech-recognition capability.
//!
//! Availability is environment-dependent: a desktop build may bridge to a
//! platform recognizer, a headless build has none. Callers must probe
//! `is_supported` before starting; the adapter turns an unsupported start
//! into a hard error rather than a silent no-op.

use crate::error::VoiceError;

/// A host-provided speech recognizer.
///
/// Implementations run one non-continuous listening session at a time and
/// report progress by calling the adapter's `notify_*` event surface from
/// whatever thread the platform delivers events on.
pub trait SpeechCapability: Send + Sync {
    /// True only if the host environment can recognize speech.
    fn is_supported(&self) -> bool;

    /// Begin a single listening session.
    fn start(&self) -> Result<(), VoiceError>;

    /// End the current listening session if one is active.
    fn stop(&self);
}

/// Capability for hosts without any recognizer.
///
/// `is_supported` is always false and `start` always fails, so the adapter
/// reports the feature as unavailable instead of pretending to listen.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullCapability;

impl SpeechCapability for NullCapability {
    fn is_supported(&self) -> bool {
        false
    }

    fn start(&self) -> Result<(), VoiceError> {
        Err(VoiceError::Unsupported)
    }

    fn stop(&self) {}
}
