//! The voice input adapter.
//!
//! Bridges a [`SpeechCapability`] to the session controller: one listening
//! session at a time, `on_start`/`on_end` bracketing each session exactly
//! once, and at most one final transcript per session built from the
//! final-marked result segments, trimmed of surrounding whitespace.

use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::capability::SpeechCapability;
use crate::error::VoiceError;
use crate::state::{StateMachine, VoiceState};

/// Hook invoked when a session begins or ends.
pub type SessionHook = Arc<dyn Fn() + Send + Sync>;
/// Hook invoked with the trimmed final transcript.
pub type TranscriptHook = Arc<dyn Fn(String) + Send + Sync>;
/// Hook invoked with a recognition failure message.
pub type FailureHook = Arc<dyn Fn(String) + Send + Sync>;

/// Callbacks for one listening session.
pub struct UtteranceHandlers {
    pub on_start: SessionHook,
    pub on_end: SessionHook,
    pub on_final_transcript: TranscriptHook,
    pub on_error: FailureHook,
}

impl Default for UtteranceHandlers {
    fn default() -> Self {
        Self {
            on_start: Arc::new(|| {}),
            on_end: Arc::new(|| {}),
            on_final_transcript: Arc::new(|_| {}),
            on_error: Arc::new(|_| {}),
        }
    }
}

impl std::fmt::Debug for UtteranceHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UtteranceHandlers").finish()
    }
}

/// Bookkeeping for the session currently being captured.
struct Utterance {
    handlers: UtteranceHandlers,
    finals: String,
    started: bool,
}

/// The voice input adapter.
///
/// The host recognizer reports into the `notify_*` methods; the controller
/// drives `start`/`stop`. Both sides may run on different threads.
pub struct VoiceInput {
    capability: Arc<dyn SpeechCapability>,
    state: StateMachine,
    utterance: Mutex<Option<Utterance>>,
}

impl VoiceInput {
    pub fn new(capability: Arc<dyn SpeechCapability>) -> Self {
        Self {
            capability,
            state: StateMachine::new(),
            utterance: Mutex::new(None),
        }
    }

    /// Whether the host environment can recognize speech at all.
    pub fn is_supported(&self) -> bool {
        self.capability.is_supported()
    }

    pub fn state(&self) -> VoiceState {
        self.state.current()
    }

    pub fn is_listening(&self) -> bool {
        self.state.current() == VoiceState::Listening
    }

    /// Begin a single listening session.
    ///
    /// Fails with [`VoiceError::Unsupported`] when the capability is
    /// absent; the caller must surface that to the user. Starting while
    /// already listening keeps the session in flight and is a no-op.
    pub fn start(&self, handlers: UtteranceHandlers) -> Result<(), VoiceError> {
        if !self.capability.is_supported() {
            return Err(VoiceError::Unsupported);
        }
        if self.is_listening() {
            debug!("Voice start ignored: already listening");
            return Ok(());
        }

        {
            let mut slot = self.lock_utterance();
            *slot = Some(Utterance {
                handlers,
                finals: String::new(),
                started: false,
            });
        }

        if let Err(e) = self.capability.start() {
            *self.lock_utterance() = None;
            return Err(e);
        }
        Ok(())
    }

    /// End the current listening session; no-op when not listening.
    pub fn stop(&self) {
        if self.is_listening() {
            self.capability.stop();
        }
    }

    /// Tear the adapter down, discarding any session in progress.
    pub fn shutdown(&self) {
        self.capability.stop();
        *self.lock_utterance() = None;
        self.state.reset();
    }

    // -------------------------------------------------------------------------
    // Event surface, driven by the host recognizer
    // -------------------------------------------------------------------------

    /// The recognizer began capturing audio.
    pub fn notify_started(&self) {
        let hook = {
            let mut slot = self.lock_utterance();
            let Some(utt) = slot.as_mut() else {
                warn!("Recognizer start event with no session in flight");
                return;
            };
            utt.started = true;
            Arc::clone(&utt.handlers.on_start)
        };
        if self.state.transition(VoiceState::Listening).is_err() {
            warn!("Spurious recognizer start event ignored");
            return;
        }
        hook();
    }

    /// The recognizer produced a result segment.
    ///
    /// Sessions are final-results-only: interim segments are dropped.
    pub fn notify_result(&self, transcript: &str, is_final: bool) {
        if !is_final {
            return;
        }
        if let Some(utt) = self.lock_utterance().as_mut() {
            utt.finals.push_str(transcript);
        }
    }

    /// The recognizer failed mid-session.
    pub fn notify_error(&self, message: &str) {
        warn!(error = %message, "Speech recognition failed");
        let _ = self.state.transition(VoiceState::Error);
        let hook = {
            let slot = self.lock_utterance();
            slot.as_ref().map(|utt| Arc::clone(&utt.handlers.on_error))
        };
        if let Some(hook) = hook {
            hook(message.to_string());
        }
    }

    /// The recognizer finished, normally or after an error.
    pub fn notify_ended(&self) {
        if self.state.current() == VoiceState::Listening {
            let _ = self.state.transition(VoiceState::Idle);
        }
        let utterance = self.lock_utterance().take();
        let Some(utterance) = utterance else {
            return;
        };
        if !utterance.started {
            // The session never began; nothing to bracket.
            return;
        }
        let transcript = utterance.finals.trim().to_string();
        if !transcript.is_empty() {
            debug!(chars = transcript.len(), "Final transcript captured");
            (utterance.handlers.on_final_transcript)(transcript);
        }
        (utterance.handlers.on_end)();
    }

    fn lock_utterance(&self) -> std::sync::MutexGuard<'_, Option<Utterance>> {
        self.utterance.lock().expect("utterance mutex poisoned")
    }
}

impl std::fmt::Debug for VoiceInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceInput")
            .field("state", &self.state.current())
            .field("supported", &self.is_supported())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
