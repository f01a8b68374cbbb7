//! Voice session state machine with thread-safe transitions.
//!
//! Valid transitions:
//! - Idle -> Listening (session started)
//! - Listening -> Idle (session ended normally)
//! - Listening -> Error (recognition failed mid-session)
//! - Error -> Listening (user retries)
//! - Error -> Idle (session wound down after a failure)

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::error::VoiceError;

/// Operational state of voice input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum VoiceState {
    /// No listening session in progress.
    #[default]
    Idle,
    /// Actively capturing a single utterance.
    Listening,
    /// The last session failed; a new one may still be started.
    Error,
}

impl fmt::Display for VoiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceState::Idle => write!(f, "Idle"),
            VoiceState::Listening => write!(f, "Listening"),
            VoiceState::Error => write!(f, "Error"),
        }
    }
}

impl VoiceState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &VoiceState) -> bool {
        matches!(
            (self, target),
            (VoiceState::Idle, VoiceState::Listening)
                | (VoiceState::Listening, VoiceState::Idle)
                | (VoiceState::Listening, VoiceState::Error)
                | (VoiceState::Error, VoiceState::Listening)
                | (VoiceState::Error, VoiceState::Idle)
        )
    }
}

/// Thread-safe state machine for voice state transitions.
///
/// All transitions are validated before being applied.
#[derive(Debug, Clone, Default)]
pub struct StateMachine {
    state: Arc<Mutex<VoiceState>>,
}

impl StateMachine {
    /// Create a new state machine initialized to `Idle`.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(VoiceState::Idle)),
        }
    }

    /// Returns the current state.
    pub fn current(&self) -> VoiceState {
        *self.state.lock().expect("state mutex poisoned")
    }

    /// Attempt to transition to the target state.
    pub fn transition(&self, target: VoiceState) -> Result<(), VoiceError> {
        let mut state = self.state.lock().expect("state mutex poisoned");
        if state.can_transition_to(&target) {
            tracing::debug!("Voice state: {} -> {}", *state, target);
            *state = target;
            Ok(())
        } else {
            Err(VoiceError::State(format!("{} -> {}", *state, target)))
        }
    }

    /// Force the state machine back to Idle (teardown path).
    pub fn reset(&self) {
        let mut state = self.state.lock().expect("state mutex poisoned");
        *state = VoiceState::Idle;
    }
}

// =============================================================================
// Tests
// =============================================================================
