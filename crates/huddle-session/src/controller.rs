//! The chat session controller.
//!
//! A small phase machine drives each turn: `Idle` until the user sends,
//! `AwaitingReply` while the remote call is in flight, `Revealing` while
//! the reply is paced onto the screen. User interruptions (stop, clear,
//! exit) advance a turn epoch; anything still in flight for an older epoch
//! is discarded instead of mutating state the user has already abandoned.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use huddle_core::events::SessionEvent;
use huddle_core::types::{Conversation, Message};
use huddle_reveal::{DoneFn, RevealHandle, Revealer, TickFn};
use huddle_store::ConversationRepository;
use huddle_voice::{UtteranceHandlers, VoiceError, VoiceInput};

use crate::error::SessionError;
use crate::reply::ReplyService;

/// The fixed assistant text substituted when the reply call fails.
pub const FALLBACK_REPLY: &str = "Sorry, something went wrong.";

/// Capacity of the UI event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Outcome of the two-state confirm/cancel prompt guarding destructive
/// operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Cancelled,
}

/// Where the session is in the send/receive lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// Ready for the next send.
    Idle,
    /// The remote reply call is in flight.
    AwaitingReply,
    /// The reply is being paced onto the screen.
    Revealing,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "Idle"),
            SessionPhase::AwaitingReply => write!(f, "AwaitingReply"),
            SessionPhase::Revealing => write!(f, "Revealing"),
        }
    }
}

/// The reveal currently in flight, if any. At most one per session.
struct ActiveReveal {
    handle: RevealHandle,
    message_id: Uuid,
}

/// The orchestrating controller for one conversation.
///
/// The controller is the only writer of the conversation history; the UI
/// reads snapshots and listens on the event channel.
pub struct ChatSession {
    store: Arc<ConversationRepository>,
    replies: Arc<dyn ReplyService>,
    revealer: Revealer,
    phase: Arc<Mutex<SessionPhase>>,
    active_reveal: Arc<Mutex<Option<ActiveReveal>>>,
    turn_epoch: Arc<AtomicU64>,
    draft: Arc<Mutex<String>>,
    events: broadcast::Sender<SessionEvent>,
}

impl ChatSession {
    pub fn new(
        store: Arc<ConversationRepository>,
        replies: Arc<dyn ReplyService>,
        reveal_delay: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            replies,
            revealer: Revealer::new(reveal_delay),
            phase: Arc::new(Mutex::new(SessionPhase::Idle)),
            active_reveal: Arc::new(Mutex::new(None)),
            turn_epoch: Arc::new(AtomicU64::new(0)),
            draft: Arc::new(Mutex::new(String::new())),
            events,
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn phase(&self) -> SessionPhase {
        *self.lock_phase()
    }

    /// True while a turn is in flight; the submit surface should be
    /// disabled, though typing (and dictating) into the draft stays open.
    pub fn is_busy(&self) -> bool {
        self.phase() != SessionPhase::Idle
    }

    /// Current history snapshot, for rendering.
    pub fn history(&self) -> Conversation {
        self.store.snapshot()
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    // -------------------------------------------------------------------------
    // Draft input
    // -------------------------------------------------------------------------

    pub fn draft(&self) -> String {
        self.lock_draft().clone()
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        *self.lock_draft() = text.into();
    }

    pub fn clear_draft(&self) {
        self.lock_draft().clear();
    }

    /// Take the draft for submission, leaving it empty.
    pub fn take_draft(&self) -> String {
        std::mem::take(&mut *self.lock_draft())
    }

    // -------------------------------------------------------------------------
    // The send/receive lifecycle
    // -------------------------------------------------------------------------

    /// Submit one user message and drive the turn to its reveal.
    ///
    /// Empty (after trimming) input is rejected locally with no state
    /// change and no network call. A send while a turn is in flight is
    /// rejected with `Busy`. The user message is appended optimistically
    /// before the remote call; a failed call recovers into the fixed
    /// fallback assistant message rather than an error.
    pub async fn send(&self, input: &str) -> Result<(), SessionError> {
        let text = input.trim().to_string();
        if text.is_empty() {
            return Err(SessionError::EmptyInput);
        }

        {
            let mut phase = self.lock_phase();
            if *phase != SessionPhase::Idle {
                return Err(SessionError::Busy);
            }
            *phase = SessionPhase::AwaitingReply;
        }
        let epoch = self.turn_epoch.load(Ordering::SeqCst);

        let user = Message::user(text.clone());
        if let Err(e) = self.store.append(user.clone()) {
            self.set_phase(SessionPhase::Idle);
            return Err(e.into());
        }
        self.emit(SessionEvent::MessageAppended {
            message_id: user.id,
            sender: user.sender,
            timestamp: user.timestamp,
        });
        debug!(chars = text.len(), "Message dispatched");

        match self.replies.reply(&text).await {
            Ok(reply) => {
                if self.turn_abandoned(epoch) {
                    debug!("Reply arrived after the turn was abandoned; discarding");
                    return Ok(());
                }
                self.begin_reveal(&reply)
            }
            Err(e) => {
                if self.turn_abandoned(epoch) {
                    debug!("Reply failure arrived after the turn was abandoned; discarding");
                    return Ok(());
                }
                warn!(error = %e, "Reply request failed, substituting fallback");
                let fallback = Message::assistant(FALLBACK_REPLY);
                let appended = self.store.append(fallback.clone());
                self.set_phase(SessionPhase::Idle);
                self.emit(SessionEvent::ReplyFailed {
                    reason: e.to_string(),
                });
                match appended {
                    Ok(_) => {
                        self.emit(SessionEvent::MessageAppended {
                            message_id: fallback.id,
                            sender: fallback.sender,
                            timestamp: fallback.timestamp,
                        });
                        Ok(())
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    /// Append the assistant placeholder and start pacing the reply into it.
    fn begin_reveal(&self, reply: &str) -> Result<(), SessionError> {
        let placeholder = Message::assistant("");
        if let Err(e) = self.store.append(placeholder.clone()) {
            self.set_phase(SessionPhase::Idle);
            return Err(e.into());
        }
        self.emit(SessionEvent::MessageAppended {
            message_id: placeholder.id,
            sender: placeholder.sender,
            timestamp: placeholder.timestamp,
        });
        self.set_phase(SessionPhase::Revealing);
        self.emit(SessionEvent::RevealStarted {
            message_id: placeholder.id,
        });

        let on_tick: TickFn = {
            let store = Arc::clone(&self.store);
            let events = self.events.clone();
            let template = placeholder.clone();
            Box::new(move |prefix: &str| {
                // A failed persist is not fatal: the next tick rewrites the
                // whole prefix, which heals the durable snapshot.
                match store.replace_last(template.with_text(prefix)) {
                    Ok(_) => {
                        let _ = events.send(SessionEvent::RevealTick {
                            message_id: template.id,
                            revealed_chars: prefix.chars().count(),
                        });
                    }
                    Err(e) => warn!(error = %e, "Reveal tick failed to persist"),
                }
            })
        };

        let on_done: DoneFn = {
            let phase = Arc::clone(&self.phase);
            let active_reveal = Arc::clone(&self.active_reveal);
            let events = self.events.clone();
            let message_id = placeholder.id;
            Box::new(move || {
                *phase.lock().expect("phase mutex poisoned") = SessionPhase::Idle;
                active_reveal
                    .lock()
                    .expect("reveal slot mutex poisoned")
                    .take();
                let _ = events.send(SessionEvent::RevealCompleted { message_id });
            })
        };

        let handle = self.revealer.start(reply, on_tick, on_done);
        if handle.is_running() {
            *self.lock_reveal() = Some(ActiveReveal {
                handle,
                message_id: placeholder.id,
            });
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Interruptions
    // -------------------------------------------------------------------------

    /// Stop the reveal in flight; the assistant message stays exactly as
    /// far as it had been revealed and is treated as final.
    pub fn stop_generating(&self) {
        self.turn_epoch.fetch_add(1, Ordering::SeqCst);
        let active = self.lock_reveal().take();
        if let Some(active) = active {
            active.handle.cancel();
            self.emit(SessionEvent::RevealCancelled {
                message_id: active.message_id,
            });
            info!("Generation stopped; reply kept as revealed");
        }
        self.set_phase(SessionPhase::Idle);
    }

    /// Clear the whole history, in memory and on disk.
    ///
    /// Destructive and irreversible, so the caller must pass the outcome
    /// of a confirm/cancel prompt; `Cancelled` is a no-op. Returns whether
    /// the clear actually ran.
    pub fn clear(&self, confirmation: Confirmation) -> Result<bool, SessionError> {
        if confirmation != Confirmation::Confirmed {
            debug!("Clear dismissed");
            return Ok(false);
        }
        self.abandon_turn();
        self.store.clear()?;
        self.emit(SessionEvent::HistoryCleared);
        info!("Conversation history cleared");
        Ok(true)
    }

    /// Leave the assistant panel, handing control back to the enclosing
    /// navigation context. Guarded like `clear`; returns whether the exit
    /// was confirmed.
    pub fn exit(&self, confirmation: Confirmation) -> bool {
        if confirmation != Confirmation::Confirmed {
            debug!("Exit dismissed");
            return false;
        }
        self.abandon_turn();
        self.emit(SessionEvent::Exited);
        info!("Assistant session exited");
        true
    }

    /// Abandon whatever the current turn is doing: pending replies are
    /// discarded on arrival, pending ticks never fire.
    fn abandon_turn(&self) {
        self.turn_epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(active) = self.lock_reveal().take() {
            active.handle.cancel();
        }
        self.set_phase(SessionPhase::Idle);
    }

    // -------------------------------------------------------------------------
    // Voice input
    // -------------------------------------------------------------------------

    /// Toggle dictation: stop it when listening, otherwise clear the draft
    /// and start a fresh utterance whose transcript lands in the draft.
    /// Dictation never auto-submits.
    pub fn toggle_voice(&self, voice: &VoiceInput) -> Result<(), SessionError> {
        if voice.is_listening() {
            voice.stop();
            return Ok(());
        }

        self.clear_draft();
        let handlers = UtteranceHandlers {
            on_final_transcript: {
                let draft = Arc::clone(&self.draft);
                Arc::new(move |transcript| {
                    *draft.lock().expect("draft mutex poisoned") = transcript;
                })
            },
            ..Default::default()
        };

        match voice.start(handlers) {
            Ok(()) => Ok(()),
            Err(VoiceError::Unsupported) => {
                self.emit(SessionEvent::VoiceUnsupported);
                Err(SessionError::Voice(VoiceError::Unsupported))
            }
            Err(e) => Err(e.into()),
        }
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn turn_abandoned(&self, epoch: u64) -> bool {
        self.turn_epoch.load(Ordering::SeqCst) != epoch
    }

    fn emit(&self, event: SessionEvent) {
        // Send only fails when nobody is subscribed, which is fine.
        let _ = self.events.send(event);
    }

    fn set_phase(&self, phase: SessionPhase) {
        *self.lock_phase() = phase;
    }

    fn lock_phase(&self) -> std::sync::MutexGuard<'_, SessionPhase> {
        self.phase.lock().expect("phase mutex poisoned")
    }

    fn lock_reveal(&self) -> std::sync::MutexGuard<'_, Option<ActiveReveal>> {
        self.active_reveal.lock().expect("reveal slot mutex poisoned")
    }

    fn lock_draft(&self) -> std::sync::MutexGuard<'_, String> {
        self.draft.lock().expect("draft mutex poisoned")
    }
}

impl fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatSession")
            .field("phase", &self.phase())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
