//! The conversational session controller.
//!
//! Orchestrates the send/receive lifecycle of the assistant panel: submits
//! user input to the remote reply service, paces the reply through the
//! reveal scheduler, applies voice transcripts to the draft input, and
//! exposes stop/clear/exit without ever corrupting displayed or persisted
//! state.

pub mod controller;
pub mod error;
pub mod reply;

pub use controller::{ChatSession, Confirmation, SessionPhase, FALLBACK_REPLY};
pub use error::SessionError;
pub use reply::{HttpReplyService, ReplyService, MISSING_REPLY};
