//! Word-by-word reveal of a complete reply string.
//!
//! A reply arrives from the remote service in one piece; this crate paces
//! its display so the user perceives gradual generation. The scheduler is a
//! pure pacing primitive: it knows nothing about conversations, history, or
//! how many jobs a caller allows at once.

pub mod reveal;

pub use reveal::{DoneFn, RevealHandle, RevealState, Revealer, TickFn};
