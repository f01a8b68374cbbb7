//! Conversation persistence for huddle.
//!
//! Provides a WAL-mode SQLite database with migrations and a
//! `ConversationRepository` that keeps an in-memory history snapshot in
//! lockstep with the durable one.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use repository::ConversationRepository;
