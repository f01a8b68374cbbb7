pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::HuddleConfig;
pub use error::{HuddleError, Result};
pub use events::SessionEvent;
pub use types::{Conversation, Message, Sender, Timestamp};
