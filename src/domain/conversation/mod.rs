//! Conversation domain module.
//!
//! Conversations, their turns, and the pure projection of a transcript
//! into model input.

mod aggregate;
mod message;
mod persona;
mod projection;

pub use aggregate::{
    sort_by_recent_activity, validate_title, Conversation, ConversationSummary, MAX_TITLE_LENGTH,
};
pub use message::{validate_message_text, Message, Role, MAX_MESSAGE_LENGTH};
pub use persona::{DEFAULT_SYSTEM_PROMPT, FALLBACK_REPLY};
pub use projection::{project_history, PromptMessage};
