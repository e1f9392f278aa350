//! Projection of a stored transcript into model input.
//!
//! The model only sees role/content pairs. Timestamps and any other
//! stored metadata are stripped on every invocation.

use serde::{Deserialize, Serialize};

use super::message::{Message, Role};

/// One role/content pair handed to the model capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

impl From<&Message> for PromptMessage {
    fn from(msg: &Message) -> Self {
        Self::new(msg.role(), msg.content())
    }
}

/// Projects turns, in order, into the pairs expected by the model.
pub fn project_history(messages: &[Message]) -> Vec<PromptMessage> {
    messages.iter().map(PromptMessage::from).collect()
}
