//! Message entity for conversations.
//!
//! A message is one turn of the transcript: who authored it, what it says
//! and when it was recorded.

use crate::domain::foundation::{Timestamp, ValidationError};
use serde::{Deserialize, Serialize};

/// Maximum accepted length of a user message, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 10_000;

/// Author of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Input typed by the conversation owner.
    User,
    /// Generated reply.
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable turn within a conversation.
///
/// # Invariants
///
/// - user turns always carry non-empty, trimmed content
/// - `timestamp` is set at construction and never changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
    timestamp: Timestamp,
}

impl Message {
    /// Creates a user turn from raw input.
    ///
    /// The text is trimmed before validation and storage.
    ///
    /// # Errors
    ///
    /// - `EmptyField` if the text is empty or only whitespace
    /// - `TooLong` if the trimmed text exceeds [`MAX_MESSAGE_LENGTH`]
    pub fn user(text: &str) -> Result<Self, ValidationError> {
        let content = validate_message_text(text)?;
        Ok(Self {
            role: Role::User,
            content,
            timestamp: Timestamp::now(),
        })
    }

    /// Creates an assistant turn from accumulated fragments.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Timestamp::now(),
        }
    }

    /// Rebuilds a message from storage without validation.
    pub fn reconstitute(role: Role, content: String, timestamp: Timestamp) -> Self {
        Self {
            role,
            content,
            timestamp,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

/// Trims and validates the text of a message about to be sent.
pub fn validate_message_text(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::empty_field("message"));
    }
    let len = trimmed.chars().count();
    if len > MAX_MESSAGE_LENGTH {
        return Err(ValidationError::too_long("message", MAX_MESSAGE_LENGTH, len));
    }
    Ok(trimmed.to_string())
}
