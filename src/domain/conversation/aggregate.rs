//! Conversation aggregate entity.
//!
//! A conversation is owned by exactly one user and holds the ordered
//! transcript of its turns.
//!
//! # Aggregate Boundary
//!
//! Conversation is an aggregate root that owns its messages.
//! - Messages are appended only through the Conversation
//! - Message order is the order of submission and is never rewritten
//! - The owner is fixed at creation

use crate::domain::foundation::{ConversationId, Timestamp, UserId, ValidationError};

use super::message::Message;

/// Maximum accepted length of a conversation title, in characters.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Conversation aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    id: ConversationId,
    user_id: UserId,
    title: String,
    messages: Vec<Message>,
    last_message_at: Timestamp,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Conversation {
    /// Starts an empty conversation for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the title is blank or too long.
    pub fn new(user_id: UserId, title: &str) -> Result<Self, ValidationError> {
        let title = validate_title(title)?;
        let now = Timestamp::now();
        Ok(Self {
            id: ConversationId::new(),
            user_id,
            title,
            messages: Vec::new(),
            last_message_at: now,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuilds a conversation from storage.
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: ConversationId,
        user_id: UserId,
        title: String,
        messages: Vec<Message>,
        last_message_at: Timestamp,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id,
            user_id,
            title,
            messages,
            last_message_at,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> ConversationId {
        self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_message_at(&self) -> Timestamp {
        self.last_message_at
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// True if `user_id` owns this conversation.
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    /// Replaces the title.
    pub fn rename(&mut self, title: &str) -> Result<(), ValidationError> {
        self.title = validate_title(title)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Appends turns in order and advances `last_message_at`.
    ///
    /// `last_message_at` never moves backwards.
    pub fn append(&mut self, messages: &[Message], at: Timestamp) {
        self.messages.extend_from_slice(messages);
        self.last_message_at = self.last_message_at.max(at);
        self.updated_at = Timestamp::now();
    }

    /// Listing view of this conversation.
    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id,
            title: self.title.clone(),
            last_message_at: self.last_message_at,
            created_at: self.created_at,
        }
    }
}

/// Listing view of a conversation, without its messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub title: String,
    pub last_message_at: Timestamp,
    pub created_at: Timestamp,
}

/// Orders summaries newest activity first; ties fall back to creation time.
pub fn sort_by_recent_activity(summaries: &mut [ConversationSummary]) {
    summaries.sort_by(|a, b| {
        b.last_message_at
            .cmp(&a.last_message_at)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

/// Trims and validates a conversation title.
pub fn validate_title(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::empty_field("title"));
    }
    let len = trimmed.chars().count();
    if len > MAX_TITLE_LENGTH {
        return Err(ValidationError::too_long("title", MAX_TITLE_LENGTH, len));
    }
    Ok(trimmed.to_string())
}
