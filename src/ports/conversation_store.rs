//! Conversation store port.
//!
//! Durable record of conversations and their ordered turns, keyed by the
//! owning user.
//!
//! # Ownership contract
//!
//! Every operation takes the caller's `UserId`. A conversation owned by
//! someone else is reported exactly like a missing one:
//! `ErrorCode::ConversationNotFound`.

use async_trait::async_trait;

use crate::domain::conversation::{Conversation, ConversationSummary, Message};
use crate::domain::foundation::{ConversationId, DomainError, Timestamp, UserId};

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Summaries of the caller's conversations, most recent activity first.
    async fn list_summaries(&self, user_id: &UserId)
        -> Result<Vec<ConversationSummary>, DomainError>;

    /// Full conversation including messages.
    ///
    /// # Errors
    ///
    /// - `ConversationNotFound` if absent or not owned by `user_id`
    /// - `DatabaseError` on storage failure
    async fn get(&self, user_id: &UserId, id: &ConversationId)
        -> Result<Conversation, DomainError>;

    /// Creates an empty conversation with `lastMessageAt` set to now.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the title is blank or too long
    /// - `DatabaseError` on storage failure
    async fn create(&self, user_id: &UserId, title: &str) -> Result<Conversation, DomainError>;

    /// Appends turns in order and advances `lastMessageAt`, atomically.
    ///
    /// This is the only write path for messages. Readers never observe a
    /// partial append.
    ///
    /// # Errors
    ///
    /// - `ConversationNotFound` if absent or not owned by `user_id`
    /// - `DatabaseError` on storage failure
    async fn append_and_persist(
        &self,
        user_id: &UserId,
        id: &ConversationId,
        messages: &[Message],
        last_message_at: Timestamp,
    ) -> Result<(), DomainError>;

    /// Replaces the title and returns the updated conversation.
    ///
    /// `title` must already be validated.
    async fn rename(
        &self,
        user_id: &UserId,
        id: &ConversationId,
        title: &str,
    ) -> Result<Conversation, DomainError>;

    /// Removes the conversation and all of its turns in one operation.
    async fn delete(&self, user_id: &UserId, id: &ConversationId) -> Result<(), DomainError>;
}
