//! Client-side view of one conversation.
//!
//! Committed turns and the in-progress reply are kept apart: the streaming
//! buffer exists only while a send is open and is folded into the committed
//! turns when the stream closes cleanly. A failed stream drops the buffer
//! and leaves the committed turns as they were.

use crate::adapters::http::conversation::{ConversationDocument, MessageView};
use crate::domain::conversation::Role;
use crate::domain::foundation::Timestamp;

use super::error::ClientError;

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<MessageView>,
    streaming: Option<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from the server's copy of the conversation.
    pub fn from_document(document: &ConversationDocument) -> Self {
        Self {
            messages: document.messages.clone(),
            streaming: None,
        }
    }

    pub fn messages(&self) -> &[MessageView] {
        &self.messages
    }

    /// The partial reply, while a send is open.
    pub fn streaming_text(&self) -> Option<&str> {
        self.streaming.as_deref()
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.is_some()
    }

    /// Opens a send: records the user turn and an empty streaming buffer.
    ///
    /// Returns the trimmed text to submit.
    pub fn begin_send(&mut self, text: &str) -> Result<String, ClientError> {
        if self.is_streaming() {
            return Err(ClientError::SendInProgress);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::EmptyMessage);
        }

        self.messages.push(MessageView {
            role: Role::User,
            content: text.to_string(),
            timestamp: Timestamp::now(),
        });
        self.streaming = Some(String::new());
        Ok(text.to_string())
    }

    /// Appends decoded text to the streaming buffer and returns the buffer.
    pub fn apply_chunk(&mut self, text: &str) -> &str {
        let buffer = self.streaming.get_or_insert_with(String::new);
        buffer.push_str(text);
        buffer.as_str()
    }

    /// Closes the send, committing the buffer as the assistant turn.
    pub fn finish(&mut self) -> Option<&MessageView> {
        let content = self.streaming.take()?;
        self.messages.push(MessageView {
            role: Role::Assistant,
            content,
            timestamp: Timestamp::now(),
        });
        self.messages.last()
    }

    /// Abandons a send whose stream broke; the partial reply is discarded.
    pub fn fail(&mut self) {
        self.streaming = None;
    }

    /// Abandons a send the server refused before streaming; the optimistic
    /// user turn is removed as well.
    pub fn reject(&mut self) {
        if self.streaming.take().is_some()
            && self.messages.last().map(|m| m.role) == Some(Role::User)
        {
            self.messages.pop();
        }
    }
}
