//! CreateConversationHandler - Command handler for starting conversations.

use std::sync::Arc;

use crate::domain::conversation::Conversation;
use crate::domain::foundation::{DomainError, UserId};
use crate::ports::ConversationStore;

/// Command to create an empty conversation.
#[derive(Debug, Clone)]
pub struct CreateConversationCommand {
    pub user_id: UserId,
    pub title: String,
}

/// Handler for creating conversations.
pub struct CreateConversationHandler {
    store: Arc<dyn ConversationStore>,
}

impl CreateConversationHandler {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, cmd: CreateConversationCommand) -> Result<Conversation, DomainError> {
        let conversation = self.store.create(&cmd.user_id, &cmd.title).await?;

        tracing::info!(
            conversation_id = %conversation.id(),
            user_id = %cmd.user_id,
            "Conversation created"
        );

        Ok(conversation)
    }
}
