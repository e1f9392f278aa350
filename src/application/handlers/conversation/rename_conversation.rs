//! RenameConversationHandler - Command handler for renaming conversations.

use std::sync::Arc;

use crate::domain::conversation::Conversation;
use crate::domain::foundation::{ConversationId, DomainError, UserId};
use crate::ports::ConversationStore;

/// Command to rename a conversation.
#[derive(Debug, Clone)]
pub struct RenameConversationCommand {
    pub user_id: UserId,
    pub conversation_id: ConversationId,
    pub new_title: String,
}

/// Handler for renaming conversations.
pub struct RenameConversationHandler {
    store: Arc<dyn ConversationStore>,
}

impl RenameConversationHandler {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, cmd: RenameConversationCommand) -> Result<Conversation, DomainError> {
        self.store
            .rename(&cmd.user_id, &cmd.conversation_id, &cmd.new_title)
            .await
    }
}
