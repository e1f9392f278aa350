//! DeleteConversationHandler - Command handler for removing conversations.

use std::sync::Arc;

use crate::domain::foundation::{ConversationId, DomainError, UserId};
use crate::ports::ConversationStore;

/// Command to delete a conversation and all of its turns.
#[derive(Debug, Clone)]
pub struct DeleteConversationCommand {
    pub user_id: UserId,
    pub conversation_id: ConversationId,
}

/// Handler for deleting conversations.
pub struct DeleteConversationHandler {
    store: Arc<dyn ConversationStore>,
}

impl DeleteConversationHandler {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, cmd: DeleteConversationCommand) -> Result<(), DomainError> {
        self.store
            .delete(&cmd.user_id, &cmd.conversation_id)
            .await?;

        tracing::info!(
            conversation_id = %cmd.conversation_id,
            user_id = %cmd.user_id,
            "Conversation deleted"
        );
        Ok(())
    }
}
