//! GetConversationHandler - Query handler for retrieving a full conversation.

use std::sync::Arc;

use crate::domain::conversation::Conversation;
use crate::domain::foundation::{ConversationId, DomainError, UserId};
use crate::ports::ConversationStore;

/// Query to get a conversation.
#[derive(Debug, Clone)]
pub struct GetConversationQuery {
    pub user_id: UserId,
    pub conversation_id: ConversationId,
}

/// Handler for getting conversations.
pub struct GetConversationHandler {
    store: Arc<dyn ConversationStore>,
}

impl GetConversationHandler {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, query: GetConversationQuery) -> Result<Conversation, DomainError> {
        self.store.get(&query.user_id, &query.conversation_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::conversation_store::InMemoryConversationStore;

    #[tokio::test]
    async fn owner_gets_conversation_and_others_get_not_found() {
        let store = InMemoryConversationStore::new();
        let alice = UserId::new("alice").unwrap();
        let created = store.create(&alice, "Mine").await.unwrap();
        let handler = GetConversationHandler::new(Arc::new(store));

        let found = handler
            .handle(GetConversationQuery {
                user_id: alice,
                conversation_id: created.id(),
            })
            .await
            .unwrap();
        assert_eq!(found.title(), "Mine");

        let err = handler
            .handle(GetConversationQuery {
                user_id: UserId::new("mallory").unwrap(),
                conversation_id: created.id(),
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
