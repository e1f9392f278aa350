//! ListConversationsHandler - Query handler for a caller's conversation list.

use std::sync::Arc;

use crate::domain::conversation::ConversationSummary;
use crate::domain::foundation::{DomainError, UserId};
use crate::ports::ConversationStore;

/// Query for the caller's conversations.
#[derive(Debug, Clone)]
pub struct ListConversationsQuery {
    pub user_id: UserId,
}

/// Handler for listing conversations, most recent activity first.
pub struct ListConversationsHandler {
    store: Arc<dyn ConversationStore>,
}

impl ListConversationsHandler {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        query: ListConversationsQuery,
    ) -> Result<Vec<ConversationSummary>, DomainError> {
        self.store.list_summaries(&query.user_id).await
    }
}
