//! In-memory conversation store.
//!
//! Used for development without a database and as a test fixture. Every
//! write happens under one lock, so an append is never partially visible.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::conversation::{
    sort_by_recent_activity, validate_title, Conversation, ConversationSummary, Message,
};
use crate::domain::foundation::{ConversationId, DomainError, Timestamp, UserId};
use crate::ports::ConversationStore;

#[derive(Debug, Clone, Default)]
pub struct InMemoryConversationStore {
    conversations: Arc<RwLock<HashMap<ConversationId, Conversation>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a conversation as-is, bypassing validation.
    pub async fn insert(&self, conversation: Conversation) {
        self.conversations
            .write()
            .await
            .insert(conversation.id(), conversation);
    }

    /// Number of stored conversations across all users.
    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn list_summaries(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ConversationSummary>, DomainError> {
        let conversations = self.conversations.read().await;
        let mut summaries: Vec<_> = conversations
            .values()
            .filter(|c| c.is_owned_by(user_id))
            .map(Conversation::summary)
            .collect();
        sort_by_recent_activity(&mut summaries);
        Ok(summaries)
    }

    async fn get(&self, user_id: &UserId, id: &ConversationId) -> Result<Conversation, DomainError> {
        self.conversations
            .read()
            .await
            .get(id)
            .filter(|c| c.is_owned_by(user_id))
            .cloned()
            .ok_or_else(DomainError::conversation_not_found)
    }

    async fn create(&self, user_id: &UserId, title: &str) -> Result<Conversation, DomainError> {
        let conversation = Conversation::new(user_id.clone(), title)?;
        self.insert(conversation.clone()).await;
        Ok(conversation)
    }

    async fn append_and_persist(
        &self,
        user_id: &UserId,
        id: &ConversationId,
        messages: &[Message],
        last_message_at: Timestamp,
    ) -> Result<(), DomainError> {
        let mut conversations = self.conversations.write().await;
        let conversation = conversations
            .get_mut(id)
            .filter(|c| c.is_owned_by(user_id))
            .ok_or_else(DomainError::conversation_not_found)?;
        conversation.append(messages, last_message_at);
        Ok(())
    }

    async fn rename(
        &self,
        user_id: &UserId,
        id: &ConversationId,
        title: &str,
    ) -> Result<Conversation, DomainError> {
        let title = validate_title(title)?;
        let mut conversations = self.conversations.write().await;
        let conversation = conversations
            .get_mut(id)
            .filter(|c| c.is_owned_by(user_id))
            .ok_or_else(DomainError::conversation_not_found)?;
        conversation.rename(&title)?;
        Ok(conversation.clone())
    }

    async fn delete(&self, user_id: &UserId, id: &ConversationId) -> Result<(), DomainError> {
        let mut conversations = self.conversations.write().await;
        match conversations.get(id) {
            Some(c) if c.is_owned_by(user_id) => {
                conversations.remove(id);
                Ok(())
            }
            _ => Err(DomainError::conversation_not_found()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::Role;
    use crate::domain::foundation::ErrorCode;

    fn alice() -> UserId {
        UserId::new("alice").unwrap()
    }

    fn bob() -> UserId {
        UserId::new("bob").unwrap()
    }

    // ════════════════════════════════════════════════════════════════
    // create / get
    // ════════════════════════════════════════════════════════════════

    mod create_and_get {
        use super::*;

        #[tokio::test]
        async fn created_conversation_is_readable_by_owner() {
            let store = InMemoryConversationStore::new();
            let created = store.create(&alice(), "New Conversation").await.unwrap();

            let loaded = store.get(&alice(), &created.id()).await.unwrap();

            assert_eq!(loaded, created);
            assert!(loaded.messages().is_empty());
        }

        #[tokio::test]
        async fn blank_title_is_a_validation_error() {
            let store = InMemoryConversationStore::new();
            let err = store.create(&alice(), "   ").await.unwrap_err();
            assert_eq!(err.code, ErrorCode::ValidationFailed);
            assert!(store.is_empty().await);
        }

        #[tokio::test]
        async fn foreign_conversation_looks_missing() {
            let store = InMemoryConversationStore::new();
            let created = store.create(&alice(), "Private").await.unwrap();

            let foreign = store.get(&bob(), &created.id()).await.unwrap_err();
            let missing = store.get(&bob(), &ConversationId::new()).await.unwrap_err();

            assert_eq!(foreign.code, missing.code);
            assert_eq!(foreign.message, missing.message);
        }
    }

    // ════════════════════════════════════════════════════════════════
    // append_and_persist
    // ════════════════════════════════════════════════════════════════

    mod append {
        use super::*;

        #[tokio::test]
        async fn appends_in_order_and_advances_activity() {
            let store = InMemoryConversationStore::new();
            let conv = store.create(&alice(), "Chat").await.unwrap();
            let at = conv.last_message_at().plus_secs(5);
            let turns = vec![
                Message::user("What is CTR?").unwrap(),
                Message::assistant("Click-through rate is..."),
            ];

            store
                .append_and_persist(&alice(), &conv.id(), &turns, at)
                .await
                .unwrap();

            let loaded = store.get(&alice(), &conv.id()).await.unwrap();
            assert_eq!(loaded.messages(), turns.as_slice());
            assert_eq!(loaded.messages()[0].role(), Role::User);
            assert_eq!(loaded.last_message_at(), at);
        }

        #[tokio::test]
        async fn foreign_append_is_rejected_without_change() {
            let store = InMemoryConversationStore::new();
            let conv = store.create(&alice(), "Chat").await.unwrap();

            let err = store
                .append_and_persist(
                    &bob(),
                    &conv.id(),
                    &[Message::user("hijack").unwrap()],
                    Timestamp::now(),
                )
                .await
                .unwrap_err();

            assert!(err.is_not_found());
            assert!(store.get(&alice(), &conv.id()).await.unwrap().messages().is_empty());
        }
    }

    // ════════════════════════════════════════════════════════════════
    // list / rename / delete
    // ════════════════════════════════════════════════════════════════

    mod listing {
        use super::*;

        #[tokio::test]
        async fn lists_only_own_conversations_by_recent_activity() {
            let store = InMemoryConversationStore::new();
            let a = store.create(&alice(), "A").await.unwrap();
            let b = store.create(&alice(), "B").await.unwrap();
            store.create(&bob(), "Bob's").await.unwrap();

            store
                .append_and_persist(
                    &alice(),
                    &a.id(),
                    &[Message::user("hi").unwrap()],
                    b.last_message_at().plus_secs(1),
                )
                .await
                .unwrap();

            let ids: Vec<_> = store
                .list_summaries(&alice())
                .await
                .unwrap()
                .into_iter()
                .map(|s| s.id)
                .collect();
            assert_eq!(ids, vec![a.id(), b.id()]);
        }
    }

    mod rename_and_delete {
        use super::*;

        #[tokio::test]
        async fn rename_updates_title() {
            let store = InMemoryConversationStore::new();
            let conv = store.create(&alice(), "Old").await.unwrap();

            let renamed = store.rename(&alice(), &conv.id(), "  New  ").await.unwrap();

            assert_eq!(renamed.title(), "New");
            assert_eq!(store.get(&alice(), &conv.id()).await.unwrap().title(), "New");
        }

        #[tokio::test]
        async fn rename_of_foreign_conversation_is_not_found() {
            let store = InMemoryConversationStore::new();
            let conv = store.create(&alice(), "Old").await.unwrap();
            assert!(store
                .rename(&bob(), &conv.id(), "Mine now")
                .await
                .unwrap_err()
                .is_not_found());
        }

        #[tokio::test]
        async fn delete_removes_conversation_once() {
            let store = InMemoryConversationStore::new();
            let conv = store.create(&alice(), "Doomed").await.unwrap();

            store.delete(&alice(), &conv.id()).await.unwrap();
            let again = store.delete(&alice(), &conv.id()).await.unwrap_err();

            assert!(again.is_not_found());
            assert!(store.is_empty().await);
        }

        #[tokio::test]
        async fn delete_by_other_user_leaves_conversation() {
            let store = InMemoryConversationStore::new();
            let conv = store.create(&alice(), "Keep").await.unwrap();

            assert!(store.delete(&bob(), &conv.id()).await.unwrap_err().is_not_found());
            assert_eq!(store.len().await, 1);
        }
    }
}
