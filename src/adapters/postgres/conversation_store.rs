//! PostgreSQL implementation of ConversationStore.
//!
//! Conversations live in `conversations`, turns in `conversation_messages`
//! keyed by `(conversation_id, position)`. Appends lock the parent row, so
//! concurrent appends to one conversation queue up instead of interleaving.
//! Reads take the row and its messages from one snapshot.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

use crate::domain::conversation::{
    validate_title, Conversation, ConversationSummary, Message, Role,
};
use crate::domain::foundation::{ConversationId, DomainError, Timestamp, UserId};
use crate::ports::ConversationStore;

#[derive(Clone)]
pub struct PostgresConversationStore {
    pool: PgPool,
}

impl PostgresConversationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn load_messages(
    conn: &mut PgConnection,
    id: &ConversationId,
) -> Result<Vec<Message>, DomainError> {
    let rows = sqlx::query(
        r#"
        SELECT role, content, created_at
        FROM conversation_messages
        WHERE conversation_id = $1
        ORDER BY position ASC
        "#,
    )
    .bind(id.as_uuid())
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| db_error("Failed to fetch messages", e))?;

    rows.iter().map(row_to_message).collect()
}

#[async_trait]
impl ConversationStore for PostgresConversationStore {
    async fn list_summaries(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ConversationSummary>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, last_message_at, created_at
            FROM conversations
            WHERE user_id = $1
            ORDER BY last_message_at DESC, created_at DESC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list conversations", e))?;

        rows.iter()
            .map(|row| {
                Ok(ConversationSummary {
                    id: ConversationId::from_uuid(decode(row, "id")?),
                    title: decode(row, "title")?,
                    last_message_at: Timestamp::from_datetime(decode(row, "last_message_at")?),
                    created_at: Timestamp::from_datetime(decode(row, "created_at")?),
                })
            })
            .collect()
    }

    async fn get(&self, user_id: &UserId, id: &ConversationId) -> Result<Conversation, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to start transaction", e))?;

        // Both statements must see the same committed appends.
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to set snapshot isolation", e))?;

        let row = sqlx::query(
            r#"
            SELECT id, user_id, title, last_message_at, created_at, updated_at
            FROM conversations
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(user_id.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to fetch conversation", e))?
        .ok_or_else(DomainError::conversation_not_found)?;

        let messages = load_messages(&mut *tx, id).await?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to end read transaction", e))?;

        row_to_conversation(&row, messages)
    }

    async fn create(&self, user_id: &UserId, title: &str) -> Result<Conversation, DomainError> {
        let conversation = Conversation::new(user_id.clone(), title)?;

        sqlx::query(
            r#"
            INSERT INTO conversations (id, user_id, title, last_message_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(conversation.id().as_uuid())
        .bind(conversation.user_id().as_str())
        .bind(conversation.title())
        .bind(conversation.last_message_at().as_datetime())
        .bind(conversation.created_at().as_datetime())
        .bind(conversation.updated_at().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to insert conversation", e))?;

        Ok(conversation)
    }

    async fn append_and_persist(
        &self,
        user_id: &UserId,
        id: &ConversationId,
        messages: &[Message],
        last_message_at: Timestamp,
    ) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to start transaction", e))?;

        // Row lock serializes appends to the same conversation.
        let locked = sqlx::query(
            "SELECT id FROM conversations WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(id.as_uuid())
        .bind(user_id.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to lock conversation", e))?;

        if locked.is_none() {
            return Err(DomainError::conversation_not_found());
        }

        let next: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM conversation_messages WHERE conversation_id = $1",
        )
        .bind(id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to read message position", e))?;

        for (offset, message) in messages.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO conversation_messages (conversation_id, position, role, content, created_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(id.as_uuid())
            .bind(next + offset as i32)
            .bind(message.role().as_str())
            .bind(message.content())
            .bind(message.timestamp().as_datetime())
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to insert message", e))?;
        }

        sqlx::query(
            r#"
            UPDATE conversations
            SET last_message_at = GREATEST(last_message_at, $2),
                updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(last_message_at.as_datetime())
        .bind(Timestamp::now().as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to update conversation", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", e))?;

        Ok(())
    }

    async fn rename(
        &self,
        user_id: &UserId,
        id: &ConversationId,
        title: &str,
    ) -> Result<Conversation, DomainError> {
        let title = validate_title(title)?;

        let result = sqlx::query(
            "UPDATE conversations SET title = $3, updated_at = $4 WHERE id = $1 AND user_id = $2",
        )
        .bind(id.as_uuid())
        .bind(user_id.as_str())
        .bind(&title)
        .bind(Timestamp::now().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to rename conversation", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::conversation_not_found());
        }

        self.get(user_id, id).await
    }

    async fn delete(&self, user_id: &UserId, id: &ConversationId) -> Result<(), DomainError> {
        // Messages go with the parent through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM conversations WHERE id = $1 AND user_id = $2")
            .bind(id.as_uuid())
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to delete conversation", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::conversation_not_found());
        }
        Ok(())
    }
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("{}: {}", context, e))
}

fn decode<'r, T>(row: &'r PgRow, column: &str) -> Result<T, DomainError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column)
        .map_err(|e| db_error(&format!("Failed to decode column '{}'", column), e))
}

fn row_to_message(row: &PgRow) -> Result<Message, DomainError> {
    let role: String = decode(row, "role")?;
    let content: String = decode(row, "content")?;
    let created_at: DateTime<Utc> = decode(row, "created_at")?;
    Ok(Message::reconstitute(
        str_to_role(&role)?,
        content,
        Timestamp::from_datetime(created_at),
    ))
}

fn row_to_conversation(row: &PgRow, messages: Vec<Message>) -> Result<Conversation, DomainError> {
    let id: Uuid = decode(row, "id")?;
    let user_id: String = decode(row, "user_id")?;
    Ok(Conversation::reconstitute(
        ConversationId::from_uuid(id),
        UserId::new(user_id)?,
        decode(row, "title")?,
        messages,
        Timestamp::from_datetime(decode(row, "last_message_at")?),
        Timestamp::from_datetime(decode(row, "created_at")?),
        Timestamp::from_datetime(decode(row, "updated_at")?),
    ))
}

fn str_to_role(s: &str) -> Result<Role, DomainError> {
    match s {
        "user" => Ok(Role::User),
        "assistant" => Ok(Role::Assistant),
        other => Err(DomainError::database(format!("Unknown message role: {}", other))),
    }
}
