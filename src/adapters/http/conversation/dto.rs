//! HTTP DTOs for conversation endpoints.
//!
//! These types decouple the HTTP API from domain types, allowing independent
//! evolution. Field names follow the document shape clients already consume
//! (`_id`, camelCase timestamps).

use serde::{Deserialize, Serialize};

use crate::domain::conversation::{Conversation, ConversationSummary, Message, Role};
use crate::domain::foundation::Timestamp;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /conversations`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateConversationRequest {
    #[serde(default)]
    pub title: String,
}

/// Body of `PUT /conversations/:id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenameConversationRequest {
    #[serde(default)]
    pub title: String,
}

/// Body of `POST /conversations/:id/messages`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub message: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Full conversation document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub messages: Vec<MessageView>,
    pub last_message_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&Conversation> for ConversationDocument {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id().to_string(),
            user_id: conversation.user_id().to_string(),
            title: conversation.title().to_string(),
            messages: conversation.messages().iter().map(MessageView::from).collect(),
            last_message_at: conversation.last_message_at(),
            created_at: conversation.created_at(),
            updated_at: conversation.updated_at(),
        }
    }
}

/// One turn in a conversation document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageView {
    pub role: Role,
    pub content: String,
    pub timestamp: Timestamp,
}

impl From<&Message> for MessageView {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role(),
            content: message.content().to_string(),
            timestamp: message.timestamp(),
        }
    }
}

/// Entry in the conversation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummaryView {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub last_message_at: Timestamp,
    pub created_at: Timestamp,
}

impl From<&ConversationSummary> for ConversationSummaryView {
    fn from(summary: &ConversationSummary) -> Self {
        Self {
            id: summary.id.to_string(),
            title: summary.title.clone(),
            last_message_at: summary.last_message_at,
            created_at: summary.created_at,
        }
    }
}

/// Plain acknowledgement, e.g. after a delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Liveness probe body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub message: String,
    pub timestamp: Timestamp,
}

// ════════════════════════════════════════════════════════════════════════════════
// Error DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// One failed field in a validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Standard error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl ErrorResponse {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code.to_string()),
            errors: None,
        }
    }

    pub fn validation(errors: Vec<FieldError>) -> Self {
        Self {
            message: "Validation failed".to_string(),
            code: Some("VALIDATION_FAILED".to_string()),
            errors: Some(errors),
        }
    }

    pub fn not_found() -> Self {
        Self::new("NOT_FOUND", "Conversation not found")
    }

    pub fn internal() -> Self {
        Self::new("INTERNAL_ERROR", "Server error")
    }
}

/// Body of a 429 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitedResponse {
    pub success: bool,
    pub message: String,
    pub retry_after: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;

    mod documents {
        use super::*;

        #[test]
        fn conversation_document_uses_wire_field_names() {
            let mut conversation =
                Conversation::new(UserId::new("alice").unwrap(), "New Conversation").unwrap();
            let turn = Message::user("What is CTR?").unwrap();
            conversation.append(std::slice::from_ref(&turn), turn.timestamp());

            let json = serde_json::to_value(ConversationDocument::from(&conversation)).unwrap();

            assert_eq!(json["_id"], conversation.id().to_string());
            assert_eq!(json["userId"], "alice");
            assert_eq!(json["title"], "New Conversation");
            assert_eq!(json["messages"][0]["role"], "user");
            assert_eq!(json["messages"][0]["content"], "What is CTR?");
            assert!(json["messages"][0]["timestamp"].is_string());
            assert!(json["lastMessageAt"].is_string());
            assert!(json["createdAt"].is_string());
            assert!(json["updatedAt"].is_string());
        }

        #[test]
        fn summary_has_only_list_fields() {
            let conversation =
                Conversation::new(UserId::new("alice").unwrap(), "Plan").unwrap();
            let json =
                serde_json::to_value(ConversationSummaryView::from(&conversation.summary()))
                    .unwrap();

            let mut keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
            keys.sort();
            assert_eq!(keys, vec!["_id", "createdAt", "lastMessageAt", "title"]);
        }
    }

    mod requests {
        use super::*;

        #[test]
        fn missing_fields_default_to_empty() {
            let req: SendMessageRequest = serde_json::from_str("{}").unwrap();
            assert_eq!(req.message, "");
            let req: CreateConversationRequest = serde_json::from_str("{}").unwrap();
            assert_eq!(req.title, "");
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn validation_body_lists_fields() {
            let body = ErrorResponse::validation(vec![FieldError::new("id", "Invalid conversation ID")]);
            let json = serde_json::to_value(body).unwrap();

            assert_eq!(json["message"], "Validation failed");
            assert_eq!(json["errors"][0]["field"], "id");
            assert_eq!(json["errors"][0]["message"], "Invalid conversation ID");
        }

        #[test]
        fn rate_limited_body_is_camel_case() {
            let json = serde_json::to_value(RateLimitedResponse {
                success: false,
                message: "slow down".to_string(),
                retry_after: 42,
            })
            .unwrap();
            assert_eq!(json["retryAfter"], 42);
            assert_eq!(json["success"], false);
        }
    }
}
