//! HTTP handlers for conversation endpoints.
//!
//! These handlers connect Axum routes to application layer operations.
//! Every route requires an authenticated caller; ownership is enforced by
//! the store, so a foreign conversation looks exactly like a missing one.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::adapters::http::middleware::{RateLimitCheck, RateLimitRejection, RequireAuth};
use crate::application::{
    CreateConversationCommand, CreateConversationHandler, DeleteConversationCommand,
    DeleteConversationHandler, GetConversationHandler, GetConversationQuery,
    ListConversationsHandler, ListConversationsQuery, RenameConversationCommand,
    RenameConversationHandler, StreamMessageCommand, StreamMessageError, StreamMessageHandler,
    StreamingHandlerConfig,
};
use crate::domain::foundation::{ConversationId, DomainError, ErrorCode, Timestamp};
use crate::ports::{AIProvider, ConversationStore, RateLimitResource, RateLimiter};

use super::dto::{
    ConversationDocument, ConversationSummaryView, CreateConversationRequest, ErrorResponse,
    FieldError, HealthResponse, MessageResponse, RenameConversationRequest, SendMessageRequest,
};
use super::streaming::{fragment_channel, StreamingText};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state for conversation handlers.
#[derive(Clone)]
pub struct ChatAppState {
    pub create_handler: Arc<CreateConversationHandler>,
    pub list_handler: Arc<ListConversationsHandler>,
    pub get_handler: Arc<GetConversationHandler>,
    pub rename_handler: Arc<RenameConversationHandler>,
    pub delete_handler: Arc<DeleteConversationHandler>,
    pub stream_handler: Arc<StreamMessageHandler>,
    pub rate_check: RateLimitCheck,
}

impl ChatAppState {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        ai_provider: Arc<dyn AIProvider>,
        rate_limiter: Arc<dyn RateLimiter>,
        config: StreamingHandlerConfig,
    ) -> Self {
        Self {
            create_handler: Arc::new(CreateConversationHandler::new(store.clone())),
            list_handler: Arc::new(ListConversationsHandler::new(store.clone())),
            get_handler: Arc::new(GetConversationHandler::new(store.clone())),
            rename_handler: Arc::new(RenameConversationHandler::new(store.clone())),
            delete_handler: Arc::new(DeleteConversationHandler::new(store.clone())),
            stream_handler: Arc::new(StreamMessageHandler::with_config(
                store,
                ai_provider,
                config,
            )),
            rate_check: RateLimitCheck::new(rate_limiter),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// GET /
// ════════════════════════════════════════════════════════════════════════════════

/// GET / - Liveness probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "Server is running!".to_string(),
        timestamp: Timestamp::now(),
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// GET /api/chat/conversations
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/chat/conversations - Caller's conversations, most recent activity first.
pub async fn list_conversations(
    State(state): State<ChatAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<ConversationSummaryView>>, ChatApiError> {
    let summaries = state
        .list_handler
        .handle(ListConversationsQuery { user_id: user.id })
        .await?;

    Ok(Json(summaries.iter().map(ConversationSummaryView::from).collect()))
}

// ════════════════════════════════════════════════════════════════════════════════
// GET /api/chat/conversations/:id
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/chat/conversations/:id - Full conversation including messages.
///
/// # Errors
/// - 400 Bad Request: Malformed conversation id
/// - 404 Not Found: Absent or owned by someone else
pub async fn get_conversation(
    State(state): State<ChatAppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<ConversationDocument>, ChatApiError> {
    let conversation_id = parse_conversation_id(&id)?;

    let conversation = state
        .get_handler
        .handle(GetConversationQuery {
            user_id: user.id,
            conversation_id,
        })
        .await?;

    Ok(Json(ConversationDocument::from(&conversation)))
}

// ════════════════════════════════════════════════════════════════════════════════
// POST /api/chat/conversations
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/chat/conversations - Create an empty conversation.
///
/// # Errors
/// - 400 Bad Request: Title blank or longer than 200 characters
pub async fn create_conversation(
    State(state): State<ChatAppState>,
    RequireAuth(user): RequireAuth,
    payload: Result<Json<CreateConversationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ChatApiError> {
    let Json(request) = payload?;

    let conversation = state
        .create_handler
        .handle(CreateConversationCommand {
            user_id: user.id,
            title: request.title,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ConversationDocument::from(&conversation)),
    ))
}

// ════════════════════════════════════════════════════════════════════════════════
// PUT /api/chat/conversations/:id
// ════════════════════════════════════════════════════════════════════════════════

/// PUT /api/chat/conversations/:id - Rename a conversation.
pub async fn rename_conversation(
    State(state): State<ChatAppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
    payload: Result<Json<RenameConversationRequest>, JsonRejection>,
) -> Result<Json<ConversationDocument>, ChatApiError> {
    let conversation_id = parse_conversation_id(&id)?;
    let Json(request) = payload?;

    let conversation = state
        .rename_handler
        .handle(RenameConversationCommand {
            user_id: user.id,
            conversation_id,
            new_title: request.title,
        })
        .await?;

    Ok(Json(ConversationDocument::from(&conversation)))
}

// ════════════════════════════════════════════════════════════════════════════════
// DELETE /api/chat/conversations/:id
// ════════════════════════════════════════════════════════════════════════════════

/// DELETE /api/chat/conversations/:id - Delete a conversation and its turns.
///
/// # Errors
/// - 404 Not Found: Absent (including already deleted) or not owned
/// - 429 Too Many Requests: Strict deletion quota exceeded
pub async fn delete_conversation(
    State(state): State<ChatAppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ChatApiError> {
    state
        .rate_check
        .check_resource(&user.id, RateLimitResource::ConversationDelete)
        .await?;
    let conversation_id = parse_conversation_id(&id)?;

    state
        .delete_handler
        .handle(DeleteConversationCommand {
            user_id: user.id,
            conversation_id,
        })
        .await?;

    Ok(Json(MessageResponse::new("Conversation deleted successfully")))
}

// ════════════════════════════════════════════════════════════════════════════════
// POST /api/chat/conversations/:id/messages
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/chat/conversations/:id/messages - Send a message, stream the reply.
///
/// Everything that can fail with a status code happens before the response
/// starts. After that the reply streams as chunked `text/plain`; generation
/// failures arrive as the fallback text and a failed commit aborts the body.
///
/// # Errors
/// - 400 Bad Request: Malformed id or blank message
/// - 404 Not Found: Absent or not owned
/// - 409 Conflict: A reply is already streaming for this conversation
/// - 429 Too Many Requests: Chat quota exceeded
pub async fn send_message(
    State(state): State<ChatAppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Response, ChatApiError> {
    state
        .rate_check
        .check_resource(&user.id, RateLimitResource::ChatMessages)
        .await?;
    let conversation_id = parse_conversation_id(&id)?;
    let Json(request) = payload?;

    let prepared = state
        .stream_handler
        .prepare(StreamMessageCommand::new(
            user.id,
            conversation_id,
            request.message,
        ))
        .await?;

    let (sink, body) = fragment_channel();

    // Detached from the connection: a client that goes away does not stop
    // generation or the commit.
    tokio::spawn(async move {
        let _ = prepared.stream_to(&sink).await;
    });

    Ok(StreamingText(body).into_response())
}

fn parse_conversation_id(raw: &str) -> Result<ConversationId, ChatApiError> {
    raw.parse()
        .map_err(|_| ChatApiError::Validation(vec![FieldError::new("id", "Invalid conversation ID")]))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// Errors surfaced by conversation endpoints.
#[derive(Debug)]
pub enum ChatApiError {
    Validation(Vec<FieldError>),
    NotFound,
    SendInProgress,
    RateLimited(RateLimitRejection),
    Internal(String),
}

impl From<DomainError> for ChatApiError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => {
                let field = err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "body".to_string());
                ChatApiError::Validation(vec![FieldError::new(field, err.message)])
            }
            ErrorCode::ConversationNotFound => ChatApiError::NotFound,
            ErrorCode::SendInProgress => ChatApiError::SendInProgress,
            _ => ChatApiError::Internal(err.to_string()),
        }
    }
}

impl From<StreamMessageError> for ChatApiError {
    fn from(err: StreamMessageError) -> Self {
        match err {
            StreamMessageError::Validation(v) => {
                ChatApiError::Validation(vec![FieldError::new(v.field(), v.to_string())])
            }
            StreamMessageError::ConversationNotFound => ChatApiError::NotFound,
            StreamMessageError::SendInProgress => ChatApiError::SendInProgress,
            StreamMessageError::Store(e) => ChatApiError::from(e),
        }
    }
}

impl From<JsonRejection> for ChatApiError {
    fn from(rejection: JsonRejection) -> Self {
        ChatApiError::Validation(vec![FieldError::new("body", rejection.body_text())])
    }
}

impl From<RateLimitRejection> for ChatApiError {
    fn from(rejection: RateLimitRejection) -> Self {
        ChatApiError::RateLimited(rejection)
    }
}

impl IntoResponse for ChatApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ChatApiError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, ErrorResponse::validation(errors))
            }
            ChatApiError::NotFound => (StatusCode::NOT_FOUND, ErrorResponse::not_found()),
            ChatApiError::SendInProgress => (
                StatusCode::CONFLICT,
                ErrorResponse::new(
                    "SEND_IN_PROGRESS",
                    StreamMessageError::SendInProgress.to_string(),
                ),
            ),
            ChatApiError::RateLimited(rejection) => return rejection.into_response(),
            ChatApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::internal())
            }
        };

        (status, Json(error)).into_response()
    }
}
