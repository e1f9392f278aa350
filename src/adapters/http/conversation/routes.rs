//! Axum routes for conversation endpoints.
//!
//! Defines the routing table for all conversation-related HTTP endpoints.

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{
    create_conversation, delete_conversation, get_conversation, list_conversations,
    rename_conversation, send_message, ChatAppState,
};

/// Creates routes for conversation endpoints.
///
/// # Routes
/// - `GET /conversations` - List the caller's conversations
/// - `POST /conversations` - Create a conversation
/// - `GET /conversations/:id` - Fetch a conversation with its messages
/// - `PUT /conversations/:id` - Rename a conversation
/// - `DELETE /conversations/:id` - Delete a conversation
/// - `POST /conversations/:id/messages` - Send a message, stream the reply
pub fn chat_routes() -> Router<ChatAppState> {
    Router::new()
        .route(
            "/conversations",
            get(list_conversations).post(create_conversation),
        )
        .route(
            "/conversations/:id",
            get(get_conversation)
                .put(rename_conversation)
                .delete(delete_conversation),
        )
        .route("/conversations/:id/messages", post(send_message))
}

/// Chat routes mounted under `/chat`, suitable for nesting at `/api`.
pub fn chat_router() -> Router<ChatAppState> {
    Router::new().nest("/chat", chat_routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_routes_creates_valid_router() {
        let _routes = chat_routes();
    }

    #[test]
    fn chat_router_creates_combined_router() {
        let _router = chat_router();
    }
}
