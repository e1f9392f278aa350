//! HTTP adapter for conversation endpoints.

pub mod dto;
pub mod handlers;
pub mod routes;
pub mod streaming;

pub use dto::{
    ConversationDocument, ConversationSummaryView, CreateConversationRequest, ErrorResponse,
    FieldError, HealthResponse, MessageResponse, MessageView, RenameConversationRequest,
    SendMessageRequest,
};
pub use handlers::{health, ChatApiError, ChatAppState};
pub use routes::{chat_router, chat_routes};
pub use streaming::{fragment_channel, ChannelSink, StreamingText};
