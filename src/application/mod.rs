//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Following CQRS, it separates command handlers (write) from query handlers (read).

pub mod handlers;

pub use handlers::{
    CreateConversationCommand, CreateConversationHandler, DeleteConversationCommand,
    DeleteConversationHandler, GetConversationHandler, GetConversationQuery,
    ListConversationsHandler, ListConversationsQuery, PreparedSend, RenameConversationCommand,
    RenameConversationHandler, SendOutcome, StreamMessageCommand, StreamMessageError,
    StreamMessageHandler, StreamingHandlerConfig,
};
