//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod conversation;
mod in_flight;
pub mod stream_message;

pub use conversation::{
    CreateConversationCommand, CreateConversationHandler, DeleteConversationCommand,
    DeleteConversationHandler, GetConversationHandler, GetConversationQuery,
    ListConversationsHandler, ListConversationsQuery, RenameConversationCommand,
    RenameConversationHandler,
};
pub use in_flight::{InFlightPermit, InFlightRegistry};
pub use stream_message::{
    PreparedSend, SendOutcome, StreamMessageCommand, StreamMessageError, StreamMessageHandler,
    StreamingHandlerConfig,
};
