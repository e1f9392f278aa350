//! Conversation command and query handlers.
//!
//! Thin orchestration over the `ConversationStore` port. Ownership is
//! enforced by the store; every handler takes the caller's `UserId`.

mod create_conversation;
mod delete_conversation;
mod get_conversation;
mod list_conversations;
mod rename_conversation;

pub use create_conversation::{CreateConversationCommand, CreateConversationHandler};
pub use delete_conversation::{DeleteConversationCommand, DeleteConversationHandler};
pub use get_conversation::{GetConversationHandler, GetConversationQuery};
pub use list_conversations::{ListConversationsHandler, ListConversationsQuery};
pub use rename_conversation::{RenameConversationCommand, RenameConversationHandler};
