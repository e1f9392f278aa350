//! Conversation store adapters that need no external service.
//!
//! The PostgreSQL implementation lives in `adapters::postgres`.

mod in_memory;

pub use in_memory::InMemoryConversationStore;
