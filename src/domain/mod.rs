//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, auth)
//! - `conversation` - Conversation aggregate, turns and history projection

pub mod conversation;
pub mod foundation;
