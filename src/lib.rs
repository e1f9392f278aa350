//! Chatstream - Conversational AI Chat Backend
//!
//! Authenticated users hold multiple conversations with an AI assistant.
//! Replies stream back to the client fragment by fragment while being
//! accumulated, and each exchange is committed to the conversation exactly
//! once when the model finishes or fails.
//!
//! The crate also ships the consuming side (`client`): an incremental
//! reader that renders partial replies and folds them into a transcript.

pub mod adapters;
pub mod application;
pub mod client;
pub mod config;
pub mod domain;
pub mod ports;
