//! Client-side error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server rejected the session; the cached token has been cleared.
    #[error("Session expired")]
    Unauthenticated,

    /// Non-success response before any streaming began.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// A reply is already streaming into this transcript.
    #[error("A message is already being sent")]
    SendInProgress,

    #[error("Message cannot be empty")]
    EmptyMessage,

    /// The body ended abnormally after streaming started.
    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    /// Error for a non-OK response, using the server's message when it sent one.
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        ClientError::Api {
            status,
            message: message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("Request failed with status {}", status)),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Unauthenticated => Some(401),
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
