//! Authentication types for the domain layer.
//!
//! These types represent an authenticated caller extracted from a session
//! token. They have no dependency on the token format; any validator
//! behind the `SessionValidator` port can populate them.

use super::{Timestamp, UserId};
use thiserror::Error;

/// Authenticated caller extracted from a validated session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// The unique user identifier carried by the token.
    pub id: UserId,

    /// When the presented token stops being accepted, if it expires at all.
    pub expires_at: Option<Timestamp>,
}

impl AuthenticatedUser {
    /// Creates a new authenticated user.
    pub fn new(id: UserId, expires_at: Option<Timestamp>) -> Self {
        Self { id, expires_at }
    }
}

/// Authentication errors that can occur during token validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No bearer token was presented.
    #[error("Access token is required")]
    MissingToken,

    /// The token is malformed or has an invalid signature.
    #[error("Invalid token")]
    InvalidToken,

    /// The token has expired.
    #[error("Token has expired")]
    TokenExpired,

    /// The validator could not be consulted.
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    /// Creates a service unavailable error with a message.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Returns true if this error indicates the caller should sign in again.
    pub fn requires_reauthentication(&self) -> bool {
        !matches!(self, AuthError::ServiceUnavailable(_))
    }
}
