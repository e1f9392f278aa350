//! Rate limiting port.
//!
//! Fixed-window counters keyed by client address for the general API limit
//! and by caller plus resource for the stricter per-operation limits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{Timestamp, UserId};

/// Port for rate limiting operations.
///
/// Implementations must be thread-safe and support concurrent access.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Check if request is allowed, consuming one unit of quota if so.
    async fn check(&self, key: RateLimitKey) -> Result<RateLimitResult, RateLimitError>;
}

/// Key identifying what to rate limit.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct RateLimitKey {
    pub scope: RateLimitScope,
    /// Client address or user id, depending on scope.
    pub identifier: String,
    /// Operation with its own quota, if any.
    pub resource: Option<RateLimitResource>,
}

/// The scope at which rate limiting is applied.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitScope {
    /// Per client address.
    Ip,
    /// Per authenticated caller.
    User,
}

/// Operations with a dedicated quota.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitResource {
    /// Sending a chat message (starts a model generation).
    ChatMessages,
    /// Deleting a conversation.
    ConversationDelete,
}

impl RateLimitKey {
    /// Creates an address-based key.
    pub fn ip(ip: &str) -> Self {
        Self {
            scope: RateLimitScope::Ip,
            identifier: ip.to_string(),
            resource: None,
        }
    }

    /// Creates a caller key for a specific operation.
    pub fn user_resource(user_id: &UserId, resource: RateLimitResource) -> Self {
        Self {
            scope: RateLimitScope::User,
            identifier: user_id.to_string(),
            resource: Some(resource),
        }
    }

    /// Flat string form, used as the storage key.
    pub fn storage_key(&self) -> String {
        match &self.resource {
            Some(resource) => format!(
                "ratelimit:{}:{}:{}",
                self.scope,
                self.identifier,
                resource.as_str()
            ),
            None => format!("ratelimit:{}:{}", self.scope, self.identifier),
        }
    }
}

impl RateLimitScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitScope::Ip => "ip",
            RateLimitScope::User => "user",
        }
    }
}

impl fmt::Display for RateLimitScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl RateLimitResource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitResource::ChatMessages => "chat_messages",
            RateLimitResource::ConversationDelete => "conversation_delete",
        }
    }
}

/// Result of a rate limit check.
#[derive(Debug, Clone)]
pub enum RateLimitResult {
    /// Request is allowed; includes current status.
    Allowed(RateLimitStatus),
    /// Request is denied; includes denial details.
    Denied(RateLimitDenied),
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed(_))
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, RateLimitResult::Denied(_))
    }
}

/// Current rate limit status.
#[derive(Debug, Clone)]
pub struct RateLimitStatus {
    /// Maximum requests allowed in the window.
    pub limit: u32,
    /// Remaining requests in the current window.
    pub remaining: u32,
    /// When the current window resets.
    pub reset_at: Timestamp,
    /// Window duration in seconds.
    pub window_secs: u32,
}

/// Details of a rate limit denial.
#[derive(Debug, Clone)]
pub struct RateLimitDenied {
    /// Maximum requests allowed in the window.
    pub limit: u32,
    /// Seconds until the client should retry.
    pub retry_after_secs: u32,
    /// The scope that triggered the denial.
    pub scope: RateLimitScope,
    /// Human-readable message explaining the denial.
    pub message: String,
}

/// Errors that can occur during rate limiting operations.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// Rate limiter backend is unavailable.
    #[error("rate limiter unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ip_key_has_no_resource() {
        let key = RateLimitKey::ip("192.168.1.1");
        assert_eq!(key.scope, RateLimitScope::Ip);
        assert_eq!(key.identifier, "192.168.1.1");
        assert!(key.resource.is_none());
    }

    #[test]
    fn user_resource_key_includes_resource() {
        let user_id = UserId::new("user-123").unwrap();
        let key = RateLimitKey::user_resource(&user_id, RateLimitResource::ChatMessages);
        assert_eq!(key.scope, RateLimitScope::User);
        assert_eq!(key.identifier, "user-123");
        assert_eq!(key.resource, Some(RateLimitResource::ChatMessages));
    }

    #[test]
    fn storage_key_format() {
        assert_eq!(RateLimitKey::ip("10.0.0.1").storage_key(), "ratelimit:ip:10.0.0.1");
        let user_id = UserId::new("user-456").unwrap();
        let key = RateLimitKey::user_resource(&user_id, RateLimitResource::ConversationDelete);
        assert_eq!(
            key.storage_key(),
            "ratelimit:user:user-456:conversation_delete"
        );
    }

    #[test]
    fn rate_limit_result_predicates() {
        let allowed = RateLimitResult::Allowed(RateLimitStatus {
            limit: 10,
            remaining: 9,
            reset_at: Timestamp::now(),
            window_secs: 60,
        });
        assert!(allowed.is_allowed());
        assert!(!allowed.is_denied());

        let denied = RateLimitResult::Denied(RateLimitDenied {
            limit: 10,
            retry_after_secs: 30,
            scope: RateLimitScope::User,
            message: "slow down".to_string(),
        });
        assert!(denied.is_denied());
    }
}
