//! Rate limit configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::ports::{RateLimitResource, RateLimitScope};

/// One fixed-window quota.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WindowLimit {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Window duration in seconds.
    pub window_secs: u32,
    /// Message returned when the quota is exhausted.
    pub message: String,
}

impl WindowLimit {
    pub fn new(max_requests: u32, window_secs: u32, message: impl Into<String>) -> Self {
        Self {
            max_requests,
            window_secs,
            message: message.into(),
        }
    }

    fn validate(&self, name: &'static str) -> Result<(), ValidationError> {
        if self.max_requests == 0 || self.window_secs == 0 {
            return Err(ValidationError::InvalidRateLimit(name));
        }
        Ok(())
    }
}

/// Rate limit configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RateLimitConfig {
    /// Turns every limit off.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Per client address, across the whole `/api` surface.
    #[serde(default = "default_general")]
    pub general: WindowLimit,

    /// Per caller, for sending chat messages.
    #[serde(default = "default_chat_messages")]
    pub chat_messages: WindowLimit,

    /// Per caller, for deleting conversations.
    #[serde(default = "default_conversation_delete")]
    pub conversation_delete: WindowLimit,
}

impl RateLimitConfig {
    /// Quota that applies to a key with the given scope and resource.
    pub fn limit_for(
        &self,
        scope: RateLimitScope,
        resource: Option<RateLimitResource>,
    ) -> &WindowLimit {
        match (scope, resource) {
            (_, Some(RateLimitResource::ChatMessages)) => &self.chat_messages,
            (_, Some(RateLimitResource::ConversationDelete)) => &self.conversation_delete,
            (RateLimitScope::Ip, None) | (RateLimitScope::User, None) => &self.general,
        }
    }

    /// A configuration with every limit switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.general.validate("general")?;
        self.chat_messages.validate("chat_messages")?;
        self.conversation_delete.validate("conversation_delete")?;
        Ok(())
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            general: default_general(),
            chat_messages: default_chat_messages(),
            conversation_delete: default_conversation_delete(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_general() -> WindowLimit {
    WindowLimit::new(
        100,
        15 * 60,
        "Too many requests from this IP, please try again later.",
    )
}

fn default_chat_messages() -> WindowLimit {
    WindowLimit::new(10, 60, "Too many messages sent, please slow down.")
}

fn default_conversation_delete() -> WindowLimit {
    WindowLimit::new(
        10,
        60 * 60,
        "Rate limit exceeded for this operation. Please try again later.",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_published_quotas() {
        let config = RateLimitConfig::default();
        assert!(config.enabled);
        assert_eq!((config.general.max_requests, config.general.window_secs), (100, 900));
        assert_eq!(
            (config.chat_messages.max_requests, config.chat_messages.window_secs),
            (10, 60)
        );
        assert_eq!(
            (
                config.conversation_delete.max_requests,
                config.conversation_delete.window_secs
            ),
            (10, 3600)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn limit_for_picks_resource_quota() {
        let config = RateLimitConfig::default();
        assert_eq!(
            config.limit_for(RateLimitScope::User, Some(RateLimitResource::ChatMessages)),
            &config.chat_messages
        );
        assert_eq!(
            config.limit_for(
                RateLimitScope::User,
                Some(RateLimitResource::ConversationDelete)
            ),
            &config.conversation_delete
        );
        assert_eq!(config.limit_for(RateLimitScope::Ip, None), &config.general);
    }

    #[test]
    fn zero_quota_is_invalid() {
        let config = RateLimitConfig {
            chat_messages: WindowLimit::new(0, 60, "x"),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidRateLimit("chat_messages"))
        );
    }
}
