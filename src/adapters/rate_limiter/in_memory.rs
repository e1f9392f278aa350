//! In-memory rate limiter.
//!
//! Uses a fixed-window counter per key in a HashMap. Counters live in the
//! process, so each server instance enforces its own quota.
//!
//! Expired windows are swept on write once the map holds
//! `prune_threshold` keys, which bounds memory by the number of clients
//! active within one window.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::RateLimitConfig;
use crate::domain::foundation::Timestamp;
use crate::ports::{
    RateLimitDenied, RateLimitError, RateLimitKey, RateLimitResult, RateLimitStatus, RateLimiter,
};

/// Keys tracked before a write sweeps out expired windows.
const DEFAULT_PRUNE_THRESHOLD: usize = 10_000;

/// Fixed-window rate limiter backed by process memory.
#[derive(Debug, Clone)]
pub struct InMemoryRateLimiter {
    config: RateLimitConfig,
    windows: Arc<RwLock<HashMap<String, WindowState>>>,
    prune_threshold: usize,
}

/// State for a single rate limit window.
#[derive(Debug, Clone)]
struct WindowState {
    count: u32,
    window_start: i64,
    window_secs: u32,
}

impl WindowState {
    fn window_end(&self) -> i64 {
        self.window_start + i64::from(self.window_secs)
    }
}

impl InMemoryRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Arc::new(RwLock::new(HashMap::new())),
            prune_threshold: DEFAULT_PRUNE_THRESHOLD,
        }
    }

    /// Sets how many keys may accumulate before expired ones are swept.
    pub fn with_prune_threshold(mut self, threshold: usize) -> Self {
        self.prune_threshold = threshold.max(1);
        self
    }

    /// Create a rate limiter with the default quotas.
    pub fn with_defaults() -> Self {
        Self::new(RateLimitConfig::default())
    }

    /// Number of keys currently tracked.
    pub async fn tracked_keys(&self) -> usize {
        self.windows.read().await.len()
    }

    async fn check_at(&self, key: RateLimitKey, now: i64) -> RateLimitResult {
        let rule = self.config.limit_for(key.scope, key.resource);
        let (limit, window_secs) = (rule.max_requests, rule.window_secs);

        if !self.config.enabled {
            return RateLimitResult::Allowed(RateLimitStatus {
                limit,
                remaining: limit,
                reset_at: Timestamp::from_unix_secs(now + i64::from(window_secs)),
                window_secs,
            });
        }

        let mut windows = self.windows.write().await;
        if windows.len() >= self.prune_threshold {
            let before = windows.len();
            windows.retain(|_, state| now < state.window_end());
            tracing::debug!(
                pruned = before - windows.len(),
                remaining = windows.len(),
                "Swept expired rate limit windows"
            );
        }

        let state = windows
            .entry(key.storage_key())
            .or_insert_with(|| WindowState {
                count: 0,
                window_start: now,
                window_secs,
            });

        if now >= state.window_end() {
            state.count = 0;
            state.window_start = now;
            state.window_secs = window_secs;
        }

        if state.count >= limit {
            let retry_after = (state.window_end() - now).max(1);
            return RateLimitResult::Denied(RateLimitDenied {
                limit,
                retry_after_secs: u32::try_from(retry_after).unwrap_or(u32::MAX),
                scope: key.scope,
                message: rule.message.clone(),
            });
        }

        state.count += 1;
        RateLimitResult::Allowed(RateLimitStatus {
            limit,
            remaining: limit.saturating_sub(state.count),
            reset_at: Timestamp::from_unix_secs(state.window_end()),
            window_secs,
        })
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(&self, key: RateLimitKey) -> Result<RateLimitResult, RateLimitError> {
        Ok(self.check_at(key, Timestamp::now().as_unix_secs()).await)
    }
}
