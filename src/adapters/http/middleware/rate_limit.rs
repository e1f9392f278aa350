//! Rate limiting middleware for axum.
//!
//! Two mechanisms, both backed by the `RateLimiter` port:
//!
//! - `rate_limit_middleware` applies the general per-client-address quota
//!   to everything under `/api`. The address is the peer socket unless
//!   [`GeneralRateLimit`] is configured to trust proxy headers.
//! - `RateLimitCheck` is used inside handlers for per-caller, per-resource
//!   quotas (chat messages, deletions) once the caller is known.
//!
//! Rate limit status is returned in standard HTTP headers:
//! - `X-RateLimit-Limit`: Maximum requests allowed in the window
//! - `X-RateLimit-Remaining`: Requests remaining in the current window
//! - `X-RateLimit-Reset`: Unix timestamp when the window resets
//! - `Retry-After`: Seconds to wait (only on 429 response)
//!
//! Limiter outages fail open.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::adapters::http::conversation::dto::RateLimitedResponse;
use crate::domain::foundation::UserId;
use crate::ports::{RateLimitKey, RateLimitResource, RateLimitResult, RateLimitStatus, RateLimiter};

/// Shared rate limiter backing both mechanisms.
pub type RateLimiterState = Arc<dyn RateLimiter>;

/// State for [`rate_limit_middleware`].
#[derive(Clone)]
pub struct GeneralRateLimit {
    limiter: RateLimiterState,
    trust_proxy: bool,
}

impl GeneralRateLimit {
    pub fn new(limiter: RateLimiterState, trust_proxy: bool) -> Self {
        Self {
            limiter,
            trust_proxy,
        }
    }
}

/// Standard rate limit header names.
pub mod headers {
    use super::HeaderName;

    /// Maximum requests allowed in the window.
    pub static X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
    /// Requests remaining in the current window.
    pub static X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
    /// Unix timestamp when the window resets.
    pub static X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");
}

/// Key used when no client address can be determined.
const UNKNOWN_CLIENT: &str = "unknown";

/// General per-client-address limit.
pub async fn rate_limit_middleware(
    State(general): State<GeneralRateLimit>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let client_ip =
        extract_client_ip(request.headers(), connect_info.as_ref(), general.trust_proxy)
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string());

    let status = match general.limiter.check(RateLimitKey::ip(&client_ip)).await {
        Ok(RateLimitResult::Allowed(status)) => Some(status),
        Ok(RateLimitResult::Denied(denied)) => {
            tracing::warn!(client_ip = %client_ip, "General rate limit exceeded");
            return RateLimitRejection {
                limit: denied.limit,
                retry_after_secs: denied.retry_after_secs,
                message: denied.message,
            }
            .into_response();
        }
        Err(e) => {
            tracing::warn!("Rate limiter unavailable: {}", e);
            None
        }
    };

    let mut response = next.run(request).await;

    if let Some(status) = status {
        add_rate_limit_headers(
            response.headers_mut(),
            status.limit,
            status.remaining,
            status.reset_at.as_unix_secs(),
        );
    }

    response
}

/// Extract client IP from request.
///
/// When `trust_proxy` is set, order of precedence:
/// 1. X-Forwarded-For header (first IP in list)
/// 2. X-Real-IP header
/// 3. ConnectInfo socket address
///
/// Otherwise only the socket address counts.
fn extract_client_ip(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
    trust_proxy: bool,
) -> Option<String> {
    let socket_ip = connect_info.map(|ci| ci.0.ip().to_string());
    if !trust_proxy {
        return socket_ip;
    }

    if let Some(forwarded) = headers.get("X-Forwarded-For").and_then(|h| h.to_str().ok()) {
        if let Some(first_ip) = forwarded.split(',').next().map(str::trim) {
            if !first_ip.is_empty() {
                return Some(first_ip.to_string());
            }
        }
    }

    if let Some(real_ip) = headers.get("X-Real-IP").and_then(|h| h.to_str().ok()) {
        return Some(real_ip.trim().to_string());
    }

    socket_ip
}

fn add_rate_limit_headers(headers: &mut HeaderMap, limit: u32, remaining: u32, reset_at: i64) {
    headers.insert(headers::X_RATELIMIT_LIMIT.clone(), HeaderValue::from(limit));
    headers.insert(
        headers::X_RATELIMIT_REMAINING.clone(),
        HeaderValue::from(remaining),
    );
    headers.insert(headers::X_RATELIMIT_RESET.clone(), HeaderValue::from(reset_at));
}

/// Rate limit checker for per-resource limiting in handlers.
///
/// # Example
///
/// ```ignore
/// async fn send(RequireAuth(user): RequireAuth, State(state): State<ChatAppState>) -> ... {
///     state.rate_check.check_resource(&user.id, RateLimitResource::ChatMessages).await?;
///     // ... handle request
/// }
/// ```
#[derive(Clone)]
pub struct RateLimitCheck {
    limiter: Arc<dyn RateLimiter>,
}

impl RateLimitCheck {
    pub fn new(limiter: Arc<dyn RateLimiter>) -> Self {
        Self { limiter }
    }

    /// Counts one request against the caller's quota for `resource`.
    ///
    /// Returns `None` when the limiter is unavailable.
    pub async fn check_resource(
        &self,
        user_id: &UserId,
        resource: RateLimitResource,
    ) -> Result<Option<RateLimitStatus>, RateLimitRejection> {
        let key = RateLimitKey::user_resource(user_id, resource);
        match self.limiter.check(key).await {
            Ok(RateLimitResult::Allowed(status)) => Ok(Some(status)),
            Ok(RateLimitResult::Denied(denied)) => {
                tracing::warn!(
                    user_id = %user_id,
                    resource = resource.as_str(),
                    "Resource rate limit exceeded"
                );
                Err(RateLimitRejection {
                    limit: denied.limit,
                    retry_after_secs: denied.retry_after_secs,
                    message: denied.message,
                })
            }
            Err(e) => {
                tracing::warn!("Rate limiter unavailable: {}", e);
                Ok(None)
            }
        }
    }
}

/// Rejection for rate limit exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRejection {
    /// The rate limit that was exceeded.
    pub limit: u32,
    /// Seconds until the limit resets.
    pub retry_after_secs: u32,
    /// Human-readable message.
    pub message: String,
}

impl IntoResponse for RateLimitRejection {
    fn into_response(self) -> Response {
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(RateLimitedResponse {
                success: false,
                message: self.message,
                retry_after: self.retry_after_secs,
            }),
        )
            .into_response();

        let headers = response.headers_mut();
        headers.insert(header::RETRY_AFTER, HeaderValue::from(self.retry_after_secs));
        headers.insert(headers::X_RATELIMIT_LIMIT.clone(), HeaderValue::from(self.limit));
        headers.insert(headers::X_RATELIMIT_REMAINING.clone(), HeaderValue::from(0u32));

        response
    }
}
