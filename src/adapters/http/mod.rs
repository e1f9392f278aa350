//! HTTP adapters - REST API implementations.
//!
//! Route modules expose their own routers; [`app_router`] assembles them
//! with the cross-cutting layers into the service the binary serves.

pub mod conversation;
pub mod middleware;

use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

pub use conversation::{chat_router, ChatAppState};
pub use middleware::{AuthState, RateLimiterState};

/// Builds the complete application router.
///
/// # Layout
/// - `GET /` - Liveness probe, no auth, no rate limit
/// - `/api/*` - General per-address rate limit
/// - `/api/chat/*` - Bearer session required
pub fn app_router(
    state: ChatAppState,
    validator: AuthState,
    limiter: RateLimiterState,
    server: &ServerConfig,
) -> Router {
    let chat = chat_router()
        .route_layer(axum::middleware::from_fn_with_state(
            validator,
            middleware::auth_middleware,
        ))
        .with_state(state);

    let api = Router::new()
        .merge(chat)
        .layer(axum::middleware::from_fn_with_state(
            middleware::GeneralRateLimit::new(limiter, server.trust_proxy),
            middleware::rate_limit_middleware,
        ));

    Router::new()
        .route("/", get(conversation::health))
        .nest("/api", api)
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(cors_layer(&server.cors_origins_list()))
        .layer(TraceLayer::new_for_http())
}

/// Permissive when no origins are configured.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::MockSessionValidator;
    use crate::adapters::conversation_store::InMemoryConversationStore;
    use crate::adapters::rate_limiter::InMemoryRateLimiter;
    use crate::adapters::ai::MockAIProvider;
    use crate::application::StreamingHandlerConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        let limiter: RateLimiterState = Arc::new(InMemoryRateLimiter::with_defaults());
        let state = ChatAppState::new(
            Arc::new(InMemoryConversationStore::new()),
            Arc::new(MockAIProvider::new()),
            limiter.clone(),
            StreamingHandlerConfig::default(),
        );
        app_router(
            state,
            Arc::new(MockSessionValidator::new()),
            limiter,
            &ServerConfig::default(),
        )
    }

    #[tokio::test]
    async fn root_answers_without_auth() {
        let response = app()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["message"], "Server is running!");
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn chat_routes_require_a_session() {
        let response = app()
            .oneshot(
                Request::get("/api/chat/conversations")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn api_responses_carry_rate_limit_headers() {
        let response = app()
            .oneshot(
                Request::get("/api/chat/conversations")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.headers().contains_key("x-ratelimit-limit"));
    }

    #[test]
    fn cors_with_origins_builds() {
        let _layer = cors_layer(&["http://localhost:3000".to_string()]);
    }
}
