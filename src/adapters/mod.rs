//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `ai` - Model providers (OpenAI-compatible streaming, mock)
//! - `auth` - Session validation (JWT, mock)
//! - `conversation_store` - In-memory conversation storage
//! - `postgres` - PostgreSQL conversation storage
//! - `rate_limiter` - Fixed-window rate limiting
//! - `http` - Axum routes, middleware and streaming responses

pub mod ai;
pub mod auth;
pub mod conversation_store;
pub mod http;
pub mod postgres;
pub mod rate_limiter;

pub use ai::{MockAIProvider, OpenAIConfig, OpenAIProvider};
pub use auth::{JwtSessionValidator, MockSessionValidator};
pub use conversation_store::InMemoryConversationStore;
pub use postgres::PostgresConversationStore;
pub use rate_limiter::InMemoryRateLimiter;
