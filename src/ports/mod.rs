//! Ports - Interfaces between the application core and the outside world.
//!
//! Each port is an async trait; adapters under `crate::adapters`
//! provide the concrete implementations.

mod ai_provider;
mod conversation_store;
mod fragment_sink;
mod rate_limiter;
mod session_validator;

pub use ai_provider::{
    AIError, AIProvider, CompletionRequest, FinishReason, FragmentStream, ProviderInfo,
    RequestMetadata, StreamChunk,
};
pub use conversation_store::ConversationStore;
pub use fragment_sink::{FragmentSink, SinkClosed};
pub use rate_limiter::{
    RateLimitDenied, RateLimitError, RateLimitKey, RateLimitResource, RateLimitResult,
    RateLimitScope, RateLimitStatus, RateLimiter,
};
pub use session_validator::SessionValidator;
