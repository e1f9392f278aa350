//! Mock AI Provider for testing.
//!
//! Scripted implementation of the AIProvider port, so the streaming path
//! can be exercised without a real model.
//!
//! # Features
//!
//! - Scripted fragment sequences, consumed one per request
//! - Failure before the first fragment or part way through
//! - Per-fragment delay for in-flight and disconnect tests
//! - Call tracking for verification
//!
//! # Example
//!
//! ```ignore
//! let provider = MockAIProvider::new()
//!     .with_fragments(["Click", "-through rate", " is..."]);
//!
//! let mut stream = provider.stream_complete(request).await?;
//! ```

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::ports::{
    AIError, AIProvider, CompletionRequest, FinishReason, FragmentStream, ProviderInfo,
    StreamChunk,
};

/// A configured mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Yield the fragments, then optionally fail instead of finishing.
    Stream {
        fragments: Vec<String>,
        error: Option<AIError>,
    },
    /// Fail before producing anything.
    Error(AIError),
}

/// Mock AI provider for testing.
#[derive(Debug, Clone)]
pub struct MockAIProvider {
    /// Pre-configured responses (consumed in order).
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    info: ProviderInfo,
    /// Pause before each fragment.
    fragment_delay: Duration,
    /// Call history for verification.
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl Default for MockAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAIProvider {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            info: ProviderInfo::new("mock", "mock-model-1"),
            fragment_delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queues a successful stream of fragments.
    pub fn with_fragments<I, S>(self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(MockResponse::Stream {
            fragments: fragments.into_iter().map(Into::into).collect(),
            error: None,
        })
    }

    /// Queues a single-fragment reply.
    pub fn with_response(self, content: impl Into<String>) -> Self {
        self.with_fragments([content.into()])
    }

    /// Queues a stream that yields `fragments` and then fails.
    pub fn failing_after<I, S>(self, fragments: I, error: AIError) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(MockResponse::Stream {
            fragments: fragments.into_iter().map(Into::into).collect(),
            error: Some(error),
        })
    }

    /// Queues a failure before the first fragment.
    pub fn with_error(self, error: AIError) -> Self {
        self.push(MockResponse::Error(error))
    }

    /// Sleeps before yielding each fragment.
    pub fn with_fragment_delay(mut self, delay: Duration) -> Self {
        self.fragment_delay = delay;
        self
    }

    pub fn with_provider_info(mut self, info: ProviderInfo) -> Self {
        self.info = info;
        self
    }

    /// Returns the number of calls made to this provider.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Returns all recorded calls.
    pub fn get_calls(&self) -> Vec<CompletionRequest> {
        lock(&self.calls).clone()
    }

    fn push(self, response: MockResponse) -> Self {
        lock(&self.responses).push_back(response);
        self
    }

    fn next_response(&self) -> MockResponse {
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| MockResponse::Stream {
                fragments: vec!["Mock response".to_string()],
                error: None,
            })
    }
}

#[async_trait]
impl AIProvider for MockAIProvider {
    async fn stream_complete(&self, request: CompletionRequest) -> Result<FragmentStream, AIError> {
        lock(&self.calls).push(request);

        let (fragments, error) = match self.next_response() {
            MockResponse::Error(e) => return Err(e),
            MockResponse::Stream { fragments, error } => (fragments, error),
        };

        let tail = match error {
            Some(e) => Err(e),
            None => Ok(StreamChunk::final_chunk(FinishReason::Stop)),
        };

        let delay = self.fragment_delay;
        let items = fragments
            .into_iter()
            .map(|f| Ok(StreamChunk::content(f)))
            .chain(std::iter::once(tail));

        let stream = stream::iter(items).then(move |item| async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            item
        });

        Ok(Box::pin(stream))
    }

    fn provider_info(&self) -> ProviderInfo {
        self.info.clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
