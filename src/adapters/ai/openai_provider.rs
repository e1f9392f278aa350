//! OpenAI-compatible chat completions provider.
//!
//! Talks to any endpoint that speaks the `/chat/completions` streaming
//! protocol. The defaults point at OpenRouter.
//!
//! # Configuration
//!
//! ```ignore
//! let config = OpenAIConfig::new("sk-or-...")
//!     .with_model("openai/gpt-oss-120b")
//!     .with_timeout(Duration::from_secs(120));
//!
//! let provider = OpenAIProvider::new(config)?;
//! ```

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::AiConfig;
use crate::domain::conversation::Role;
use crate::ports::{
    AIError, AIProvider, CompletionRequest, FinishReason, FragmentStream, ProviderInfo,
    StreamChunk,
};

/// Configuration for the OpenAI-compatible provider.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    api_key: Secret<String>,
    /// Model identifier sent with every request.
    pub model: String,
    /// Base URL of the API, without the `/chat/completions` suffix.
    pub base_url: String,
    /// Timeout for the whole request, including the streamed body.
    pub timeout: Duration,
    /// Name reported through [`ProviderInfo`].
    pub provider_name: String,
}

impl OpenAIConfig {
    /// Creates a new config with the given API key and OpenRouter defaults.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            model: "openai/gpt-oss-120b".to_string(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            timeout: Duration::from_secs(120),
            provider_name: "openrouter".to_string(),
        }
    }

    /// Builds provider settings from application configuration.
    ///
    /// Returns `None` when no API key is configured.
    pub fn from_app_config(config: &AiConfig) -> Option<Self> {
        let key = config.api_key.as_ref()?.expose_secret().clone();
        if key.is_empty() {
            return None;
        }
        Some(
            Self::new(key)
                .with_model(&config.model)
                .with_base_url(&config.base_url)
                .with_timeout(config.timeout()),
        )
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the reported provider name.
    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = name.into();
        self
    }

    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// Streaming chat completions over HTTP.
pub struct OpenAIProvider {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIProvider {
    /// Creates a new provider with the given configuration.
    ///
    /// The configured timeout bounds connecting and waiting for response
    /// headers. Once the reply starts streaming it may take as long as the
    /// model needs.
    pub fn new(config: OpenAIConfig) -> Result<Self, AIError> {
        let client = Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| AIError::network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    /// Converts a completion request to the wire format. The system
    /// instruction always goes first.
    fn to_openai_request(&self, request: &CompletionRequest) -> OpenAIRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        if let Some(ref system) = request.system_prompt {
            messages.push(OpenAIMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }

        for msg in &request.messages {
            messages.push(OpenAIMessage {
                role: role_to_str(msg.role).to_string(),
                content: msg.content.clone(),
            });
        }

        OpenAIRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: true,
        }
    }

    async fn send_streaming_request(
        &self,
        request: &CompletionRequest,
    ) -> Result<Response, AIError> {
        let body = self.to_openai_request(request);

        let send = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key()))
            .header("Content-Type", "application/json")
            .json(&body)
            .send();

        match tokio::time::timeout(self.config.timeout, send).await {
            Ok(result) => result.map_err(|e| self.map_transport_error(e)),
            Err(_) => Err(self.timeout_error()),
        }
    }

    fn timeout_error(&self) -> AIError {
        AIError::Timeout {
            timeout_secs: self.config.timeout.as_secs() as u32,
        }
    }

    fn map_transport_error(&self, e: reqwest::Error) -> AIError {
        if e.is_timeout() {
            self.timeout_error()
        } else if e.is_connect() {
            AIError::network(format!("Connection failed: {}", e))
        } else {
            AIError::network(e.to_string())
        }
    }

    async fn handle_response_status(&self, response: Response) -> Result<Response, AIError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            401 | 403 => Err(AIError::AuthenticationFailed(error_body)),
            429 => Err(AIError::rate_limited(parse_retry_after(&error_body))),
            500..=599 => Err(AIError::unavailable(format!(
                "Server error {}: {}",
                status, error_body
            ))),
            _ => Err(AIError::network(format!(
                "Unexpected status {}: {}",
                status, error_body
            ))),
        }
    }
}

#[async_trait]
impl AIProvider for OpenAIProvider {
    async fn stream_complete(&self, request: CompletionRequest) -> Result<FragmentStream, AIError> {
        tracing::debug!(
            model = %self.config.model,
            conversation_id = %request.metadata.conversation_id,
            turns = request.messages.len(),
            "Starting streaming completion"
        );

        let response = self.send_streaming_request(&request).await?;
        let response = self.handle_response_status(response).await?;

        // `None` marks the end of the body so the buffer can flush its tail.
        let stream = response
            .bytes_stream()
            .map(Some)
            .chain(stream::once(futures::future::ready(None)))
            .scan(SseLineBuffer::default(), |buffer, chunk| {
                let items = match chunk {
                    Some(Ok(bytes)) => buffer.push(&bytes),
                    Some(Err(e)) => {
                        vec![Err(AIError::network(format!("Stream error: {}", e)))]
                    }
                    None => buffer.finish(),
                };
                futures::future::ready(Some(items))
            })
            .flat_map(stream::iter);

        Ok(Box::pin(stream))
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo::new(&self.config.provider_name, &self.config.model)
    }
}

fn role_to_str(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Extracts a "try again in Ns" hint from an error body.
fn parse_retry_after(error_body: &str) -> u32 {
    if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(error_body) {
        if let Some(s) = parsed
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            if let Some(idx) = s.find("try again in ") {
                let rest = &s[idx + 13..];
                let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
                if let Ok(secs) = digits.parse::<u32>() {
                    return secs;
                }
            }
        }
    }
    30
}

/// Reassembles SSE lines split across network chunks.
///
/// Bytes are held until a newline arrives, so multi-byte characters and
/// `data:` lines that straddle a chunk boundary are decoded whole.
#[derive(Debug, Default)]
struct SseLineBuffer {
    pending: Vec<u8>,
    /// Set once a `finish_reason` chunk or `[DONE]` has been seen.
    finished: bool,
}

impl SseLineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<Result<StreamChunk, AIError>> {
        self.pending.extend_from_slice(bytes);

        let mut results = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.take_line(&line, &mut results);
        }
        results
    }

    /// Called when the body ends. Parses an unterminated last line and
    /// reports a body that closed before the model said it was done.
    fn finish(&mut self) -> Vec<Result<StreamChunk, AIError>> {
        let mut results = Vec::new();
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.take_line(&line, &mut results);
        }
        if !self.finished {
            results.push(Err(AIError::network(
                "stream closed before the final chunk",
            )));
        }
        results
    }

    fn take_line(&mut self, raw: &[u8], results: &mut Vec<Result<StreamChunk, AIError>>) {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim_end_matches(['\r', '\n']);
        if is_done_marker(line) {
            self.finished = true;
            return;
        }
        for item in parse_sse_line(line) {
            if matches!(&item, Ok(chunk) if chunk.is_final()) {
                self.finished = true;
            }
            results.push(item);
        }
    }
}

fn is_done_marker(line: &str) -> bool {
    line.strip_prefix("data:")
        .map(|data| data.trim() == "[DONE]")
        .unwrap_or(false)
}

/// Parses one SSE line. Comments, blank lines and `[DONE]` yield nothing.
fn parse_sse_line(line: &str) -> Vec<Result<StreamChunk, AIError>> {
    let Some(data) = line.strip_prefix("data:") else {
        return Vec::new();
    };
    let data = data.trim_start();

    if data.is_empty() || data == "[DONE]" {
        return Vec::new();
    }

    let chunk = match serde_json::from_str::<StreamResponseChunk>(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            return vec![Err(AIError::parse(format!(
                "Failed to parse SSE chunk: {}",
                e
            )))]
        }
    };

    if let Some(error) = chunk.error {
        return vec![Err(AIError::unavailable(error.message))];
    }

    let mut results = Vec::new();
    if let Some(choice) = chunk.choices.first() {
        if let Some(ref content) = choice.delta.content {
            if !content.is_empty() {
                results.push(Ok(StreamChunk::content(content)));
            }
        }

        if let Some(ref reason) = choice.finish_reason {
            let finish = match reason.as_str() {
                "length" => FinishReason::Length,
                "content_filter" => FinishReason::ContentFilter,
                _ => FinishReason::Stop,
            };
            results.push(Ok(StreamChunk::final_chunk(finish)));
        }
    }
    results
}

// ----- Wire types -----

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct StreamResponseChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    error: Option<StreamError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    message: String,
}
