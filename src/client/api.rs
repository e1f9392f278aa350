//! HTTP client for the chat API.
//!
//! JSON endpoints return typed documents. Sending a message opens a
//! streaming body that [`read_reply`] drains into a [`Transcript`],
//! reporting the growing partial reply after every decoded chunk.

use std::pin::pin;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::{Stream, StreamExt};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::adapters::http::conversation::{
    ConversationDocument, ConversationSummaryView, CreateConversationRequest, MessageResponse,
    MessageView, RenameConversationRequest, SendMessageRequest,
};

use super::decoder::Utf8StreamDecoder;
use super::error::ClientError;
use super::transcript::Transcript;

const API_PREFIX: &str = "/api/chat";

/// Chat API client holding an optional bearer token.
///
/// Clones share the token, so clearing it after a 401 signs out every clone.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
}

impl ChatClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn with_token(self, token: impl Into<String>) -> Self {
        self.set_token(token);
        self
    }

    pub fn set_token(&self, token: impl Into<String>) {
        *self.write_token() = Some(token.into());
    }

    pub fn clear_token(&self) {
        *self.write_token() = None;
    }

    pub fn token(&self) -> Option<String> {
        self.read_token().clone()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Conversation endpoints
    // ════════════════════════════════════════════════════════════════════════════

    pub async fn list_conversations(&self) -> Result<Vec<ConversationSummaryView>, ClientError> {
        self.json(self.http.get(self.url("/conversations"))).await
    }

    pub async fn get_conversation(&self, id: &str) -> Result<ConversationDocument, ClientError> {
        self.json(self.http.get(self.url(&format!("/conversations/{}", id))))
            .await
    }

    pub async fn create_conversation(
        &self,
        title: &str,
    ) -> Result<ConversationDocument, ClientError> {
        let body = CreateConversationRequest {
            title: title.to_string(),
        };
        self.json(self.http.post(self.url("/conversations")).json(&body))
            .await
    }

    pub async fn rename_conversation(
        &self,
        id: &str,
        title: &str,
    ) -> Result<ConversationDocument, ClientError> {
        let body = RenameConversationRequest {
            title: title.to_string(),
        };
        self.json(
            self.http
                .put(self.url(&format!("/conversations/{}", id)))
                .json(&body),
        )
        .await
    }

    pub async fn delete_conversation(&self, id: &str) -> Result<MessageResponse, ClientError> {
        self.json(self.http.delete(self.url(&format!("/conversations/{}", id))))
            .await
    }

    /// Sends `text` and streams the reply into `transcript`.
    ///
    /// `on_progress` sees the whole partial reply after each chunk. A refusal
    /// before streaming removes the optimistic user turn; a broken stream
    /// keeps it and drops only the partial reply.
    pub async fn send_message<F>(
        &self,
        conversation_id: &str,
        transcript: &mut Transcript,
        text: &str,
        on_progress: F,
    ) -> Result<MessageView, ClientError>
    where
        F: FnMut(&str),
    {
        let text = transcript.begin_send(text)?;

        let request = self
            .http
            .post(self.url(&format!("/conversations/{}/messages", conversation_id)))
            .json(&SendMessageRequest { message: text });

        let response = match self.send(request).await {
            Ok(response) => response,
            Err(e) => {
                transcript.reject();
                return Err(e);
            }
        };

        read_reply(response.bytes_stream(), transcript, on_progress).await
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Plumbing
    // ════════════════════════════════════════════════════════════════════════════

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        Ok(self.send(request).await?.json().await?)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let request = match self.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::debug!("session rejected, clearing token");
            self.clear_token();
            return Err(ClientError::Unauthenticated);
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from));
            return Err(ClientError::from_status(status, message));
        }

        Ok(response)
    }

    fn read_token(&self) -> RwLockReadGuard<'_, Option<String>> {
        self.token.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_token(&self) -> RwLockWriteGuard<'_, Option<String>> {
        self.token.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Drains a reply body into `transcript`.
///
/// Chunks are decoded incrementally, so characters split across chunks
/// arrive intact. A read error, or a body that closes without any text,
/// counts as a failed send.
pub async fn read_reply<S, B, E, F>(
    body: S,
    transcript: &mut Transcript,
    mut on_progress: F,
) -> Result<MessageView, ClientError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
    F: FnMut(&str),
{
    let mut body = pin!(body);
    let mut decoder = Utf8StreamDecoder::new();

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                transcript.fail();
                return Err(ClientError::StreamInterrupted(e.to_string()));
            }
        };

        let text = decoder.decode(chunk.as_ref());
        if !text.is_empty() {
            on_progress(transcript.apply_chunk(&text));
        }
    }

    let tail = decoder.finish();
    if !tail.is_empty() {
        on_progress(transcript.apply_chunk(&tail));
    }

    if transcript.streaming_text().map_or(true, str::is_empty) {
        transcript.fail();
        return Err(ClientError::StreamInterrupted(
            "connection closed without a reply".to_string(),
        ));
    }

    transcript
        .finish()
        .cloned()
        .ok_or_else(|| ClientError::StreamInterrupted("no send in progress".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::Role;
    use futures::stream;

    type Chunk = Result<Vec<u8>, String>;

    fn chunks(parts: &[&str]) -> Vec<Chunk> {
        parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect()
    }

    mod reading {
        use super::*;

        #[tokio::test]
        async fn progress_shows_growing_reply() {
            let mut transcript = Transcript::new();
            transcript.begin_send("What is CTR?").unwrap();
            let mut seen = Vec::new();

            let reply = read_reply(
                stream::iter(chunks(&["Click", "-through rate", " is..."])),
                &mut transcript,
                |partial| seen.push(partial.to_string()),
            )
            .await
            .unwrap();

            assert_eq!(
                seen,
                vec!["Click", "Click-through rate", "Click-through rate is..."]
            );
            assert_eq!(reply.role, Role::Assistant);
            assert_eq!(reply.content, "Click-through rate is...");
            assert_eq!(transcript.messages().len(), 2);
            assert!(!transcript.is_streaming());
        }

        #[tokio::test]
        async fn split_character_is_not_shown_half_decoded() {
            let bytes = "café".as_bytes();
            let (head, tail) = bytes.split_at(bytes.len() - 1);
            let body: Vec<Chunk> = vec![Ok(head.to_vec()), Ok(tail.to_vec())];

            let mut transcript = Transcript::new();
            transcript.begin_send("hi").unwrap();
            let mut seen = Vec::new();

            read_reply(stream::iter(body), &mut transcript, |p| {
                seen.push(p.to_string())
            })
            .await
            .unwrap();

            assert_eq!(seen, vec!["caf", "café"]);
        }

        #[tokio::test]
        async fn read_error_drops_partial_reply() {
            let body: Vec<Chunk> = vec![Ok(b"Click".to_vec()), Err("reset".to_string())];
            let mut transcript = Transcript::new();
            transcript.begin_send("What is CTR?").unwrap();

            let err = read_reply(stream::iter(body), &mut transcript, |_| {})
                .await
                .unwrap_err();

            assert!(matches!(err, ClientError::StreamInterrupted(_)));
            assert!(!transcript.is_streaming());
            assert_eq!(transcript.messages().len(), 1);
        }

        #[tokio::test]
        async fn empty_body_counts_as_failure() {
            let mut transcript = Transcript::new();
            transcript.begin_send("hello").unwrap();

            let result =
                read_reply(stream::iter(Vec::<Chunk>::new()), &mut transcript, |_| {}).await;

            assert!(result.is_err());
            assert!(!transcript.is_streaming());
        }
    }

    mod tokens {
        use super::*;

        #[test]
        fn clones_share_the_token() {
            let client = ChatClient::new("http://localhost:5000/")
                .unwrap()
                .with_token("abc");
            let clone = client.clone();

            clone.clear_token();

            assert_eq!(client.token(), None);
        }

        #[test]
        fn urls_are_rooted_at_chat_api() {
            let client = ChatClient::new("http://localhost:5000/").unwrap();
            assert_eq!(
                client.url("/conversations"),
                "http://localhost:5000/api/chat/conversations"
            );
        }
    }
}
