//! Streaming message handler.
//!
//! Takes one send from raw text to a persisted assistant turn: loads the
//! conversation, appends the user turn in memory, streams the model's
//! fragments to a [`FragmentSink`] while accumulating them, then commits
//! user and assistant turns together in a single append.
//!
//! The work is split so callers can reject a request with a proper status
//! before any response bytes go out:
//!
//! - [`StreamMessageHandler::prepare`] validates, claims and loads the
//!   conversation (400 / 404 / 409 territory).
//! - [`PreparedSend::stream_to`] generates, relays and persists. Nothing it
//!   does can change the response status any more.

use futures::StreamExt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::in_flight::{InFlightPermit, InFlightRegistry};
use crate::config::AiConfig;
use crate::domain::conversation::{project_history, Message, FALLBACK_REPLY};
use crate::domain::foundation::{ConversationId, DomainError, UserId, ValidationError};
use crate::ports::{
    AIError, AIProvider, CompletionRequest, ConversationStore, FragmentSink, RequestMetadata,
};

/// Command to send a message and stream the reply.
#[derive(Debug, Clone)]
pub struct StreamMessageCommand {
    pub user_id: UserId,
    pub conversation_id: ConversationId,
    /// Raw text as submitted; trimmed before validation.
    pub content: String,
}

impl StreamMessageCommand {
    pub fn new(
        user_id: UserId,
        conversation_id: ConversationId,
        content: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            conversation_id,
            content: content.into(),
        }
    }
}

/// Errors that can occur during message handling.
#[derive(Debug, Clone, Error)]
pub enum StreamMessageError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Conversation not found")]
    ConversationNotFound,

    #[error("A response is already being generated for this conversation")]
    SendInProgress,

    #[error("Store error: {0}")]
    Store(DomainError),
}

impl From<DomainError> for StreamMessageError {
    fn from(err: DomainError) -> Self {
        if err.is_not_found() {
            StreamMessageError::ConversationNotFound
        } else {
            StreamMessageError::Store(err)
        }
    }
}

/// What a finished send produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    /// Exactly what was written to the sink and persisted as the assistant turn.
    pub assistant_content: String,
    /// Model fragments relayed, not counting the fallback.
    pub fragments: usize,
    /// False when the model failed and the fallback was appended.
    pub completed: bool,
}

/// Model parameters applied to every send.
#[derive(Debug, Clone)]
pub struct StreamingHandlerConfig {
    pub system_prompt: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl StreamingHandlerConfig {
    pub fn from_ai_config(config: &AiConfig) -> Self {
        Self {
            system_prompt: config.system_prompt().to_string(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

impl Default for StreamingHandlerConfig {
    fn default() -> Self {
        Self::from_ai_config(&AiConfig::default())
    }
}

/// Handler for streaming message interactions.
pub struct StreamMessageHandler {
    store: Arc<dyn ConversationStore>,
    ai_provider: Arc<dyn AIProvider>,
    config: StreamingHandlerConfig,
    in_flight: Arc<InFlightRegistry>,
}

impl StreamMessageHandler {
    pub fn new(store: Arc<dyn ConversationStore>, ai_provider: Arc<dyn AIProvider>) -> Self {
        Self::with_config(store, ai_provider, StreamingHandlerConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn ConversationStore>,
        ai_provider: Arc<dyn AIProvider>,
        config: StreamingHandlerConfig,
    ) -> Self {
        Self {
            store,
            ai_provider,
            config,
            in_flight: InFlightRegistry::new(),
        }
    }

    /// Conversations that currently have a send generating.
    pub fn in_flight(&self) -> &Arc<InFlightRegistry> {
        &self.in_flight
    }

    /// Validates the command, claims the conversation and loads it.
    ///
    /// No side effects happen here beyond the in-flight claim, which is
    /// released if the returned value is dropped.
    ///
    /// The claim is taken before the load so the history the model sees
    /// already includes every committed send. A failed load still wins over
    /// a busy conversation: unknown ids report not found, never 409.
    pub async fn prepare(&self, cmd: StreamMessageCommand) -> Result<PreparedSend, StreamMessageError> {
        let user_turn = Message::user(&cmd.content)?;

        let permit = self.in_flight.try_acquire(cmd.conversation_id);

        let mut conversation = self.store.get(&cmd.user_id, &cmd.conversation_id).await?;

        let permit = permit.ok_or(StreamMessageError::SendInProgress)?;
        tracing::debug!(
            conversation_id = %cmd.conversation_id,
            history = conversation.messages().len(),
            in_flight = self.in_flight.active_count(),
            "Send claimed"
        );

        // The new turn joins the in-memory transcript only; it is persisted
        // together with the reply.
        conversation.append(std::slice::from_ref(&user_turn), user_turn.timestamp());

        let request = CompletionRequest::new(RequestMetadata::new(
            cmd.user_id.clone(),
            cmd.conversation_id,
            Uuid::new_v4().to_string(),
        ))
        .with_messages(project_history(conversation.messages()))
        .with_system_prompt(&self.config.system_prompt);

        let request = match (self.config.max_tokens, self.config.temperature) {
            (Some(max), Some(t)) => request.with_max_tokens(max).with_temperature(t),
            (Some(max), None) => request.with_max_tokens(max),
            (None, Some(t)) => request.with_temperature(t),
            (None, None) => request,
        };

        Ok(PreparedSend {
            store: Arc::clone(&self.store),
            ai_provider: Arc::clone(&self.ai_provider),
            user_id: cmd.user_id,
            conversation_id: cmd.conversation_id,
            user_turn,
            request,
            _permit: permit,
        })
    }

    /// Prepares and runs a send to completion.
    pub async fn handle(
        &self,
        cmd: StreamMessageCommand,
        sink: &dyn FragmentSink,
    ) -> Result<SendOutcome, StreamMessageError> {
        self.prepare(cmd).await?.stream_to(sink).await
    }
}

/// A validated send holding its conversation's in-flight permit.
pub struct PreparedSend {
    store: Arc<dyn ConversationStore>,
    ai_provider: Arc<dyn AIProvider>,
    user_id: UserId,
    conversation_id: ConversationId,
    user_turn: Message,
    request: CompletionRequest,
    _permit: InFlightPermit,
}

impl PreparedSend {
    /// Runs generation, relays fragments to `sink` and persists both turns.
    ///
    /// A model failure is not an error: the fallback reply is relayed and
    /// persisted after whatever fragments already went out. Only a failed
    /// commit returns `Err`, after aborting the sink.
    pub async fn stream_to(self, sink: &dyn FragmentSink) -> Result<SendOutcome, StreamMessageError> {
        let conversation_id = self.conversation_id;
        let mut buffer = String::new();
        let mut fragments = 0usize;
        let mut client_gone = false;

        let failure = match self.ai_provider.stream_complete(self.request).await {
            Err(e) => Some(e),
            Ok(mut stream) => {
                let mut failure = None;
                while let Some(item) = stream.next().await {
                    match item {
                        Ok(chunk) => {
                            if !chunk.delta.is_empty() {
                                buffer.push_str(&chunk.delta);
                                fragments += 1;
                                relay(sink, &chunk.delta, &mut client_gone, conversation_id).await;
                            }
                            if chunk.is_final() {
                                break;
                            }
                        }
                        Err(e) => {
                            failure = Some(e);
                            break;
                        }
                    }
                }
                if failure.is_none() && fragments == 0 {
                    failure = Some(AIError::unavailable("model returned an empty response"));
                }
                failure
            }
        };

        let completed = failure.is_none();
        if let Some(e) = failure {
            tracing::warn!(
                conversation_id = %conversation_id,
                fragments,
                retryable = e.is_retryable(),
                error = %e,
                "Generation failed, sending fallback reply"
            );
            buffer.push_str(FALLBACK_REPLY);
            relay(sink, FALLBACK_REPLY, &mut client_gone, conversation_id).await;
        }

        let assistant_turn = Message::assistant(buffer.clone());
        let last_message_at = assistant_turn.timestamp();

        if let Err(e) = self
            .store
            .append_and_persist(
                &self.user_id,
                &conversation_id,
                &[self.user_turn, assistant_turn],
                last_message_at,
            )
            .await
        {
            tracing::error!(
                conversation_id = %conversation_id,
                error = %e,
                "Failed to persist turns after streaming"
            );
            sink.abort("failed to persist conversation").await;
            return Err(e.into());
        }

        tracing::info!(
            conversation_id = %conversation_id,
            user_id = %self.user_id,
            fragments,
            completed,
            "Assistant turn persisted"
        );

        Ok(SendOutcome {
            assistant_content: buffer,
            fragments,
            completed,
        })
    }
}

async fn relay(
    sink: &dyn FragmentSink,
    fragment: &str,
    client_gone: &mut bool,
    conversation_id: ConversationId,
) {
    if *client_gone {
        return;
    }
    if sink.emit(fragment).await.is_err() {
        tracing::debug!(
            conversation_id = %conversation_id,
            "Client disconnected, continuing without relaying"
        );
        *client_gone = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockAIProvider;
    use crate::adapters::conversation_store::InMemoryConversationStore;
    use crate::domain::conversation::{Conversation, Role, DEFAULT_SYSTEM_PROMPT};
    use crate::domain::foundation::Timestamp;
    use crate::ports::SinkClosed;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::oneshot;

    // ════════════════════════════════════════════════════════════════════════
    // Test fixtures
    // ════════════════════════════════════════════════════════════════════════

    #[derive(Default)]
    struct RecordingSink {
        fragments: Mutex<Vec<String>>,
        aborted: Mutex<Option<String>>,
        closed: bool,
    }

    impl RecordingSink {
        fn closed() -> Self {
            Self {
                closed: true,
                ..Default::default()
            }
        }

        fn fragments(&self) -> Vec<String> {
            self.fragments.lock().unwrap().clone()
        }

        fn text(&self) -> String {
            self.fragments().concat()
        }
    }

    #[async_trait]
    impl FragmentSink for RecordingSink {
        async fn emit(&self, fragment: &str) -> Result<(), SinkClosed> {
            if self.closed {
                return Err(SinkClosed);
            }
            self.fragments.lock().unwrap().push(fragment.to_string());
            Ok(())
        }

        async fn abort(&self, reason: &str) {
            *self.aborted.lock().unwrap() = Some(reason.to_string());
        }
    }

    /// Store whose appends always fail.
    struct FailingAppendStore {
        inner: InMemoryConversationStore,
    }

    #[async_trait]
    impl ConversationStore for FailingAppendStore {
        async fn list_summaries(
            &self,
            user_id: &UserId,
        ) -> Result<Vec<crate::domain::conversation::ConversationSummary>, DomainError> {
            self.inner.list_summaries(user_id).await
        }

        async fn get(
            &self,
            user_id: &UserId,
            id: &ConversationId,
        ) -> Result<Conversation, DomainError> {
            self.inner.get(user_id, id).await
        }

        async fn create(&self, user_id: &UserId, title: &str) -> Result<Conversation, DomainError> {
            self.inner.create(user_id, title).await
        }

        async fn append_and_persist(
            &self,
            _user_id: &UserId,
            _id: &ConversationId,
            _messages: &[Message],
            _last_message_at: Timestamp,
        ) -> Result<(), DomainError> {
            Err(DomainError::database("disk full"))
        }

        async fn rename(
            &self,
            user_id: &UserId,
            id: &ConversationId,
            title: &str,
        ) -> Result<Conversation, DomainError> {
            self.inner.rename(user_id, id, title).await
        }

        async fn delete(&self, user_id: &UserId, id: &ConversationId) -> Result<(), DomainError> {
            self.inner.delete(user_id, id).await
        }
    }

    /// Store whose next `get` reads, signals `loaded`, then waits for `resume`.
    struct PausingGetStore {
        inner: InMemoryConversationStore,
        pause: Mutex<Option<(oneshot::Sender<()>, oneshot::Receiver<()>)>>,
    }

    impl PausingGetStore {
        fn new(inner: InMemoryConversationStore) -> Self {
            Self {
                inner,
                pause: Mutex::new(None),
            }
        }

        /// Arms a pause for the next `get`. Returns (loaded, resume).
        fn pause_next_get(&self) -> (oneshot::Receiver<()>, oneshot::Sender<()>) {
            let (loaded_tx, loaded_rx) = oneshot::channel();
            let (resume_tx, resume_rx) = oneshot::channel();
            *self.pause.lock().unwrap() = Some((loaded_tx, resume_rx));
            (loaded_rx, resume_tx)
        }
    }

    #[async_trait]
    impl ConversationStore for PausingGetStore {
        async fn list_summaries(
            &self,
            user_id: &UserId,
        ) -> Result<Vec<crate::domain::conversation::ConversationSummary>, DomainError> {
            self.inner.list_summaries(user_id).await
        }

        async fn get(
            &self,
            user_id: &UserId,
            id: &ConversationId,
        ) -> Result<Conversation, DomainError> {
            let conversation = self.inner.get(user_id, id).await;
            let pause = self.pause.lock().unwrap().take();
            if let Some((loaded, resume)) = pause {
                let _ = loaded.send(());
                let _ = resume.await;
            }
            conversation
        }

        async fn create(&self, user_id: &UserId, title: &str) -> Result<Conversation, DomainError> {
            self.inner.create(user_id, title).await
        }

        async fn append_and_persist(
            &self,
            user_id: &UserId,
            id: &ConversationId,
            messages: &[Message],
            last_message_at: Timestamp,
        ) -> Result<(), DomainError> {
            self.inner
                .append_and_persist(user_id, id, messages, last_message_at)
                .await
        }

        async fn rename(
            &self,
            user_id: &UserId,
            id: &ConversationId,
            title: &str,
        ) -> Result<Conversation, DomainError> {
            self.inner.rename(user_id, id, title).await
        }

        async fn delete(&self, user_id: &UserId, id: &ConversationId) -> Result<(), DomainError> {
            self.inner.delete(user_id, id).await
        }
    }

    fn alice() -> UserId {
        UserId::new("alice").unwrap()
    }

    fn bob() -> UserId {
        UserId::new("bob").unwrap()
    }

    async fn setup(
        provider: MockAIProvider,
    ) -> (
        StreamMessageHandler,
        InMemoryConversationStore,
        MockAIProvider,
        ConversationId,
    ) {
        let store = InMemoryConversationStore::new();
        let conversation = store.create(&alice(), "New Conversation").await.unwrap();
        let handler = StreamMessageHandler::new(Arc::new(store.clone()), Arc::new(provider.clone()));
        (handler, store, provider, conversation.id())
    }

    // ════════════════════════════════════════════════════════════════════════
    // Successful generation
    // ════════════════════════════════════════════════════════════════════════

    mod success {
        use super::*;

        #[tokio::test]
        async fn relays_fragments_in_order_and_persists_both_turns() {
            let provider =
                MockAIProvider::new().with_fragments(["Click", "-through rate", " is..."]);
            let (handler, store, _, id) = setup(provider).await;
            let before = store.get(&alice(), &id).await.unwrap().last_message_at();
            let sink = RecordingSink::default();

            let outcome = handler
                .handle(StreamMessageCommand::new(alice(), id, "What is CTR?"), &sink)
                .await
                .unwrap();

            assert_eq!(sink.fragments(), vec!["Click", "-through rate", " is..."]);
            assert_eq!(outcome.assistant_content, "Click-through rate is...");
            assert_eq!(outcome.fragments, 3);
            assert!(outcome.completed);

            let conversation = store.get(&alice(), &id).await.unwrap();
            let messages = conversation.messages();
            assert_eq!(messages.len(), 2);
            assert_eq!(messages[0].role(), Role::User);
            assert_eq!(messages[0].content(), "What is CTR?");
            assert_eq!(messages[1].role(), Role::Assistant);
            assert_eq!(messages[1].content(), sink.text());
            assert!(conversation.last_message_at() >= before);
        }

        #[tokio::test]
        async fn model_sees_full_history_and_persona() {
            let provider = MockAIProvider::new()
                .with_response("first answer")
                .with_response("second answer");
            let (handler, _, provider, id) = setup(provider).await;
            let sink = RecordingSink::default();

            handler
                .handle(StreamMessageCommand::new(alice(), id, "first"), &sink)
                .await
                .unwrap();
            handler
                .handle(StreamMessageCommand::new(alice(), id, "second"), &sink)
                .await
                .unwrap();

            let calls = provider.get_calls();
            let history: Vec<_> = calls[1]
                .messages
                .iter()
                .map(|m| (m.role, m.content.as_str()))
                .collect();
            assert_eq!(
                history,
                vec![
                    (Role::User, "first"),
                    (Role::Assistant, "first answer"),
                    (Role::User, "second"),
                ]
            );
            assert_eq!(calls[1].system_prompt.as_deref(), Some(DEFAULT_SYSTEM_PROMPT));
        }

        #[tokio::test]
        async fn content_is_trimmed_before_persisting() {
            let (handler, store, _, id) = setup(MockAIProvider::new()).await;
            handler
                .handle(
                    StreamMessageCommand::new(alice(), id, "  hello  "),
                    &RecordingSink::default(),
                )
                .await
                .unwrap();

            let conversation = store.get(&alice(), &id).await.unwrap();
            assert_eq!(conversation.messages()[0].content(), "hello");
        }

        #[tokio::test]
        async fn disconnected_client_does_not_stop_persistence() {
            let provider = MockAIProvider::new().with_fragments(["a", "b"]);
            let (handler, store, _, id) = setup(provider).await;

            let outcome = handler
                .handle(StreamMessageCommand::new(alice(), id, "hi"), &RecordingSink::closed())
                .await
                .unwrap();

            assert_eq!(outcome.assistant_content, "ab");
            let conversation = store.get(&alice(), &id).await.unwrap();
            assert_eq!(conversation.messages()[1].content(), "ab");
        }

        #[tokio::test]
        async fn permit_is_released_after_send() {
            let (handler, _, _, id) = setup(MockAIProvider::new()).await;
            handler
                .handle(StreamMessageCommand::new(alice(), id, "hi"), &RecordingSink::default())
                .await
                .unwrap();

            assert!(!handler.in_flight().is_active(&id));
        }
    }

    // ════════════════════════════════════════════════════════════════════════
    // Rejections before streaming
    // ════════════════════════════════════════════════════════════════════════

    mod rejections {
        use super::*;

        #[tokio::test]
        async fn blank_text_is_a_validation_error_with_no_side_effects() {
            let (handler, store, provider, id) = setup(MockAIProvider::new()).await;

            let result = handler.prepare(StreamMessageCommand::new(alice(), id, "   ")).await;

            assert!(matches!(result, Err(StreamMessageError::Validation(_))));
            assert_eq!(provider.call_count(), 0);
            assert!(store.get(&alice(), &id).await.unwrap().messages().is_empty());
        }

        #[tokio::test]
        async fn missing_conversation_is_not_found() {
            let (handler, _, provider, _) = setup(MockAIProvider::new()).await;

            let result = handler
                .prepare(StreamMessageCommand::new(alice(), ConversationId::new(), "hi"))
                .await;

            assert!(matches!(result, Err(StreamMessageError::ConversationNotFound)));
            assert_eq!(provider.call_count(), 0);
        }

        #[tokio::test]
        async fn foreign_conversation_is_not_found_and_unchanged() {
            let (handler, store, _, id) = setup(MockAIProvider::new()).await;

            let result = handler
                .prepare(StreamMessageCommand::new(bob(), id, "hi"))
                .await;

            assert!(matches!(result, Err(StreamMessageError::ConversationNotFound)));
            assert!(store.get(&alice(), &id).await.unwrap().messages().is_empty());
        }

        #[tokio::test]
        async fn concurrent_send_is_rejected_while_first_is_prepared() {
            let (handler, _, _, id) = setup(MockAIProvider::new()).await;

            let first = handler
                .prepare(StreamMessageCommand::new(alice(), id, "one"))
                .await
                .unwrap();
            let second = handler
                .prepare(StreamMessageCommand::new(alice(), id, "two"))
                .await;
            assert!(matches!(second, Err(StreamMessageError::SendInProgress)));

            first.stream_to(&RecordingSink::default()).await.unwrap();
            assert!(handler
                .prepare(StreamMessageCommand::new(alice(), id, "three"))
                .await
                .is_ok());
        }

        #[tokio::test]
        async fn send_arriving_during_history_load_is_rejected() {
            let inner = InMemoryConversationStore::new();
            let id = inner.create(&alice(), "t").await.unwrap().id();
            let store = Arc::new(PausingGetStore::new(inner.clone()));
            let provider = MockAIProvider::new().with_response("reply");
            let handler = Arc::new(StreamMessageHandler::new(
                store.clone(),
                Arc::new(provider.clone()),
            ));

            let (loaded, resume) = store.pause_next_get();
            let first = {
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    handler
                        .handle(
                            StreamMessageCommand::new(alice(), id, "first"),
                            &RecordingSink::default(),
                        )
                        .await
                })
            };
            loaded.await.unwrap();

            let second = handler
                .handle(StreamMessageCommand::new(alice(), id, "second"), &RecordingSink::default())
                .await;
            assert!(matches!(second, Err(StreamMessageError::SendInProgress)));

            resume.send(()).unwrap();
            first.await.unwrap().unwrap();

            let stored: Vec<String> = inner
                .get(&alice(), &id)
                .await
                .unwrap()
                .messages()
                .iter()
                .map(|m| m.content().to_string())
                .collect();
            assert_eq!(stored, vec!["first", "reply"]);
            assert_eq!(provider.call_count(), 1);
        }

        #[tokio::test]
        async fn unknown_conversation_is_not_found_even_when_busy() {
            let (handler, _, _, id) = setup(MockAIProvider::new()).await;
            let _held = handler
                .prepare(StreamMessageCommand::new(alice(), id, "one"))
                .await
                .unwrap();

            let result = handler
                .prepare(StreamMessageCommand::new(bob(), id, "two"))
                .await;

            assert!(matches!(result, Err(StreamMessageError::ConversationNotFound)));
            assert!(handler.in_flight().is_active(&id));
        }

        #[tokio::test]
        async fn concurrent_send_is_rejected_while_first_is_streaming() {
            let provider = MockAIProvider::new()
                .with_fragments(["slow", " reply"])
                .with_fragment_delay(Duration::from_millis(50));
            let (handler, store, _, id) = setup(provider).await;
            let handler = Arc::new(handler);

            let first = handler
                .prepare(StreamMessageCommand::new(alice(), id, "one"))
                .await
                .unwrap();
            let task = tokio::spawn(async move {
                first.stream_to(&RecordingSink::default()).await
            });

            let second = handler
                .handle(StreamMessageCommand::new(alice(), id, "two"), &RecordingSink::default())
                .await;
            assert!(matches!(second, Err(StreamMessageError::SendInProgress)));

            task.await.unwrap().unwrap();
            assert_eq!(store.get(&alice(), &id).await.unwrap().messages().len(), 2);
        }
    }

    // ════════════════════════════════════════════════════════════════════════
    // Generation failure
    // ════════════════════════════════════════════════════════════════════════

    mod failures {
        use super::*;

        #[tokio::test]
        async fn failure_before_first_fragment_sends_and_persists_fallback() {
            let provider = MockAIProvider::new().with_error(AIError::unavailable("down"));
            let (handler, store, _, id) = setup(provider).await;
            let sink = RecordingSink::default();

            let outcome = handler
                .handle(StreamMessageCommand::new(alice(), id, "hello"), &sink)
                .await
                .unwrap();

            assert_eq!(sink.fragments(), vec![FALLBACK_REPLY]);
            assert!(!outcome.completed);
            assert_eq!(outcome.fragments, 0);

            let messages = store.get(&alice(), &id).await.unwrap().messages().to_vec();
            assert_eq!(messages.len(), 2);
            assert_eq!(messages[0].content(), "hello");
            assert_eq!(messages[1].content(), FALLBACK_REPLY);
        }

        #[tokio::test]
        async fn failure_after_fragments_appends_fallback_to_partial_text() {
            let provider = MockAIProvider::new()
                .failing_after(["Click", "-through"], AIError::network("reset"));
            let (handler, store, _, id) = setup(provider).await;
            let sink = RecordingSink::default();

            let outcome = handler
                .handle(StreamMessageCommand::new(alice(), id, "What is CTR?"), &sink)
                .await
                .unwrap();

            assert_eq!(sink.fragments(), vec!["Click", "-through", FALLBACK_REPLY]);
            assert_eq!(outcome.fragments, 2);

            let messages = store.get(&alice(), &id).await.unwrap().messages().to_vec();
            assert_eq!(messages[1].content(), sink.text());
        }

        #[tokio::test]
        async fn empty_generation_is_treated_as_failure() {
            let provider = MockAIProvider::new().with_fragments(Vec::<String>::new());
            let (handler, _, _, id) = setup(provider).await;
            let sink = RecordingSink::default();

            let outcome = handler
                .handle(StreamMessageCommand::new(alice(), id, "hi"), &sink)
                .await
                .unwrap();

            assert!(!outcome.completed);
            assert_eq!(sink.text(), FALLBACK_REPLY);
        }

        #[tokio::test]
        async fn persistence_failure_aborts_sink_and_releases_permit() {
            let inner = InMemoryConversationStore::new();
            let id = inner.create(&alice(), "t").await.unwrap().id();
            let handler = StreamMessageHandler::new(
                Arc::new(FailingAppendStore { inner }),
                Arc::new(MockAIProvider::new().with_response("answer")),
            );
            let sink = RecordingSink::default();

            let result = handler
                .handle(StreamMessageCommand::new(alice(), id, "hi"), &sink)
                .await;

            assert!(matches!(result, Err(StreamMessageError::Store(_))));
            assert_eq!(sink.text(), "answer");
            assert!(sink.aborted.lock().unwrap().is_some());
            assert!(!handler.in_flight().is_active(&id));
        }
    }
}
