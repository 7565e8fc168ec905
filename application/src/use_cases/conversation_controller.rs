//! Conversation controller use case.
//!
//! Executes one inbound request against one conversation:
//!
//! - `ClearHistory` / `SwitchModel` touch session state directly and never
//!   wait for the busy gate.
//! - Chat requests take the busy gate (try-acquire, never queue), append the
//!   user turn, stream the backend answer through a [`StreamThrottler`] and
//!   record the assistant turn.
//! - Image requests go through the [`ImagePipeline`] under the same gate.
//!
//! Failures of the backend (error event, timeout, shutdown) are always
//! turned into exactly one user-visible message before the error is
//! returned to the caller.

use crate::config::RelayParams;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::generative_backend::{BackendError, GenerativeBackend};
use crate::ports::image_pipeline::{ImageError, ImagePipeline};
use crate::ports::messaging::{MessagingClient, TransportError};
use crate::session_registry::{BusyGuard, SessionRegistry};
use crate::throttle::{StreamSummary, StreamThrottler};
use relay_domain::util::truncate_chars;
use relay_domain::{
    ConversationId, DomainError, MediaRef, ModelChoice, ModelConfig, Role, StreamEvent, Turn,
    UserInput,
};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How a request should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// Answer with the conversation's selected model.
    Chat,
    /// Answer with the secondary model, leaving the selection unchanged.
    ChatSecondary,
    ClearHistory,
    SwitchModel,
}

/// What a successfully handled request did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    HistoryCleared,
    /// The conversation now uses this model.
    ModelSwitched(ModelChoice),
    /// A streamed answer was delivered.
    Answered(StreamSummary),
    /// An image was delivered.
    ImageSent(MediaRef),
}

/// Errors that can occur while handling a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// Another chat request is in flight for this conversation.
    #[error("Conversation is busy")]
    ConversationBusy,

    #[error("Empty input")]
    EmptyInput,

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Request timed out")]
    Timeout,

    #[error("Request cancelled")]
    Cancelled,

    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl From<DomainError> for RequestError {
    fn from(_: DomainError) -> Self {
        RequestError::EmptyInput
    }
}

/// Use case handling requests for every conversation.
///
/// One instance is shared (behind an `Arc`) by all request tasks.
pub struct ConversationController {
    registry: Arc<SessionRegistry>,
    backend: Arc<dyn GenerativeBackend>,
    messenger: Arc<dyn MessagingClient>,
    images: Arc<dyn ImagePipeline>,
    conversation_logger: Arc<dyn ConversationLogger>,
    models: ModelConfig,
    params: RelayParams,
    cancellation: CancellationToken,
}

impl ConversationController {
    pub fn new(
        registry: Arc<SessionRegistry>,
        backend: Arc<dyn GenerativeBackend>,
        messenger: Arc<dyn MessagingClient>,
        images: Arc<dyn ImagePipeline>,
        models: ModelConfig,
        params: RelayParams,
    ) -> Self {
        Self {
            registry,
            backend,
            messenger,
            images,
            conversation_logger: Arc::new(NoConversationLogger),
            models,
            params,
            cancellation: CancellationToken::new(),
        }
    }

    /// Create with a conversation logger.
    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    /// Set a cancellation token; in-flight streams stop when it fires.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn models(&self) -> &ModelConfig {
        &self.models
    }

    /// Handle one text request.
    pub async fn handle_request(
        &self,
        conversation_id: ConversationId,
        input: &str,
        mode: RequestMode,
    ) -> Result<RequestOutcome, RequestError> {
        match mode {
            RequestMode::ClearHistory => {
                self.registry.clear_history(conversation_id);
                info!("Cleared history of conversation {}", conversation_id);
                self.log_event("history_cleared", conversation_id, json!({}));
                Ok(RequestOutcome::HistoryCleared)
            }
            RequestMode::SwitchModel => {
                let model = self.registry.toggle_model(conversation_id);
                info!(
                    "Conversation {} switched to {} ({})",
                    conversation_id,
                    model,
                    self.models.resolve(model)
                );
                self.log_event(
                    "model_switched",
                    conversation_id,
                    json!({ "model": model.as_str(), "name": self.models.resolve(model) }),
                );
                Ok(RequestOutcome::ModelSwitched(model))
            }
            RequestMode::Chat | RequestMode::ChatSecondary => {
                let input = UserInput::try_new(input)?;
                let guard = self.acquire(conversation_id)?;

                let choice = match mode {
                    RequestMode::ChatSecondary => ModelChoice::Secondary,
                    _ => guard.session().model(),
                };
                self.run_chat(&guard, input, choice).await
            }
        }
    }

    /// Generate an image from `prompt`, or edit the image behind `source`.
    pub async fn handle_image(
        &self,
        conversation_id: ConversationId,
        prompt: &str,
        source: Option<MediaRef>,
    ) -> Result<RequestOutcome, RequestError> {
        let prompt = UserInput::try_new(prompt)?;
        let guard = self.acquire(conversation_id)?;
        let session = guard.session();
        let deadline = Instant::now() + self.params.request_timeout;

        let source_bytes = match &source {
            Some(media) => Some(
                self.guarded(deadline, self.messenger.fetch_media(media))
                    .await??,
            ),
            None => None,
        };

        session.append_turn(match source {
            Some(media) => Turn::media(Role::User, media, Some(prompt.content().to_string())),
            None => Turn::user(prompt.content()),
        });

        let editing = source_bytes.is_some();
        let generated = self
            .guarded(
                deadline,
                self.images
                    .generate(conversation_id, prompt.content(), source_bytes),
            )
            .await
            .and_then(|result| result.map_err(RequestError::from));

        let image = match generated {
            Ok(image) => image,
            Err(e) => {
                warn!("Image request for conversation {} failed: {}", conversation_id, e);
                self.log_event(
                    "chat_failed",
                    conversation_id,
                    json!({ "mode": "image", "error": e.to_string() }),
                );
                return Err(e);
            }
        };

        let media = self
            .guarded(
                deadline,
                self.messenger
                    .send_photo(conversation_id, image, Some(prompt.content())),
            )
            .await??;
        session.append_turn(Turn::media(Role::Assistant, media.clone(), None));

        info!(
            "Sent image {} to conversation {} ({})",
            media,
            conversation_id,
            if editing { "edit" } else { "generate" }
        );
        self.log_event(
            "image_response",
            conversation_id,
            json!({
                "prompt": prompt.content(),
                "edit": editing,
                "media": media.as_str(),
            }),
        );
        Ok(RequestOutcome::ImageSent(media))
    }

    fn acquire(&self, conversation_id: ConversationId) -> Result<BusyGuard, RequestError> {
        self.registry.acquire(conversation_id).ok_or_else(|| {
            debug!(
                "Conversation {} is busy, dropping request",
                conversation_id
            );
            RequestError::ConversationBusy
        })
    }

    async fn run_chat(
        &self,
        guard: &BusyGuard,
        input: UserInput,
        choice: ModelChoice,
    ) -> Result<RequestOutcome, RequestError> {
        let session = guard.session();
        let conversation_id = session.id();
        let deadline = Instant::now() + self.params.request_timeout;

        session.append_turn(Turn::user(input.content()));
        let context = match self.params.max_context_turns {
            Some(max) => session.recent(max),
            None => session.snapshot(),
        };
        let model = self.models.resolve(choice);

        info!(
            "Conversation {}: asking {} with {} turns of context",
            conversation_id,
            model,
            context.len()
        );

        let mut throttler = StreamThrottler::new(
            Arc::clone(&self.messenger),
            conversation_id,
            self.params.stream.clone(),
        );

        match self
            .stream_answer(model, &context, deadline, &mut throttler)
            .await
        {
            Ok(()) => {
                let summary = throttler.finish().await;
                if !summary.text.is_empty() {
                    session.append_turn(Turn::assistant(summary.text.clone()));
                }
                debug!(
                    "Conversation {}: answer of {} bytes in {} message(s), {} edit(s)",
                    conversation_id,
                    summary.text.len(),
                    summary.messages.len(),
                    summary.edit_count
                );
                self.log_event(
                    "chat_response",
                    conversation_id,
                    json!({
                        "model": model,
                        "prompt": input.content(),
                        "answer": summary.text,
                        "messages": summary.messages.len(),
                        "edits": summary.edit_count,
                    }),
                );
                Ok(RequestOutcome::Answered(summary))
            }
            Err(e) => {
                warn!(
                    "Conversation {}: request to {} failed: {}",
                    conversation_id, model, e
                );
                let summary = throttler
                    .abort(&self.params.error_marker, &self.params.failure_notice)
                    .await;
                self.log_event(
                    "chat_failed",
                    conversation_id,
                    json!({
                        "model": model,
                        "prompt": input.content(),
                        "partial": truncate_chars(&summary.text, 200),
                        "error": e.to_string(),
                    }),
                );
                Err(e)
            }
        }
    }

    /// Read the backend stream to its end, feeding every delta to the
    /// throttler. The whole exchange is bounded by `deadline`.
    async fn stream_answer(
        &self,
        model: &str,
        context: &[Turn],
        deadline: Instant,
        throttler: &mut StreamThrottler,
    ) -> Result<(), RequestError> {
        let mut handle = self
            .guarded(deadline, self.backend.stream_completion(model, context))
            .await??;

        loop {
            match self.guarded(deadline, handle.next_event()).await? {
                Some(StreamEvent::Delta(chunk)) => throttler.push(&chunk).await,
                Some(StreamEvent::Completed) | None => return Ok(()),
                Some(StreamEvent::Error(e)) => {
                    return Err(RequestError::Backend(BackendError::Stream(e)));
                }
            }
        }
    }

    /// Run `future` unless the deadline passes or shutdown is requested first.
    async fn guarded<F: Future>(
        &self,
        deadline: Instant,
        future: F,
    ) -> Result<F::Output, RequestError> {
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(RequestError::Cancelled),
            result = tokio::time::timeout_at(deadline, future) => {
                result.map_err(|_| RequestError::Timeout)
            }
        }
    }

    fn log_event(
        &self,
        event_type: &'static str,
        conversation_id: ConversationId,
        payload: serde_json::Value,
    ) {
        self.conversation_logger
            .log(ConversationEvent::new(event_type, conversation_id, payload));
    }
}
