//! Stream throttler: turns a delta stream into rate-limited message edits.
//!
//! The backend produces text deltas as fast as it likes; the chat platform
//! accepts at most one edit per message every `min_edit_interval` and caps a
//! message at `max_message_chars`. [`StreamThrottler`] sits in between:
//!
//! ```text
//! delta ─► push() ─► accumulate ─► (segment > max?) ─► finalise message, open next
//!                                └► (interval elapsed && changed?) ─► edit
//! end   ─► finish() ─► final flush (ignores the interval) / placeholder
//! error ─► abort()  ─► error marker on the partial answer / failure notice
//! ```
//!
//! Publishing is strictly sequential: every send or edit is awaited before
//! the next one is issued, and none may take longer than `publish_timeout`.
//! Platform rejections are never fatal: a failed throttled edit is dropped
//! (the next tick carries the newer text anyway), and terminal publishes are
//! retried once. A full message whose send fails stays in the current
//! segment and is retried with the next delta.
//!
//! Time is read from tokio's clock, so tests can drive it with a paused
//! runtime and `tokio::time::advance`.

use crate::config::StreamParams;
use crate::ports::messaging::{MessageHandle, MessagingClient, TransportError};
use relay_domain::ConversationId;
use relay_domain::util::{char_len, message_split_point, truncate_chars};
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Transient per-request streaming state.
#[derive(Debug, Default)]
pub struct StreamState {
    /// Everything received so far. Only ever extended.
    pub accumulated_text: String,
    /// What the current message was last successfully set to.
    pub last_published_text: String,
    /// When the last send or edit was attempted.
    pub last_publish_time: Option<Instant>,
    /// Number of edit calls issued.
    pub edit_count: usize,
    /// Byte offset in `accumulated_text` where the current message begins.
    segment_start: usize,
    /// Message currently being edited.
    current: Option<MessageHandle>,
    /// Messages successfully opened for this answer, in order.
    messages: Vec<MessageHandle>,
}

impl StreamState {
    /// Text belonging to the current message.
    pub fn segment(&self) -> &str {
        &self.accumulated_text[self.segment_start..]
    }
}

/// Result of one streamed answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSummary {
    /// Complete text received from the backend.
    pub text: String,
    /// Messages opened to display it.
    pub messages: Vec<MessageHandle>,
    pub edit_count: usize,
    /// Whether the placeholder was sent because the answer was empty.
    pub placeholder: bool,
}

/// Publishes one streamed answer into one or more messages.
pub struct StreamThrottler {
    messenger: Arc<dyn MessagingClient>,
    conversation_id: ConversationId,
    params: StreamParams,
    state: StreamState,
}

impl StreamThrottler {
    pub fn new(
        messenger: Arc<dyn MessagingClient>,
        conversation_id: ConversationId,
        params: StreamParams,
    ) -> Self {
        Self {
            messenger,
            conversation_id,
            params,
            state: StreamState::default(),
        }
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    /// Whether any message for this answer reached the user.
    pub fn has_published(&self) -> bool {
        !self.state.messages.is_empty()
    }

    /// Feed one delta.
    pub async fn push(&mut self, delta: &str) {
        if delta.is_empty() {
            return;
        }
        self.state.accumulated_text.push_str(delta);
        if !self.roll_over(false).await {
            return;
        }

        if self.state.current.is_none() {
            // Initial send, or a retry of a send that failed earlier
            if !self.state.segment().is_empty()
                && (self.state.messages.is_empty() || self.interval_elapsed())
            {
                let text = self.state.segment().to_string();
                let _ = self.open_message(&text).await;
            }
            return;
        }

        if self.interval_elapsed() && self.state.segment() != self.state.last_published_text {
            let text = self.state.segment().to_string();
            let _ = self.edit_current(&text).await;
        }
    }

    /// End of stream: publish whatever the user has not seen yet,
    /// regardless of the interval.
    pub async fn finish(mut self) -> StreamSummary {
        self.roll_over(true).await;

        if self.state.accumulated_text.is_empty() {
            let placeholder = self.params.empty_placeholder.clone();
            debug!(
                "Empty answer for conversation {}, sending placeholder",
                self.conversation_id
            );
            self.send_with_retry(&placeholder).await;
            return self.into_summary(true);
        }

        let segment = self.state.segment().to_string();
        match self.state.current.clone() {
            Some(handle) if segment != self.state.last_published_text => {
                self.edit_with_retry(&handle, &segment).await;
            }
            Some(_) => {}
            None if !segment.is_empty() => {
                self.send_with_retry(&segment).await;
            }
            None => {}
        }

        self.into_summary(false)
    }

    /// Failure path: mark the partial answer as interrupted, or send
    /// `notice` when nothing was published yet. Produces exactly one
    /// user-visible terminal state.
    pub async fn abort(mut self, marker: &str, notice: &str) -> StreamSummary {
        if !self.has_published() {
            self.send_with_retry(notice).await;
            return self.into_summary(false);
        }

        let room = self
            .params
            .max_message_chars
            .saturating_sub(char_len(marker));
        let text = format!("{}{}", truncate_chars(self.state.segment(), room), marker);

        match self.state.current.clone() {
            Some(handle) => {
                self.edit_with_retry(&handle, &text).await;
            }
            None => {
                // The current message was just finalised or never opened
                let text = if self.state.segment().is_empty() {
                    marker.trim().to_string()
                } else {
                    text
                };
                self.send_with_retry(&text).await;
            }
        }

        self.into_summary(false)
    }

    fn into_summary(self, placeholder: bool) -> StreamSummary {
        StreamSummary {
            text: self.state.accumulated_text,
            messages: self.state.messages,
            edit_count: self.state.edit_count,
            placeholder,
        }
    }

    fn interval_elapsed(&self) -> bool {
        match self.state.last_publish_time {
            Some(at) => at.elapsed() >= self.params.min_edit_interval,
            None => true,
        }
    }

    /// Split off every full message worth of text from the current segment.
    ///
    /// Returns `false` when a full message could not be delivered; its text
    /// then stays in the segment for the next attempt. With `drop_unsent`
    /// (the final flush, which has no next attempt) it is skipped instead.
    async fn roll_over(&mut self, drop_unsent: bool) -> bool {
        let max = self.params.max_message_chars;
        while char_len(self.state.segment()) > max {
            let cut = message_split_point(self.state.segment(), max);
            let head = self.state.segment()[..cut].to_string();

            let delivered = match self.state.current.clone() {
                Some(handle) if head != self.state.last_published_text => {
                    self.edit_with_retry(&handle, &head).await
                }
                Some(_) => true,
                None => self.send_with_retry(&head).await,
            };
            if !delivered {
                if !drop_unsent {
                    debug!(
                        "Full message for conversation {} not delivered, keeping it for a retry",
                        self.conversation_id
                    );
                    return false;
                }
                warn!(
                    "Dropping {} characters of the answer for conversation {}",
                    char_len(&head),
                    self.conversation_id
                );
            }

            debug!(
                "Message full for conversation {}, continuing in a new one",
                self.conversation_id
            );
            self.state.segment_start += cut;
            self.state.current = None;
            self.state.last_published_text.clear();
        }
        true
    }

    async fn open_message(&mut self, text: &str) -> Result<(), TransportError> {
        self.state.last_publish_time = Some(Instant::now());
        let sent = self
            .bounded(self.messenger.send_message(self.conversation_id, text))
            .await;
        match sent {
            Ok(handle) => {
                self.state.current = Some(handle.clone());
                self.state.messages.push(handle);
                self.state.last_published_text = text.to_string();
                Ok(())
            }
            Err(e) => {
                warn!(
                    "Sending message to conversation {} failed: {}",
                    self.conversation_id, e
                );
                Err(e)
            }
        }
    }

    async fn edit_current(&mut self, text: &str) -> Result<(), TransportError> {
        let Some(handle) = self.state.current.clone() else {
            return Ok(());
        };
        self.edit(&handle, text).await
    }

    async fn edit(&mut self, handle: &MessageHandle, text: &str) -> Result<(), TransportError> {
        self.state.last_publish_time = Some(Instant::now());
        self.state.edit_count += 1;
        let edited = self.bounded(self.messenger.edit_message(handle, text)).await;
        match edited {
            Ok(()) => {
                self.state.last_published_text = text.to_string();
                Ok(())
            }
            Err(e) => {
                warn!(
                    "Editing message {} in conversation {} failed: {}",
                    handle.message_id, self.conversation_id, e
                );
                Err(e)
            }
        }
    }

    /// Run one platform call, giving up after `publish_timeout`.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, TransportError>>,
    ) -> Result<T, TransportError> {
        let limit = self.params.publish_timeout;
        tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(TransportError::Timeout(limit)))
    }

    /// `true` once the message was sent.
    async fn send_with_retry(&mut self, text: &str) -> bool {
        match self.open_message(text).await {
            Ok(()) => true,
            Err(e) => {
                self.wait_before_retry(&e).await;
                self.open_message(text).await.is_ok()
            }
        }
    }

    /// `true` once the edit went through.
    async fn edit_with_retry(&mut self, handle: &MessageHandle, text: &str) -> bool {
        match self.edit(handle, text).await {
            Ok(()) => true,
            Err(e) => {
                self.wait_before_retry(&e).await;
                self.edit(handle, text).await.is_ok()
            }
        }
    }

    async fn wait_before_retry(&self, error: &TransportError) {
        if let Some(wait) = error.retry_after() {
            tokio::time::sleep(wait.min(self.params.min_edit_interval)).await;
        }
    }
}
