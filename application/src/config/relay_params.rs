//! Relay parameters: streaming and request policy.
//!
//! [`StreamParams`] controls how a streamed answer is turned into message
//! sends and edits; [`RelayParams`] groups it with the per-request policy used
//! by [`ConversationController`](crate::use_cases::conversation_controller::ConversationController).
//! Defaults follow the Telegram Bot API limits.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Telegram's maximum text message length, in characters.
pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 4096;

/// Edit throttling parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamParams {
    /// Minimum time between two edits of the same message.
    pub min_edit_interval: Duration,
    /// Maximum length of one outgoing message, in characters.
    pub max_message_chars: usize,
    /// Sent instead of an answer when the backend produced no text.
    pub empty_placeholder: String,
    /// Upper bound for a single send or edit; a call still pending after
    /// this long counts as failed.
    pub publish_timeout: Duration,
}

impl Default for StreamParams {
    fn default() -> Self {
        Self {
            min_edit_interval: Duration::from_secs(1),
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
            empty_placeholder: "(The model returned an empty response.)".to_string(),
            publish_timeout: Duration::from_secs(15),
        }
    }
}

impl StreamParams {
    pub fn with_min_edit_interval(mut self, interval: Duration) -> Self {
        self.min_edit_interval = interval;
        self
    }

    pub fn with_max_message_chars(mut self, max: usize) -> Self {
        self.max_message_chars = max;
        self
    }

    pub fn with_publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }
}

/// Per-request policy of the conversation controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayParams {
    pub stream: StreamParams,
    /// Upper bound for one backend call, including streaming the answer.
    pub request_timeout: Duration,
    /// Only the most recent turns are sent as context when set.
    pub max_context_turns: Option<usize>,
    /// Appended to a partially streamed answer when the stream fails.
    pub error_marker: String,
    /// Sent when a request fails before anything was published.
    pub failure_notice: String,
}

impl Default for RelayParams {
    fn default() -> Self {
        Self {
            stream: StreamParams::default(),
            request_timeout: Duration::from_secs(120),
            max_context_turns: None,
            error_marker: "\n\n[response interrupted]".to_string(),
            failure_notice: "Something went wrong while generating the answer. Please try again."
                .to_string(),
        }
    }
}

impl RelayParams {
    // ==================== Builder Methods ====================

    pub fn with_stream(mut self, stream: StreamParams) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_context_turns(mut self, max: Option<usize>) -> Self {
        self.max_context_turns = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let params = RelayParams::default();
        assert_eq!(params.stream.min_edit_interval, Duration::from_secs(1));
        assert_eq!(params.stream.max_message_chars, 4096);
        assert_eq!(params.stream.publish_timeout, Duration::from_secs(15));
        assert_eq!(params.request_timeout, Duration::from_secs(120));
        assert!(params.max_context_turns.is_none());
    }

    #[test]
    fn test_builder() {
        let params = RelayParams::default()
            .with_request_timeout(Duration::from_secs(5))
            .with_max_context_turns(Some(20))
            .with_stream(
                StreamParams::default()
                    .with_min_edit_interval(Duration::from_millis(500))
                    .with_max_message_chars(100)
                    .with_publish_timeout(Duration::from_secs(3)),
            );

        assert_eq!(params.request_timeout, Duration::from_secs(5));
        assert_eq!(params.max_context_turns, Some(20));
        assert_eq!(params.stream.min_edit_interval, Duration::from_millis(500));
        assert_eq!(params.stream.max_message_chars, 100);
        assert_eq!(params.stream.publish_timeout, Duration::from_secs(3));
    }
}
