//! Generative backend port
//!
//! Defines the interface for streaming completions from an LLM provider.

use async_trait::async_trait;
use relay_domain::{StreamEvent, Turn};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur during backend operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Auth, quota or malformed request, as reported by the provider.
    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timeout")]
    Timeout,

    #[error("Stream error: {0}")]
    Stream(String),
}

/// Handle for receiving streaming events from a completion.
///
/// Wraps an `mpsc::Receiver<StreamEvent>`. The sequence is finite and cannot
/// be restarted; dropping the handle cancels the producer.
pub struct StreamHandle {
    pub receiver: mpsc::Receiver<StreamEvent>,
}

impl StreamHandle {
    pub fn new(receiver: mpsc::Receiver<StreamEvent>) -> Self {
        Self { receiver }
    }

    /// Build an already-filled handle, mostly useful for backends that
    /// produce the whole answer at once and for tests.
    pub fn from_events(events: impl IntoIterator<Item = StreamEvent>) -> Self {
        let events: Vec<StreamEvent> = events.into_iter().collect();
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            // Capacity covers every event, so this never fails
            let _ = tx.try_send(event);
        }
        Self::new(rx)
    }

    /// Receive the next event.
    ///
    /// Returns `None` once the producer has gone away. A channel closed
    /// without a `Completed` event is treated as the end of the response.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.receiver.recv().await
    }
}

/// Backend producing streamed completions
///
/// This port defines how the application layer talks to the generative
/// model. Implementations (adapters) live in the infrastructure layer.
/// Transport-level retries are the adapter's business.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Start a streaming completion of `context` with the named model.
    ///
    /// `context` is the conversation so far, oldest first, ending with the
    /// user turn to answer.
    async fn stream_completion(
        &self,
        model: &str,
        context: &[Turn],
    ) -> Result<StreamHandle, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closed_channel_ends_the_stream() {
        let mut handle = StreamHandle::from_events([StreamEvent::Delta("x".to_string())]);
        assert_eq!(handle.next_event().await, Some(StreamEvent::Delta("x".to_string())));
        assert_eq!(handle.next_event().await, None);
    }
}
