//! Messaging platform port
//!
//! Defines how the application layer delivers replies to the chat platform.

use async_trait::async_trait;
use relay_domain::{ConversationId, MediaRef};
use std::time::Duration;
use thiserror::Error;

/// Identifies a message the bot has sent, so it can be edited later.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    pub conversation_id: ConversationId,
    pub message_id: i64,
}

impl MessageHandle {
    pub fn new(conversation_id: ConversationId, message_id: i64) -> Self {
        Self {
            conversation_id,
            message_id,
        }
    }
}

/// Platform-side rejection of a send or edit.
///
/// Always non-fatal for a stream: the caller logs it and carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Rejected by platform: {0}")]
    Rejected(String),

    #[error("Network error: {0}")]
    Network(String),

    /// The platform did not answer in time.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

impl TransportError {
    /// How long the platform asked us to wait, if it said so.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            TransportError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Client for the messaging platform
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Send a new text message to a conversation.
    async fn send_message(
        &self,
        conversation_id: ConversationId,
        text: &str,
    ) -> Result<MessageHandle, TransportError>;

    /// Replace the text of a message previously sent by the bot.
    ///
    /// Editing a message to the text it already has must succeed.
    async fn edit_message(&self, handle: &MessageHandle, text: &str)
    -> Result<(), TransportError>;

    /// Send an image; returns the platform's reference to the stored image.
    async fn send_photo(
        &self,
        conversation_id: ConversationId,
        image: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<MediaRef, TransportError>;

    /// Download media a user sent to the bot.
    async fn fetch_media(&self, media: &MediaRef) -> Result<Vec<u8>, TransportError>;
}
