//! Image pipeline port
//!
//! Image generation and editing are handled by a separate collaborator; the
//! session engine only routes requests to it and delivers the result.

use async_trait::async_trait;
use relay_domain::ConversationId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("Image generation is not available")]
    Unavailable,

    #[error("Image request rejected: {0}")]
    Rejected(String),

    #[error("Image generation failed: {0}")]
    Failed(String),
}

/// Generates a new image from a prompt, or edits `source` when given.
#[async_trait]
pub trait ImagePipeline: Send + Sync {
    async fn generate(
        &self,
        conversation_id: ConversationId,
        prompt: &str,
        source: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, ImageError>;
}
