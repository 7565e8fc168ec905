//! Image pipeline used when no image model is wired in.

use async_trait::async_trait;
use relay_application::{ImageError, ImagePipeline};
use relay_domain::ConversationId;
use tracing::debug;

/// Answers every request with [`ImageError::Unavailable`].
pub struct UnavailableImagePipeline;

#[async_trait]
impl ImagePipeline for UnavailableImagePipeline {
    async fn generate(
        &self,
        conversation_id: ConversationId,
        _prompt: &str,
        source: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, ImageError> {
        debug!(
            "Image {} requested by conversation {}, but no pipeline is configured",
            if source.is_some() { "edit" } else { "generation" },
            conversation_id
        );
        Err(ImageError::Unavailable)
    }
}
