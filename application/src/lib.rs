//! Application layer for gemini-relay
//!
//! This crate contains the conversation use case, the session registry, the
//! stream throttler, port definitions and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod session_registry;
pub mod throttle;
pub mod use_cases;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::{RelayParams, StreamParams};
pub use ports::{
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    generative_backend::{BackendError, GenerativeBackend, StreamHandle},
    image_pipeline::{ImageError, ImagePipeline},
    inbound::{ChatKind, InboundEvent, InboundPayload},
    messaging::{MessageHandle, MessagingClient, TransportError},
};
pub use session_registry::{BusyGuard, Session, SessionRegistry};
pub use throttle::{StreamState, StreamSummary, StreamThrottler};
pub use use_cases::conversation_controller::{
    ConversationController, RequestError, RequestMode, RequestOutcome,
};
