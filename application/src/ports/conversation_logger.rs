//! Port for structured conversation logging.
//!
//! Defines the [`ConversationLogger`] trait for recording per-request outcomes
//! (answers, failures, history clears, model switches) to a structured log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures the
//! conversation transcript in a machine-readable format (JSONL).

use relay_domain::ConversationId;
use serde_json::Value;

/// A structured conversation event for logging.
pub struct ConversationEvent {
    /// Event type identifier (e.g., "chat_response", "chat_failed").
    pub event_type: &'static str,
    /// Conversation the event belongs to.
    pub conversation_id: ConversationId,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl ConversationEvent {
    pub fn new(event_type: &'static str, conversation_id: ConversationId, payload: Value) -> Self {
        Self {
            event_type,
            conversation_id,
            payload,
        }
    }
}

/// Port for logging conversation events to a structured log.
///
/// `log` is synchronous and infallible so that a broken log sink never
/// disturbs request handling; implementations swallow their own failures.
pub trait ConversationLogger: Send + Sync {
    /// Record a conversation event.
    fn log(&self, event: ConversationEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}
