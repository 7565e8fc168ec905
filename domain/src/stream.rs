//! Streaming events for backend completions.
//!
//! [`StreamEvent`] represents individual events in a streaming completion,
//! enabling the reply to be shown to the user while it is generated.

/// An event in a streaming completion.
///
/// Used to bridge transport-level streaming (e.g. SSE chunks from the Gemini
/// API) to the application layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A text chunk from the model.
    Delta(String),
    /// The backend finished the response normally (signals stream end).
    Completed,
    /// An error that occurred mid-stream (signals stream end).
    Error(String),
}

impl StreamEvent {
    /// Returns the text content if this is a Delta event.
    pub fn text(&self) -> Option<&str> {
        match self {
            StreamEvent::Delta(s) => Some(s),
            _ => None,
        }
    }

    /// Returns true if this event signals the end of the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Completed | StreamEvent::Error(_))
    }
}
