//! Gemini API adapter
//!
//! Streams completions from Google's Gemini models over SSE and exposes them
//! through the [`GenerativeBackend`](relay_application::GenerativeBackend) port.

pub mod backend;
pub mod error;
pub mod sse;
mod types;

pub use backend::GeminiBackend;
pub use error::GeminiError;
pub use types::{GenerationConfig, SafetySetting};
