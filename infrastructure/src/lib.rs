//! Infrastructure layer for gemini-relay
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod gemini;
pub mod image;
pub mod logging;
pub mod telegram;

// Re-export commonly used types
pub use config::{ConfigLoader, ConfigValidationError, FileConfig};
pub use gemini::{GeminiBackend, GeminiError};
pub use image::UnavailableImagePipeline;
pub use logging::JsonlConversationLogger;
pub use telegram::{BotCommand, TelegramClient, TelegramError};
