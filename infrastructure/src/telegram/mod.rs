//! Telegram Bot API adapter
//!
//! [`TelegramClient`] implements the
//! [`MessagingClient`](relay_application::MessagingClient) port and the
//! long-polling intake that yields [`InboundEvent`](relay_application::InboundEvent)s.

pub mod client;
pub mod error;
pub mod types;

pub use client::TelegramClient;
pub use error::TelegramError;
pub use types::{BotCommand, Update};
