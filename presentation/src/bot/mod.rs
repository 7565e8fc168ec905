//! Telegram-facing bot surface: commands and routing

pub mod command;
pub mod router;
