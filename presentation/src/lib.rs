//! Presentation layer for gemini-relay
//!
//! This crate contains the CLI definition and the command router that maps
//! inbound chat events onto the conversation controller.

pub mod bot;
pub mod cli;

// Re-export commonly used types
pub use bot::command::{Command, bot_commands};
pub use bot::router::{CommandRouter, Route, route};
pub use cli::commands::Cli;
