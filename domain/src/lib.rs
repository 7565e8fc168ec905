//! Domain layer for gemini-relay
//!
//! This crate contains the conversation entities and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Conversation
//!
//! A conversation is one chat context on the messaging platform, identified
//! by a [`ConversationId`]. Its [`ConversationHistory`] is an ordered log of
//! [`Turn`]s exchanged between the user and the assistant.
//!
//! ## Model selection
//!
//! Every conversation talks to one of two configured backend models,
//! selected by [`ModelChoice`] and resolved to a concrete model name by
//! [`ModelConfig`].

pub mod conversation;
pub mod core;
pub mod stream;
pub mod util;

// Re-export commonly used types
pub use conversation::{
    entities::{MediaRef, Role, Turn, TurnContent},
    history::ConversationHistory,
    id::ConversationId,
};
pub use core::{
    error::DomainError,
    input::UserInput,
    model::{ModelChoice, ModelConfig},
};
pub use stream::StreamEvent;
