//! Conversation domain.
//!
//! - [`id::ConversationId`]: stable identifier of a chat context
//! - [`entities::Turn`]: one message exchanged within a conversation
//! - [`history::ConversationHistory`]: the ordered turn log of one conversation

pub mod entities;
pub mod history;
pub mod id;
