//! Inbound platform events
//!
//! The platform adapter turns raw updates into [`InboundEvent`]s; the command
//! router turns those into use-case calls.

use relay_domain::{ConversationId, MediaRef};

/// Kind of chat an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundPayload {
    /// Plain text, including `/command` messages.
    Text(String),
    /// A photo, with the caption the user attached to it.
    Photo {
        media: MediaRef,
        caption: Option<String>,
    },
}

/// One message received from the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub conversation_id: ConversationId,
    pub chat_kind: ChatKind,
    pub payload: InboundPayload,
}

impl InboundEvent {
    pub fn text(conversation_id: ConversationId, chat_kind: ChatKind, text: impl Into<String>) -> Self {
        Self {
            conversation_id,
            chat_kind,
            payload: InboundPayload::Text(text.into()),
        }
    }

    pub fn photo(
        conversation_id: ConversationId,
        chat_kind: ChatKind,
        media: MediaRef,
        caption: Option<String>,
    ) -> Self {
        Self {
            conversation_id,
            chat_kind,
            payload: InboundPayload::Photo { media, caption },
        }
    }

    pub fn is_private(&self) -> bool {
        self.chat_kind == ChatKind::Private
    }
}
