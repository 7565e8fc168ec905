//! Conversation domain entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Role of a turn in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Opaque reference to a media object held by the messaging platform
/// (e.g. a Telegram `file_id`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaRef(String);

impl MediaRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MediaRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content carried by a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnContent {
    Text { text: String },
    Media {
        reference: MediaRef,
        caption: Option<String>,
    },
}

/// One message exchanged within a conversation (Entity)
///
/// Immutable once appended to a [`ConversationHistory`](super::history::ConversationHistory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: TurnContent,
    timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, content: TurnContent, timestamp: DateTime<Utc>) -> Self {
        Self {
            role,
            content,
            timestamp,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(
            Role::User,
            TurnContent::Text { text: text.into() },
            Utc::now(),
        )
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(
            Role::Assistant,
            TurnContent::Text { text: text.into() },
            Utc::now(),
        )
    }

    pub fn media(role: Role, reference: MediaRef, caption: Option<String>) -> Self {
        Self::new(
            role,
            TurnContent::Media { reference, caption },
            Utc::now(),
        )
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &TurnContent {
        &self.content
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the text if this is a text turn.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            TurnContent::Text { text } => Some(text),
            TurnContent::Media { .. } => None,
        }
    }

    /// Plain-text rendering used when the turn is sent as backend context.
    ///
    /// Media turns are rendered as a short marker followed by their caption.
    pub fn context_text(&self) -> Cow<'_, str> {
        match &self.content {
            TurnContent::Text { text } => Cow::Borrowed(text),
            TurnContent::Media {
                caption: Some(caption),
                ..
            } => Cow::Owned(format!("[image] {}", caption)),
            TurnContent::Media { caption: None, .. } => Cow::Borrowed("[image]"),
        }
    }

    pub(crate) fn restamped(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
