//! Telegram Bot API wire types (the subset the relay uses).

use super::error::TelegramError;
use relay_application::{ChatKind, InboundEvent};
use relay_domain::{ConversationId, MediaRef};
use serde::{Deserialize, Serialize};

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseParameters {
    pub retry_after: Option<u64>,
}

impl<T> ApiResponse<T> {
    pub fn into_result(self) -> Result<T, TelegramError> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(TelegramError::Api {
                code: self.error_code.unwrap_or_default(),
                description: self
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
                retry_after: self.parameters.and_then(|p| p.retry_after),
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub photo: Option<Vec<PhotoSize>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FileInfo {
    pub file_path: Option<String>,
}

/// Entry of the command menu registered with `setMyCommands`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BotCommand {
    pub command: String,
    pub description: String,
}

impl BotCommand {
    pub fn new(command: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            description: description.into(),
        }
    }
}

impl Message {
    /// The largest size of an attached photo.
    pub fn largest_photo(&self) -> Option<&PhotoSize> {
        self.photo
            .as_deref()?
            .iter()
            .max_by_key(|p| u64::from(p.width) * u64::from(p.height))
    }

    fn chat_kind(&self) -> ChatKind {
        if self.chat.kind == "private" {
            ChatKind::Private
        } else {
            ChatKind::Group
        }
    }

    /// Map to an inbound event; `None` for message kinds the relay ignores.
    pub fn to_inbound(&self) -> Option<InboundEvent> {
        let conversation_id = ConversationId::new(self.chat.id);
        let chat_kind = self.chat_kind();

        if let Some(photo) = self.largest_photo() {
            return Some(InboundEvent::photo(
                conversation_id,
                chat_kind,
                MediaRef::new(photo.file_id.clone()),
                self.caption.clone(),
            ));
        }

        self.text
            .as_ref()
            .map(|text| InboundEvent::text(conversation_id, chat_kind, text.clone()))
    }
}

impl Update {
    pub fn to_inbound(&self) -> Option<InboundEvent> {
        self.message.as_ref().and_then(Message::to_inbound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_application::InboundPayload;

    #[test]
    fn test_private_text_update() {
        let update: Update = serde_json::from_str(
            r#"{"update_id":10,"message":{"message_id":5,"chat":{"id":42,"type":"private"},"text":"hello"}}"#,
        )
        .unwrap();

        let event = update.to_inbound().unwrap();
        assert_eq!(event.conversation_id, ConversationId::new(42));
        assert!(event.is_private());
        assert_eq!(event.payload, InboundPayload::Text("hello".to_string()));
    }

    #[test]
    fn test_group_photo_update_picks_largest_size() {
        let update: Update = serde_json::from_str(
            r#"{"update_id":11,"message":{"message_id":6,
                "chat":{"id":-100123,"type":"supergroup"},
                "caption":"/edit make it blue",
                "photo":[
                    {"file_id":"small","width":90,"height":90},
                    {"file_id":"large","width":1280,"height":960},
                    {"file_id":"medium","width":320,"height":240}
                ]}}"#,
        )
        .unwrap();

        let event = update.to_inbound().unwrap();
        assert_eq!(event.chat_kind, ChatKind::Group);
        assert_eq!(
            event.payload,
            InboundPayload::Photo {
                media: MediaRef::new("large"),
                caption: Some("/edit make it blue".to_string()),
            }
        );
    }

    #[test]
    fn test_unsupported_updates_are_skipped() {
        let sticker: Update = serde_json::from_str(
            r#"{"update_id":12,"message":{"message_id":7,"chat":{"id":1,"type":"private"}}}"#,
        )
        .unwrap();
        assert!(sticker.to_inbound().is_none());

        let callback: Update = serde_json::from_str(r#"{"update_id":13}"#).unwrap();
        assert!(callback.to_inbound().is_none());
    }

    #[test]
    fn test_error_envelope() {
        let response: ApiResponse<Message> = serde_json::from_str(
            r#"{"ok":false,"error_code":429,"description":"Too Many Requests: retry after 3","parameters":{"retry_after":3}}"#,
        )
        .unwrap();

        match response.into_result() {
            Err(TelegramError::Api {
                code, retry_after, ..
            }) => {
                assert_eq!(code, 429);
                assert_eq!(retry_after, Some(3));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_bool_result() {
        let response: ApiResponse<bool> =
            serde_json::from_str(r#"{"ok":true,"result":true}"#).unwrap();
        assert!(response.into_result().unwrap());
    }
}
