//! Telegram Bot API client
//!
//! Plain JSON-over-HTTPS calls to `{api_base}/bot{token}/{method}`. The
//! client implements the [`MessagingClient`] port for replies and offers the
//! start-up and polling calls the binary needs.

use super::error::TelegramError;
use super::types::{ApiResponse, BotCommand, FileInfo, Message, Update, User};
use async_trait::async_trait;
use relay_application::{MessageHandle, MessagingClient, TransportError};
use relay_domain::{ConversationId, MediaRef};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// Extra time on top of the long-poll timeout before the HTTP call gives up
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Telegram Bot API adapter.
pub struct TelegramClient {
    client: Client,
    api_base: String,
    token: String,
}

impl TelegramClient {
    pub fn new(client: Client, api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_base, self.token, file_path)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &impl Serialize,
    ) -> Result<T, TelegramError> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await?;
        Self::parse(method, response).await
    }

    async fn parse<T: DeserializeOwned>(
        method: &str,
        response: reqwest::Response,
    ) -> Result<T, TelegramError> {
        let status = response.status();
        let text = response.text().await?;
        serde_json::from_str::<ApiResponse<T>>(&text)
            .map_err(|e| {
                TelegramError::Decode(format!("{} returned status {}: {}", method, status, e))
            })?
            .into_result()
    }

    // ==================== Start-up ====================

    /// Identity of the bot behind the token.
    pub async fn get_me(&self) -> Result<User, TelegramError> {
        self.call("getMe", &json!({})).await
    }

    /// Remove any webhook so that `getUpdates` polling works.
    pub async fn delete_webhook(&self) -> Result<(), TelegramError> {
        let _: bool = self.call("deleteWebhook", &json!({})).await?;
        Ok(())
    }

    /// Register the command menu shown by Telegram clients.
    pub async fn set_my_commands(&self, commands: &[BotCommand]) -> Result<(), TelegramError> {
        let _: bool = self
            .call("setMyCommands", &json!({ "commands": commands }))
            .await?;
        Ok(())
    }

    // ==================== Polling ====================

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout: Duration,
    ) -> Result<Vec<Update>, TelegramError> {
        let response = self
            .client
            .post(self.method_url("getUpdates"))
            .timeout(timeout + POLL_GRACE)
            .json(&json!({
                "offset": offset,
                "timeout": timeout.as_secs(),
                "allowed_updates": ["message"],
            }))
            .send()
            .await?;
        Self::parse("getUpdates", response).await
    }
}

#[async_trait]
impl MessagingClient for TelegramClient {
    async fn send_message(
        &self,
        conversation_id: ConversationId,
        text: &str,
    ) -> Result<MessageHandle, TransportError> {
        let message: Message = self
            .call(
                "sendMessage",
                &json!({ "chat_id": conversation_id.as_i64(), "text": text }),
            )
            .await?;
        Ok(MessageHandle::new(conversation_id, message.message_id))
    }

    async fn edit_message(&self, handle: &MessageHandle, text: &str) -> Result<(), TransportError> {
        let result: Result<serde_json::Value, TelegramError> = self
            .call(
                "editMessageText",
                &json!({
                    "chat_id": handle.conversation_id.as_i64(),
                    "message_id": handle.message_id,
                    "text": text,
                }),
            )
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if e.is_message_not_modified() => {
                debug!("Message {} already up to date", handle.message_id);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn send_photo(
        &self,
        conversation_id: ConversationId,
        image: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<MediaRef, TransportError> {
        let mut form = Form::new()
            .text("chat_id", conversation_id.as_i64().to_string())
            .part("photo", Part::bytes(image).file_name("image.png"));
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }

        let response = self
            .client
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await
            .map_err(TelegramError::from)?;
        let message: Message = Self::parse("sendPhoto", response).await?;

        message
            .largest_photo()
            .map(|photo| MediaRef::new(photo.file_id.clone()))
            .ok_or_else(|| {
                warn!("sendPhoto answer for {} had no photo", conversation_id);
                TransportError::Rejected("sent message carries no photo".to_string())
            })
    }

    async fn fetch_media(&self, media: &MediaRef) -> Result<Vec<u8>, TransportError> {
        let file: FileInfo = self
            .call("getFile", &json!({ "file_id": media.as_str() }))
            .await?;
        let path = file.file_path.ok_or_else(|| {
            TransportError::Rejected(format!("file {} is not downloadable", media))
        })?;

        let response = self
            .client
            .get(self.file_url(&path))
            .send()
            .await
            .map_err(TelegramError::from)?;
        if !response.status().is_success() {
            return Err(TransportError::Rejected(format!(
                "download of {} failed with status {}",
                media,
                response.status()
            )));
        }
        let bytes = response.bytes().await.map_err(TelegramError::from)?;
        Ok(bytes.to_vec())
    }
}
