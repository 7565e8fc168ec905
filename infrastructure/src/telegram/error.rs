//! Error types for the Telegram adapter

use relay_application::TransportError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when talking to the Telegram Bot API
#[derive(Error, Debug)]
pub enum TelegramError {
    /// Request never got a Bot API answer. The URL is stripped, since it
    /// carries the bot token.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("Bot API error {code}: {description}")]
    Api {
        code: i64,
        description: String,
        retry_after: Option<u64>,
    },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for TelegramError {
    fn from(error: reqwest::Error) -> Self {
        TelegramError::Http(error.without_url())
    }
}

impl TelegramError {
    /// Edits that would not change the text are rejected by Telegram with
    /// this description.
    pub fn is_message_not_modified(&self) -> bool {
        matches!(
            self,
            TelegramError::Api { description, .. }
                if description.contains("message is not modified")
        )
    }
}

impl From<TelegramError> for TransportError {
    fn from(error: TelegramError) -> Self {
        match error {
            TelegramError::Api {
                code: 429,
                retry_after,
                ..
            } => TransportError::RateLimited {
                retry_after: retry_after.map(Duration::from_secs),
            },
            TelegramError::Api { description, .. } => TransportError::Rejected(description),
            TelegramError::Http(e) => TransportError::Network(e.to_string()),
            TelegramError::Decode(message) => TransportError::Rejected(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(code: i64, description: &str, retry_after: Option<u64>) -> TelegramError {
        TelegramError::Api {
            code,
            description: description.to_string(),
            retry_after,
        }
    }

    #[test]
    fn test_rate_limit_maps_retry_after() {
        let error = api(429, "Too Many Requests: retry after 5", Some(5));
        assert_eq!(
            TransportError::from(error),
            TransportError::RateLimited {
                retry_after: Some(Duration::from_secs(5))
            }
        );
    }

    #[test]
    fn test_other_api_errors_are_rejections() {
        let error = api(400, "Bad Request: chat not found", None);
        assert_eq!(
            TransportError::from(error),
            TransportError::Rejected("Bad Request: chat not found".to_string())
        );
    }

    #[test]
    fn test_message_not_modified_detection() {
        let error = api(
            400,
            "Bad Request: message is not modified: specified new message content and reply markup are exactly the same",
            None,
        );
        assert!(error.is_message_not_modified());
        assert!(!api(400, "Bad Request: message to edit not found", None).is_message_not_modified());
    }
}
