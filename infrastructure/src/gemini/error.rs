//! Error types for the Gemini adapter

use relay_application::BackendError;
use thiserror::Error;

/// Errors that can occur when talking to the Gemini API
#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Response blocked: {0}")]
    Blocked(String),
}

impl From<GeminiError> for BackendError {
    fn from(error: GeminiError) -> Self {
        match error {
            GeminiError::Http(e) if e.is_timeout() => BackendError::Timeout,
            GeminiError::Http(e) => BackendError::Connection(e.to_string()),
            GeminiError::Api { status, message } => {
                BackendError::Rejected(format!("{} ({})", message, status))
            }
            GeminiError::Decode(message) => BackendError::Stream(message),
            GeminiError::Blocked(reason) => BackendError::Rejected(format!("blocked: {}", reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_maps_to_rejected() {
        let error = GeminiError::Api {
            status: 429,
            message: "Resource has been exhausted".to_string(),
        };
        assert_eq!(
            BackendError::from(error),
            BackendError::Rejected("Resource has been exhausted (429)".to_string())
        );
    }

    #[test]
    fn test_decode_error_maps_to_stream() {
        let error = GeminiError::Decode("unexpected token".to_string());
        assert!(matches!(BackendError::from(error), BackendError::Stream(_)));
    }
}
