//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

use crate::gemini::{GenerationConfig, SafetySetting};
use relay_application::config::relay_params::DEFAULT_MAX_MESSAGE_CHARS;
use relay_application::{RelayParams, StreamParams};
use relay_domain::{ModelChoice, ModelConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("{0} cannot be 0")]
    InvalidTimeout(&'static str),

    #[error("stream.min_edit_interval_ms cannot be 0")]
    InvalidEditInterval,

    #[error("stream.max_message_chars must be between 1 and {max}, got {value}")]
    InvalidMessageLength { value: usize, max: usize },

    #[error("models.{0}: model name cannot be empty")]
    EmptyModelName(&'static str),

    #[error("gemini.generation.{0} is out of range")]
    InvalidGeneration(&'static str),

    #[error("gemini.safety_settings: category and threshold cannot be empty")]
    EmptySafetySetting,
}

/// Telegram Bot API settings (`[telegram]`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTelegramConfig {
    /// Bot token; usually given on the command line or via the environment
    pub token: Option<String>,
    /// Bot API endpoint
    pub api_base: String,
    /// Long-polling timeout for `getUpdates`
    pub poll_timeout_seconds: u64,
    /// Upper bound for every other Bot API call
    pub request_timeout_seconds: u64,
}

impl Default for FileTelegramConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: "https://api.telegram.org".to_string(),
            poll_timeout_seconds: 60,
            request_timeout_seconds: 30,
        }
    }
}

/// Gemini API settings (`[gemini]`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGeminiConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    /// Sampling parameters (`[gemini.generation]`)
    pub generation: FileGenerationConfig,
    /// Safety thresholds (`[[gemini.safety_settings]]`)
    pub safety_settings: Vec<FileSafetySetting>,
}

impl Default for FileGeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            generation: FileGenerationConfig::default(),
            safety_settings: Vec::new(),
        }
    }
}

impl FileGeminiConfig {
    pub fn to_generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: self.generation.temperature,
            top_p: self.generation.top_p,
            top_k: self.generation.top_k,
            max_output_tokens: self.generation.max_output_tokens,
        }
    }

    pub fn to_safety_settings(&self) -> Vec<SafetySetting> {
        self.safety_settings
            .iter()
            .map(|s| SafetySetting {
                category: s.category.trim().to_string(),
                threshold: s.threshold.trim().to_string(),
            })
            .collect()
    }
}

/// Generation parameters; unset values use the model's defaults.
///
/// # Example
///
/// ```toml
/// [gemini.generation]
/// temperature = 0.7
/// top_p = 0.95
/// top_k = 40
/// max_output_tokens = 8192
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGenerationConfig {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    pub max_output_tokens: Option<u32>,
}

/// One safety threshold.
///
/// ```toml
/// [[gemini.safety_settings]]
/// category = "HARM_CATEGORY_HARASSMENT"
/// threshold = "BLOCK_NONE"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSafetySetting {
    pub category: String,
    pub threshold: String,
}

/// Model selection (`[models]`)
///
/// # Example
///
/// ```toml
/// [models]
/// primary = "gemini-2.5-flash"   # /gemini and private chat
/// secondary = "gemini-2.5-pro"   # /gemini_pro, or after /switch
/// default = "primary"            # model of a new conversation
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileModelsConfig {
    pub primary: String,
    pub secondary: String,
    pub default: ModelChoice,
}

impl Default for FileModelsConfig {
    fn default() -> Self {
        let models = ModelConfig::default();
        Self {
            primary: models.primary,
            secondary: models.secondary,
            default: ModelChoice::default(),
        }
    }
}

/// Streaming edit throttle (`[stream]`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStreamConfig {
    /// Minimum time between two edits of one message
    pub min_edit_interval_ms: u64,
    /// Maximum characters per message before continuing in a new one
    pub max_message_chars: usize,
    /// Give up on a single send or edit after this long
    pub publish_timeout_seconds: u64,
}

impl Default for FileStreamConfig {
    fn default() -> Self {
        Self {
            min_edit_interval_ms: 1000,
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
            publish_timeout_seconds: 15,
        }
    }
}

/// Per-request policy (`[request]`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRequestConfig {
    /// Upper bound for one backend call, streaming included
    pub timeout_seconds: u64,
    /// Send only the most recent turns as context
    pub max_context_turns: Option<usize>,
}

impl Default for FileRequestConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 120,
            max_context_turns: None,
        }
    }
}

/// Logging settings (`[logging]`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// JSONL transcript of every handled request; disabled when unset
    pub conversation_log: Option<PathBuf>,
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Telegram settings
    pub telegram: FileTelegramConfig,
    /// Gemini settings
    pub gemini: FileGeminiConfig,
    /// Model selection
    pub models: FileModelsConfig,
    /// Streaming settings
    pub stream: FileStreamConfig,
    /// Request policy
    pub request: FileRequestConfig,
    /// Logging settings
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.request.timeout_seconds == 0 {
            return Err(ConfigValidationError::InvalidTimeout("request.timeout_seconds"));
        }
        if self.telegram.poll_timeout_seconds == 0 {
            return Err(ConfigValidationError::InvalidTimeout(
                "telegram.poll_timeout_seconds",
            ));
        }
        if self.telegram.request_timeout_seconds == 0 {
            return Err(ConfigValidationError::InvalidTimeout(
                "telegram.request_timeout_seconds",
            ));
        }
        if self.stream.publish_timeout_seconds == 0 {
            return Err(ConfigValidationError::InvalidTimeout(
                "stream.publish_timeout_seconds",
            ));
        }
        if self.stream.min_edit_interval_ms == 0 {
            return Err(ConfigValidationError::InvalidEditInterval);
        }

        let max = DEFAULT_MAX_MESSAGE_CHARS;
        if !(1..=max).contains(&self.stream.max_message_chars) {
            return Err(ConfigValidationError::InvalidMessageLength {
                value: self.stream.max_message_chars,
                max,
            });
        }

        // Check for empty model names
        if self.models.primary.trim().is_empty() {
            return Err(ConfigValidationError::EmptyModelName("primary"));
        }
        if self.models.secondary.trim().is_empty() {
            return Err(ConfigValidationError::EmptyModelName("secondary"));
        }

        self.validate_generation()
    }

    fn validate_generation(&self) -> Result<(), ConfigValidationError> {
        let generation = &self.gemini.generation;
        if generation
            .temperature
            .is_some_and(|t| !(0.0..=2.0).contains(&t))
        {
            return Err(ConfigValidationError::InvalidGeneration("temperature"));
        }
        if generation.top_p.is_some_and(|p| !(0.0..=1.0).contains(&p)) {
            return Err(ConfigValidationError::InvalidGeneration("top_p"));
        }
        if generation.top_k == Some(0) {
            return Err(ConfigValidationError::InvalidGeneration("top_k"));
        }
        if generation.max_output_tokens == Some(0) {
            return Err(ConfigValidationError::InvalidGeneration(
                "max_output_tokens",
            ));
        }
        if self
            .gemini
            .safety_settings
            .iter()
            .any(|s| s.category.trim().is_empty() || s.threshold.trim().is_empty())
        {
            return Err(ConfigValidationError::EmptySafetySetting);
        }

        Ok(())
    }

    pub fn to_model_config(&self) -> ModelConfig {
        ModelConfig::new(self.models.primary.trim(), self.models.secondary.trim())
    }

    pub fn to_relay_params(&self) -> RelayParams {
        RelayParams::default()
            .with_request_timeout(Duration::from_secs(self.request.timeout_seconds))
            .with_max_context_turns(self.request.max_context_turns)
            .with_stream(
                StreamParams::default()
                    .with_min_edit_interval(Duration::from_millis(
                        self.stream.min_edit_interval_ms,
                    ))
                    .with_max_message_chars(self.stream.max_message_chars)
                    .with_publish_timeout(Duration::from_secs(
                        self.stream.publish_timeout_seconds,
                    )),
            )
    }
}
