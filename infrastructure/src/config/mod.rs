//! Configuration file loading for gemini-relay
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. Environment variables prefixed `GEMINI_RELAY_`
//! 2. `--config <path>` specified file
//! 3. Working directory: `./gemini-relay.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/gemini-relay/config.toml`
//! 5. Default values
//!
//! Credentials given on the command line override all of these.

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileGeminiConfig, FileLoggingConfig, FileModelsConfig,
    FileRequestConfig, FileStreamConfig, FileTelegramConfig,
};
pub use loader::{ConfigLoader, ENV_PREFIX, PROJECT_CONFIG_FILE};
