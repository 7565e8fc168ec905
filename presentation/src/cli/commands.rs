//! CLI command definitions

use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for gemini-relay
#[derive(Parser, Debug)]
#[command(name = "gemini-relay")]
#[command(author, version, about = "Telegram bot relaying conversations to Google Gemini")]
#[command(long_about = r#"
Gemini Relay is a Telegram bot that answers with Google Gemini models,
streaming each answer into the chat as it is generated.

Every chat keeps its own history and model selection. In private chats any
message is answered; in groups use /gemini or /gemini_pro.

Configuration files are loaded from (in priority order):
1. GEMINI_RELAY_* environment variables (e.g. GEMINI_RELAY_STREAM__MAX_MESSAGE_CHARS)
2. --config <path>        Explicit config file
3. ./gemini-relay.toml    Working-directory config
4. ~/.config/gemini-relay/config.toml   Global config

Example:
  gemini-relay 123456:ABC-DEF AIzaSy...
  GEMINI_RELAY_TELEGRAM__TOKEN=... GEMINI_RELAY_GEMINI__API_KEY=... gemini-relay -v
"#)]
pub struct Cli {
    /// Telegram bot token (overrides telegram.token)
    #[arg(value_name = "TG_TOKEN")]
    pub tg_token: Option<String>,

    /// Google Gemini API key (overrides gemini.api_key)
    #[arg(value_name = "GEMINI_KEY")]
    pub gemini_key: Option<String>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Also write logs to daily rotated files in this directory
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}
