//! Bot command parsing and the command catalogue

use relay_domain::ModelConfig;

/// A `/command` message split into name and arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command<'a> {
    /// Command name without the leading slash or `@botname` suffix.
    pub name: &'a str,
    /// Everything after the name, trimmed.
    pub args: &'a str,
    /// Bot named by the `@botname` suffix, if any.
    pub target: Option<&'a str>,
}

impl<'a> Command<'a> {
    /// Parse `text` as a command; `None` if it does not start with `/`.
    pub fn parse(text: &'a str) -> Option<Self> {
        let rest = text.trim_start().strip_prefix('/')?;
        let (head, args) = match rest.find(char::is_whitespace) {
            Some(pos) => (&rest[..pos], rest[pos..].trim()),
            None => (rest, ""),
        };
        let (name, target) = match head.split_once('@') {
            Some((name, target)) => (name, Some(target)),
            None => (head, None),
        };
        if name.is_empty() {
            return None;
        }
        Some(Self { name, args, target })
    }

    /// Whether this command is meant for the bot called `bot_username`.
    ///
    /// Commands without a suffix are for every bot in the chat. With an
    /// unknown own username only suffix-less commands match.
    pub fn is_addressed_to(&self, bot_username: Option<&str>) -> bool {
        match (self.target, bot_username) {
            (None, _) => true,
            (Some(target), Some(me)) => target.eq_ignore_ascii_case(me),
            (Some(_), None) => false,
        }
    }
}

pub const START: &str = "start";
pub const GEMINI: &str = "gemini";
pub const GEMINI_PRO: &str = "gemini_pro";
pub const DRAW: &str = "draw";
pub const EDIT: &str = "edit";
pub const CLEAR: &str = "clear";
pub const SWITCH: &str = "switch";

/// `(command, description)` pairs registered with the platform at start-up.
pub fn bot_commands(models: &ModelConfig) -> Vec<(&'static str, String)> {
    vec![
        (START, "Start".to_string()),
        (GEMINI, format!("using {}", models.primary)),
        (GEMINI_PRO, format!("using {}", models.secondary)),
        (DRAW, "draw picture".to_string()),
        (EDIT, "edit photo".to_string()),
        (CLEAR, "Clear all history".to_string()),
        (SWITCH, "switch default model".to_string()),
    ]
}
