//! User input value object

use super::error::DomainError;
use serde::{Deserialize, Serialize};

/// A chat input to be relayed to the backend (Value Object)
///
/// Guaranteed to contain at least one non-whitespace character.
/// Surrounding whitespace is trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInput {
    content: String,
}

impl UserInput {
    /// Try to create a new input, rejecting empty or whitespace-only text
    pub fn try_new(content: impl Into<String>) -> Result<Self, DomainError> {
        let content = content.into();
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(DomainError::EmptyInput);
        }
        let content = if trimmed.len() == content.len() {
            content
        } else {
            trimmed.to_string()
        };
        Ok(Self { content })
    }

    /// Get the input content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Consume and return the inner content
    pub fn into_content(self) -> String {
        self.content
    }
}

impl std::fmt::Display for UserInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_creation() {
        let input = UserInput::try_new("What is Rust?").unwrap();
        assert_eq!(input.content(), "What is Rust?");
    }

    #[test]
    fn test_input_is_trimmed() {
        let input = UserInput::try_new("  hello \n").unwrap();
        assert_eq!(input.into_content(), "hello");
    }

    #[test]
    fn test_empty_input_rejected() {
        assert_eq!(UserInput::try_new(""), Err(DomainError::EmptyInput));
        assert_eq!(UserInput::try_new(" \t\n"), Err(DomainError::EmptyInput));
    }
}
