//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Input cannot be empty")]
    EmptyInput,

    #[error("Invalid model selection: {0}")]
    InvalidModel(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(DomainError::EmptyInput.to_string(), "Input cannot be empty");
        assert_eq!(
            DomainError::InvalidModel("tertiary".to_string()).to_string(),
            "Invalid model selection: tertiary"
        );
    }
}
