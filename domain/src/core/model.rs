//! Model selection value objects

use super::error::DomainError;
use serde::{Deserialize, Serialize};

/// Which of the two configured backend models a conversation talks to
/// (Value Object)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelChoice {
    /// The everyday model (`models.primary`)
    #[default]
    Primary,
    /// The stronger, slower model (`models.secondary`)
    Secondary,
}

impl ModelChoice {
    /// Get the string identifier for this choice
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelChoice::Primary => "primary",
            ModelChoice::Secondary => "secondary",
        }
    }

    /// The other choice
    pub fn toggled(self) -> Self {
        match self {
            ModelChoice::Primary => ModelChoice::Secondary,
            ModelChoice::Secondary => ModelChoice::Primary,
        }
    }
}

impl std::fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ModelChoice {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" => Ok(ModelChoice::Primary),
            "secondary" => Ok(ModelChoice::Secondary),
            other => Err(DomainError::InvalidModel(other.to_string())),
        }
    }
}

/// Concrete backend model names for each [`ModelChoice`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub primary: String,
    pub secondary: String,
}

impl ModelConfig {
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }

    /// Resolve a choice to the model name sent to the backend
    pub fn resolve(&self, choice: ModelChoice) -> &str {
        match choice {
            ModelChoice::Primary => &self.primary,
            ModelChoice::Secondary => &self.secondary,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::new("gemini-2.5-flash", "gemini-2.5-pro")
    }
}
