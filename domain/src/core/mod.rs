//! Core domain concepts shared across all subdomains.
//!
//! - [`model::ModelChoice`]: which of the two configured models a conversation uses
//! - [`input::UserInput`]: a validated, non-empty chat input
//! - [`error::DomainError`]: domain-level errors

pub mod error;
pub mod input;
pub mod model;
