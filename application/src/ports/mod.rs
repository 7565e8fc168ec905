//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod conversation_logger;
pub mod generative_backend;
pub mod image_pipeline;
pub mod inbound;
pub mod messaging;
