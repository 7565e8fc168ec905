//! Application-level configuration.
//!
//! - [`StreamParams`]: edit throttling and message size limits
//! - [`RelayParams`]: per-request policy (timeout, context window, notices)

pub mod relay_params;

pub use relay_params::{RelayParams, StreamParams};
