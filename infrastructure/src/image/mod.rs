//! Image pipeline adapters

mod unavailable;

pub use unavailable::UnavailableImagePipeline;
