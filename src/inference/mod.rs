//! Inference module - external two-stage AI service client

pub mod http_client;
pub mod traits;

pub use http_client::HttpInferenceClient;
pub use traits::{InferenceClient, PoseDescription};
