//! Configuration module

pub mod settings;

pub use settings::{
    AuthConfig, CreditsConfig, InferenceConfig, LoggingConfig, RateLimitConfig, RetentionConfig,
    ServerConfig, SessionConfig, Settings,
};
