//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub inference: InferenceConfig,
    #[serde(default)]
    pub credits: CreditsConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration
///
/// Session tokens are opaque and externally issued; this service only maps
/// them to user identities.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub sessions: Vec<SessionConfig>,
}

/// One externally issued session: token plus the user it authenticates
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    pub token: String,
    pub user_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email: String,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_rpm")]
    pub requests_per_minute: u32,
    #[serde(default = "default_burst")]
    pub burst_size: u32,
}

fn default_true() -> bool {
    true
}

fn default_rpm() -> u32 {
    30
}

fn default_burst() -> u32 {
    10
}

/// External inference service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InferenceConfig {
    pub base_url: String,
    #[serde(default = "default_analysis_model")]
    pub analysis_model: String,
    #[serde(default = "default_synthesis_model")]
    pub synthesis_model: String,
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

fn default_analysis_model() -> String {
    "pose-describe-v2".to_string()
}

fn default_synthesis_model() -> String {
    "pose-transfer-xl".to_string()
}

fn default_timeout() -> u64 {
    60000
}

/// Credit economy configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreditsConfig {
    #[serde(default = "default_generation_cost")]
    pub generation_cost: u32,
    #[serde(default = "default_starting_balance")]
    pub starting_balance: i64,
}

fn default_generation_cost() -> u32 {
    crate::generation::settlement::GENERATION_COST
}

fn default_starting_balance() -> i64 {
    crate::generation::settlement::STARTING_CREDITS
}

impl Default for CreditsConfig {
    fn default() -> Self {
        Self {
            generation_cost: default_generation_cost(),
            starting_balance: default_starting_balance(),
        }
    }
}

/// Creation retention configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionConfig {
    #[serde(default = "default_ttl_days")]
    pub creation_ttl_days: i64,
}

fn default_ttl_days() -> i64 {
    7
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            creation_ttl_days: default_ttl_days(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Settings {
    /// Load settings from configuration files and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/default.toml")
    }

    /// Load settings from a specific configuration file path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("rate_limit.enabled", true)?
            .set_default("rate_limit.requests_per_minute", 30)?
            .set_default("rate_limit.burst_size", 10)?
            .set_default("inference.base_url", "http://localhost:9090")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            // Load from configuration file
            .add_source(
                File::with_name(path.as_ref().to_str().unwrap_or("config/default"))
                    .required(false),
            )
            // Override with environment variables (prefixed with POSE_GEN_)
            .add_source(
                Environment::with_prefix("POSE_GEN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(AppError::Config(config::ConfigError::Message(
                "Server port cannot be 0".to_string(),
            )));
        }

        if self.inference.base_url.is_empty() {
            return Err(AppError::Config(config::ConfigError::Message(
                "Inference base_url cannot be empty".to_string(),
            )));
        }

        if self.credits.generation_cost == 0 {
            return Err(AppError::Config(config::ConfigError::Message(
                "Generation cost must be at least 1 credit".to_string(),
            )));
        }

        if self.credits.starting_balance < 0 {
            return Err(AppError::Config(config::ConfigError::Message(
                "Starting balance cannot be negative".to_string(),
            )));
        }

        for session in &self.auth.sessions {
            if session.token.is_empty() || session.user_id.is_empty() {
                return Err(AppError::Config(config::ConfigError::Message(
                    "Auth sessions need both a token and a user_id".to_string(),
                )));
            }
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            auth: AuthConfig { sessions: vec![] },
            rate_limit: RateLimitConfig {
                enabled: true,
                requests_per_minute: default_rpm(),
                burst_size: default_burst(),
            },
            inference: InferenceConfig {
                base_url: "http://localhost:9090".to_string(),
                analysis_model: default_analysis_model(),
                synthesis_model: default_synthesis_model(),
                timeout_ms: default_timeout(),
            },
            credits: CreditsConfig::default(),
            retention: RetentionConfig::default(),
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.credits.generation_cost, 3);
        assert_eq!(settings.credits.starting_balance, 30);
        assert_eq!(settings.retention.creation_ttl_days, 7);
        assert!(settings.rate_limit.enabled);
    }

    #[test]
    fn test_validate_rejects_zero_cost() {
        let mut settings = Settings::default();
        settings.credits.generation_cost = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_incomplete_session() {
        let mut settings = Settings::default();
        settings.auth.sessions.push(SessionConfig {
            token: "tok-1".to_string(),
            user_id: String::new(),
            display_name: String::new(),
            email: String::new(),
        });
        assert!(settings.validate().is_err());
    }
}
