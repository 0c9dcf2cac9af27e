//! Common error types for the pose generation service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// The inference stage a failure occurred in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceStage {
    /// Stage 1: pose image -> textual description + keypoints
    Analysis,
    /// Stage 2: source photo + pose + description -> final image
    Synthesis,
}

impl InferenceStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            InferenceStage::Analysis => "analysis",
            InferenceStage::Synthesis => "synthesis",
        }
    }
}

impl std::fmt::Display for InferenceStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application-wide error type
///
/// The first five variants are the terminal outcomes a `generate` call can
/// surface to the caller; all of them halt before any credit is charged.
/// Settlement and persistence failures after a delivered image are never
/// represented here - they travel through `SettlementReport` instead.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Sign in to generate images")]
    AuthRequired,

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("You need at least {required} credits to generate an image")]
    InsufficientCredits { required: u32 },

    #[error("Image processing failed: {0}")]
    ImageProcessingFailed(String),

    #[error("Pose {stage} failed: {message}")]
    InferenceFailed {
        stage: InferenceStage,
        message: String,
    },

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response format returned by the HTTP surface
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_credits: Option<u32>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code) = match &self {
            AppError::AuthRequired => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                Some("auth_required".to_string()),
            ),
            AppError::MissingInput(_) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                Some("missing_input".to_string()),
            ),
            AppError::InsufficientCredits { .. } => (
                StatusCode::PAYMENT_REQUIRED,
                "credit_error",
                Some("insufficient_credits".to_string()),
            ),
            AppError::ImageProcessingFailed(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_request_error",
                Some("image_processing_failed".to_string()),
            ),
            AppError::InferenceFailed { stage, .. } => (
                StatusCode::BAD_GATEWAY,
                "inference_error",
                Some(format!("{}_failed", stage.as_str())),
            ),
            AppError::ProfileNotFound(_) => (
                StatusCode::NOT_FOUND,
                "not_found_error",
                Some("profile_not_found".to_string()),
            ),
            AppError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None),
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None),
            AppError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None),
            AppError::Json(_) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                Some("invalid_json".to_string()),
            ),
            AppError::HttpClient(_) => (StatusCode::BAD_GATEWAY, "upstream_error", None),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None),
        };

        let required_credits = match &self {
            AppError::InsufficientCredits { required } => Some(*required),
            _ => None,
        };

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                message: self.to_string(),
                r#type: error_type.to_string(),
                code,
                required_credits,
            },
        });

        (status, body).into_response()
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
