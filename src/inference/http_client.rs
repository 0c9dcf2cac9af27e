//! HTTP client for the external inference service

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::InferenceConfig;
use crate::error::{AppError, InferenceStage, Result};
use crate::image::{codec, ImageData};
use crate::inference::traits::{InferenceClient, PoseDescription};

/// HTTP adapter for the two-stage pose transfer API
pub struct HttpInferenceClient {
    client: Client,
    base_url: String,
    analysis_model: String,
    synthesis_model: String,
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    model: &'a str,
    image: String,
    mime_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    description: String,
    #[serde(default)]
    keypoints: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct SynthesizeRequest<'a> {
    model: &'a str,
    source_image: String,
    source_mime_type: &'a str,
    pose_image: String,
    pose_mime_type: &'a str,
    description: &'a str,
    keypoints: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct SynthesizeResponse {
    image: String,
    #[serde(default)]
    mime_type: Option<String>,
}

impl HttpInferenceClient {
    /// Create a client from configuration
    ///
    /// The per-call timeout lives on the reqwest client; exceeding it is
    /// indistinguishable from any other transport failure and never costs
    /// the user credits.
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            analysis_model: config.analysis_model.clone(),
            synthesis_model: config.synthesis_model.clone(),
        })
    }

    fn failed(stage: InferenceStage, message: impl Into<String>) -> AppError {
        AppError::InferenceFailed {
            stage,
            message: message.into(),
        }
    }

    async fn post_json<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        stage: InferenceStage,
        request: &Req,
    ) -> Result<Resp> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, stage = %stage, "Sending inference request");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!(stage = %stage, error = %e, "Inference request failed");
                Self::failed(stage, format!("Request to {} failed: {}", url, e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(stage = %stage, status = %status, "Inference service returned error");
            return Err(Self::failed(
                stage,
                format!("Service returned {}: {}", status, body),
            ));
        }

        response
            .json::<Resp>()
            .await
            .map_err(|e| Self::failed(stage, format!("Malformed response payload: {}", e)))
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn analyze_pose(&self, pose_image: &ImageData) -> Result<PoseDescription> {
        let request = AnalyzeRequest {
            model: &self.analysis_model,
            image: STANDARD.encode(&pose_image.bytes),
            mime_type: &pose_image.mime,
        };

        let response: AnalyzeResponse = self
            .post_json("/v1/pose/analyze", InferenceStage::Analysis, &request)
            .await?;

        debug!(
            description_len = response.description.len(),
            "Pose analysis complete"
        );

        Ok(PoseDescription {
            text: response.description,
            keypoints: response.keypoints,
        })
    }

    async fn synthesize(
        &self,
        source_image: &ImageData,
        pose_image: &ImageData,
        description: &PoseDescription,
    ) -> Result<ImageData> {
        let request = SynthesizeRequest {
            model: &self.synthesis_model,
            source_image: STANDARD.encode(&source_image.bytes),
            source_mime_type: &source_image.mime,
            pose_image: STANDARD.encode(&pose_image.bytes),
            pose_mime_type: &pose_image.mime,
            description: &description.text,
            keypoints: &description.keypoints,
        };

        let response: SynthesizeResponse = self
            .post_json("/v1/pose/synthesize", InferenceStage::Synthesis, &request)
            .await?;

        let bytes = STANDARD.decode(response.image.trim()).map_err(|e| {
            Self::failed(
                InferenceStage::Synthesis,
                format!("Response image is not valid base64: {}", e),
            )
        })?;

        let mime = response
            .mime_type
            .or_else(|| codec::detect_mime(&bytes).map(str::to_string))
            .unwrap_or_else(|| "image/png".to_string());

        debug!(size = bytes.len(), mime = %mime, "Synthesis complete");

        Ok(ImageData::new(mime, bytes))
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "Inference health check failed");
                false
            }
        }
    }
}
