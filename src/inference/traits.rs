//! Common trait and types for the external inference service

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::image::ImageData;

/// Stage-1 output: formatted description text plus machine-readable keypoints
///
/// Transient - exists only for the duration of one generation attempt. The
/// text doubles as the interim progress feedback shown to the caller; the
/// keypoint payload is consumed only by stage 2.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseDescription {
    pub text: String,
    pub keypoints: serde_json::Value,
}

/// Client for the remote two-stage pose transfer service
///
/// Both calls are single-shot with no internal retry; retry policy, if any,
/// belongs to the orchestrator where it stays visible and testable. Any
/// transport-level failure (timeout, non-success response, malformed payload)
/// is normalized to `InferenceFailed` carrying the failing stage. The adapter
/// never partially consumes cost.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Stage 1: convert a pose image into a description + keypoints
    async fn analyze_pose(&self, pose_image: &ImageData) -> Result<PoseDescription>;

    /// Stage 2: render the source subject into the described pose
    async fn synthesize(
        &self,
        source_image: &ImageData,
        pose_image: &ImageData,
        description: &PoseDescription,
    ) -> Result<ImageData>;

    /// Whether the remote service is currently reachable
    async fn health_check(&self) -> bool;
}
