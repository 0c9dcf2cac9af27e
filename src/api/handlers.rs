//! HTTP handlers

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::generation::{GenerationOutcome, PoseReference};
use crate::inference::InferenceClient;
use crate::store::creation::CreationStore;
use crate::store::profile::ProfileStore;
use crate::store::UserId;
use crate::AppState;

/// Body of `POST /v1/generations`
///
/// The fields are optional on purpose: absence is a `MissingInput` terminal
/// outcome decided by the orchestrator, not a deserialization error.
#[derive(Debug, Deserialize)]
pub struct GenerationBody {
    /// Source photo as a data URL
    pub source_photo: Option<String>,
    /// Library pose, by catalog URL
    pub pose_url: Option<String>,
    /// User-uploaded pose as a data URL; wins over `pose_url` if both are set
    pub pose_image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerationResponse {
    pub image: String,
    pub pose_description: String,
    /// Credits left as of dispatch, before the detached charge lands
    pub remaining_credits: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CreationResponse {
    pub id: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user_id: String,
    pub display_name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub credits: i64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub inference_reachable: bool,
}

/// Run one generation attempt for the authenticated caller
pub async fn create_generation(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserId>,
    Json(body): Json<GenerationBody>,
) -> Result<Json<GenerationResponse>> {
    let pose = body
        .pose_image
        .map(|data_url| PoseReference::Upload { data_url })
        .or(body.pose_url.map(|url| PoseReference::Library { url }));

    let GenerationOutcome {
        image,
        description,
        created_at,
        remaining_credits,
        settlement,
    } = state
        .orchestrator
        .generate(Some(user), body.source_photo, pose, None)
        .await?;

    // The settling half stays detached; it logs its own outcome and must
    // never sit on the critical path of the visible result
    drop(settlement);

    Ok(Json(GenerationResponse {
        image: image.to_data_url(),
        pose_description: description.text,
        remaining_credits,
        created_at,
    }))
}

/// The caller's creation records, newest first, expired ones filtered out
pub async fn list_creations(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserId>,
) -> Result<Json<Vec<CreationResponse>>> {
    let ttl_days = state.settings.read().await.retention.creation_ttl_days;
    let now = Utc::now();

    let creations = state
        .creations
        .query_by_owner(&user)
        .await?
        .into_iter()
        .filter(|c| !c.is_expired(now, ttl_days))
        .map(|c| CreationResponse {
            id: c.id,
            image_url: c.image_url,
            created_at: c.created_at,
        })
        .collect();

    Ok(Json(creations))
}

/// The caller's profile, including the live credit balance
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserId>,
) -> Result<Json<ProfileResponse>> {
    let profile = state
        .profiles
        .get(&user)
        .await?
        .ok_or_else(|| crate::error::AppError::ProfileNotFound(user.to_string()))?;

    Ok(Json(ProfileResponse {
        user_id: user.to_string(),
        display_name: profile.display_name,
        email: profile.email,
        avatar_url: profile.avatar_url,
        credits: profile.credits,
    }))
}

/// Liveness plus inference reachability
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        inference_reachable: state.inference.health_check().await,
    })
}
