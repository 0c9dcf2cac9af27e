//! Generation orchestrator - drives one attempt through the state machine
//!
//! `Idle -> Authorizing -> AnalyzingPose -> Synthesizing -> Settling -> Done`,
//! with `Errored` reachable from any non-terminal state. The user is only
//! ever charged for a generation that actually produced a deliverable image:
//! every failure before synthesis success returns with the balance untouched.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{AppError, InferenceStage, Result};
use crate::generation::settlement::{self, SettlementReport, GENERATION_COST};
use crate::generation::{GenerationOutcome, GenerationRequest, PoseReference, Progress};
use crate::image::{codec, ImageData};
use crate::inference::InferenceClient;
use crate::store::creation::CreationStore;
use crate::store::profile::ProfileStore;
use crate::store::UserId;

/// Orchestrator tuning knobs
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Credits charged per successful generation
    pub cost: u32,
    /// Bounded wait per inference stage; exceeding it is a transport failure
    pub stage_timeout: Duration,
    /// Persistence attempts before the creation record is dropped
    pub persist_attempts: u32,
    /// Fixed pause between persistence attempts
    pub persist_backoff: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            cost: GENERATION_COST,
            stage_timeout: Duration::from_secs(60),
            persist_attempts: 3,
            persist_backoff: Duration::from_millis(500),
        }
    }
}

/// The generation state machine
///
/// Holds no cross-attempt state beyond the externally owned stores; every
/// `generate` call is a fresh attempt. Concurrent calls are not queued or
/// merged here - single-flight per session is the calling layer's concern,
/// and balance correctness under overlap rests on the store's atomic
/// increment.
pub struct Orchestrator {
    inference: Arc<dyn InferenceClient>,
    profiles: Arc<dyn ProfileStore>,
    creations: Arc<dyn CreationStore>,
    fetcher: Client,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        inference: Arc<dyn InferenceClient>,
        profiles: Arc<dyn ProfileStore>,
        creations: Arc<dyn CreationStore>,
        config: OrchestratorConfig,
    ) -> Result<Self> {
        let fetcher = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            inference,
            profiles,
            creations,
            fetcher,
            config,
        })
    }

    /// Run one generation attempt
    ///
    /// Returns as soon as the deliverable image exists; the settling half
    /// (charge + persistence) continues on the detached task inside the
    /// outcome. On error the interim state is discarded, the balance is
    /// untouched, and the progress channel ends at `Errored`.
    pub async fn generate(
        &self,
        user: Option<UserId>,
        source_photo: Option<String>,
        pose: Option<PoseReference>,
        progress: Option<watch::Sender<Progress>>,
    ) -> Result<GenerationOutcome> {
        match self.run(user, source_photo, pose, &progress).await {
            Ok(outcome) => {
                emit(&progress, Progress::Done);
                Ok(outcome)
            }
            Err(err) => {
                emit(
                    &progress,
                    Progress::Errored {
                        message: err.to_string(),
                    },
                );
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        user: Option<UserId>,
        source_photo: Option<String>,
        pose: Option<PoseReference>,
        progress: &Option<watch::Sender<Progress>>,
    ) -> Result<GenerationOutcome> {
        // Authorizing: all preconditions hold before any external call
        emit(progress, Progress::Authorizing);

        let user = user.ok_or(AppError::AuthRequired)?;
        let source_photo = source_photo
            .ok_or_else(|| AppError::MissingInput("Upload your photo first".to_string()))?;
        let pose =
            pose.ok_or_else(|| AppError::MissingInput("Select a pose first".to_string()))?;

        let profile = self
            .profiles
            .get(&user)
            .await?
            .ok_or(AppError::AuthRequired)?;

        if !settlement::authorize(profile.credits, self.config.cost) {
            debug!(user = %user, balance = profile.credits, "Insufficient credits");
            return Err(AppError::InsufficientCredits {
                required: self.config.cost,
            });
        }

        let request = GenerationRequest {
            source_photo: codec::decode(&source_photo)?,
            pose: pose.clone(),
            cost: self.config.cost,
            created_at: Utc::now(),
        };

        // Normalize the pose reference to embedded bytes; no inference call
        // has happened yet, so failures here are free of cost
        let pose_image = match &request.pose {
            PoseReference::Library { url } => {
                codec::fetch_and_encode(&self.fetcher, url).await?
            }
            PoseReference::Upload { data_url } => codec::decode(data_url)?,
        };

        // AnalyzingPose: stage 1
        emit(progress, Progress::AnalyzingPose);
        let description = self
            .bounded(InferenceStage::Analysis, {
                let inference = self.inference.clone();
                let pose_image = pose_image.clone();
                async move { inference.analyze_pose(&pose_image).await }
            })
            .await?;

        // Synthesizing: stage 2, with the interim description observable
        emit(
            progress,
            Progress::Synthesizing {
                pose_description: description.text.clone(),
            },
        );
        let image = self
            .bounded(InferenceStage::Synthesis, {
                let inference = self.inference.clone();
                let source = request.source_photo.clone();
                let pose_image = pose_image.clone();
                let description = description.clone();
                async move { inference.synthesize(&source, &pose_image, &description).await }
            })
            .await?;

        // Settling: the result is committed to the caller first; charge and
        // persistence run detached and never gate the visible result
        emit(progress, Progress::Settling);
        let settlement = self.spawn_settlement(user.clone(), image.clone(), request.created_at);

        info!(user = %user, size = image.bytes.len(), "Generation complete");

        Ok(GenerationOutcome {
            image,
            description,
            created_at: request.created_at,
            remaining_credits: profile.credits - i64::from(self.config.cost),
            settlement,
        })
    }

    /// Wrap an inference stage in the bounded wait
    async fn bounded<T, F>(&self, stage: InferenceStage, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.config.stage_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(AppError::InferenceFailed {
                stage,
                message: format!("Timed out after {:?}", self.config.stage_timeout),
            }),
        }
    }

    /// Detached second half of Settling
    ///
    /// (a) one atomic decrement of the balance - on failure a warning only,
    /// never retried, since the image was already delivered and a retry
    /// could double-charge; (b) blob upload + record append, retried a
    /// bounded number of times and then dropped with a warning.
    fn spawn_settlement(
        &self,
        user: UserId,
        image: ImageData,
        created_at: DateTime<Utc>,
    ) -> JoinHandle<SettlementReport> {
        let profiles = self.profiles.clone();
        let creations = self.creations.clone();
        let cost = self.config.cost;
        let attempts = self.config.persist_attempts.max(1);
        let backoff = self.config.persist_backoff;

        tokio::spawn(async move {
            let mut report = SettlementReport::default();

            match settlement::settle(profiles.as_ref(), &user, cost).await {
                Ok(balance) => {
                    report.charged = true;
                    report.balance_after = Some(balance);
                    debug!(user = %user, cost, balance, "Settled generation charge");
                }
                Err(e) => {
                    warn!(user = %user, cost, error = %e, "Settlement failed after delivery");
                    report.settlement_error = Some(e.to_string());
                }
            }

            for attempt in 1..=attempts {
                match persist(creations.as_ref(), &user, &image, created_at).await {
                    Ok(id) => {
                        debug!(user = %user, creation = %id, "Persisted creation record");
                        report.creation_id = Some(id);
                        break;
                    }
                    Err(e) if attempt < attempts => {
                        warn!(user = %user, attempt, error = %e, "Persistence attempt failed");
                        tokio::time::sleep(backoff).await;
                    }
                    Err(e) => {
                        warn!(user = %user, attempts, error = %e, "Dropping creation record");
                        report.persistence_error = Some(e.to_string());
                    }
                }
            }

            report
        })
    }
}

async fn persist(
    creations: &dyn CreationStore,
    user: &UserId,
    image: &ImageData,
    created_at: DateTime<Utc>,
) -> Result<String> {
    let url = creations
        .upload_blob(user, &image.bytes, image.extension())
        .await?;
    creations.append_record(user, &url, created_at).await
}

fn emit(progress: &Option<watch::Sender<Progress>>, state: Progress) {
    if let Some(tx) = progress {
        let _ = tx.send(state);
    }
}
