//! Generation module - orchestration state machine and credit settlement

pub mod orchestrator;
pub mod settlement;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::image::ImageData;
use crate::inference::PoseDescription;
use crate::generation::settlement::SettlementReport;

/// A target pose: a stable catalog entry or an ephemeral user upload.
/// Immutable once selected for a generation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PoseReference {
    Library { url: String },
    Upload { data_url: String },
}

/// Value object capturing one generation attempt. Built fresh per attempt
/// after the inputs decode; never persisted directly.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub source_photo: ImageData,
    pub pose: PoseReference,
    pub cost: u32,
    pub created_at: DateTime<Utc>,
}

/// Observable orchestration state, a closed tagged variant
///
/// `Errored` carries the single human-readable message for the terminal
/// state; the machine-distinguishable kind travels on the returned error.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    Idle,
    Authorizing,
    AnalyzingPose,
    /// Interim feedback: stage 1 finished, its description text is showable
    Synthesizing { pose_description: String },
    Settling,
    Done,
    Errored { message: String },
}

/// A successful generation, visible to the caller before persistence begins
///
/// Dropping `settlement` detaches the background half of Settling, which is
/// what the API layer does; tests await it to observe the report.
#[derive(Debug)]
pub struct GenerationOutcome {
    pub image: ImageData,
    pub description: PoseDescription,
    pub created_at: DateTime<Utc>,
    /// Balance as of dispatch: the authorized balance minus the charge that
    /// the detached settling half is about to apply
    pub remaining_credits: i64,
    pub settlement: JoinHandle<SettlementReport>,
}
