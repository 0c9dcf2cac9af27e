//! Pose Generation Service
//!
//! Orchestrates a two-stage external AI pipeline (pose analysis, then
//! synthesis) behind a credit-gated HTTP API, settling the user's prepaid
//! balance and persisting results off the critical path.

pub mod api;
pub mod config;
pub mod error;
pub mod generation;
pub mod image;
pub mod inference;
pub mod middleware;
pub mod store;

pub use error::{AppError, Result};

use std::sync::Arc;
use tokio::sync::RwLock;

use generation::orchestrator::Orchestrator;
use inference::InferenceClient;
use store::creation::CreationStore;
use store::profile::ProfileStore;

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Arc<RwLock<config::Settings>>,
    pub orchestrator: Arc<Orchestrator>,
    pub profiles: Arc<dyn ProfileStore>,
    pub creations: Arc<dyn CreationStore>,
    pub inference: Arc<dyn InferenceClient>,
}
