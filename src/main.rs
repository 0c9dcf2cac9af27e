//! Main entry point for the Pose Generation Service

use std::sync::Arc;

use pose_gen_service::{
    api,
    config::Settings,
    generation::orchestrator::{Orchestrator, OrchestratorConfig},
    inference::HttpInferenceClient,
    store::creation::MemoryCreationStore,
    store::profile::{ensure_profile, MemoryProfileStore},
    store::UserId,
    AppState,
};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = Settings::load()?;
    settings.validate()?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.logging.level.clone()));
    if settings.logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }

    info!("Starting Pose Generation Service");
    info!(
        "Loaded configuration: server={}:{} inference={}",
        settings.server.host, settings.server.port, settings.inference.base_url
    );

    // Wire up collaborators
    let inference = Arc::new(HttpInferenceClient::new(&settings.inference)?);
    let profiles = Arc::new(MemoryProfileStore::new());
    let creations = Arc::new(MemoryCreationStore::new());

    // Bootstrap profiles for configured sessions; the starting-credit grant
    // happens at most once per user
    for session in &settings.auth.sessions {
        ensure_profile(
            profiles.as_ref(),
            &UserId::new(session.user_id.clone()),
            &session.display_name,
            &session.email,
            settings.credits.starting_balance,
        )
        .await?;
    }

    let orchestrator = Arc::new(Orchestrator::new(
        inference.clone(),
        profiles.clone(),
        creations.clone(),
        OrchestratorConfig {
            cost: settings.credits.generation_cost,
            stage_timeout: Duration::from_millis(settings.inference.timeout_ms),
            ..OrchestratorConfig::default()
        },
    )?);

    // Create application state
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let app_state = Arc::new(AppState {
        settings: Arc::new(RwLock::new(settings)),
        orchestrator,
        profiles,
        creations,
        inference,
    });

    // Build the router
    let app = api::routes::create_router(app_state).await;

    info!("Server listening on {}", addr);

    // Start the server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
