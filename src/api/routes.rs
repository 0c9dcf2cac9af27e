//! Router construction

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::handlers;
use crate::middleware::{auth::AuthLayer, rate_limit::RateLimitLayer};
use crate::AppState;

/// Build the application router
pub async fn create_router(state: Arc<AppState>) -> Router {
    let settings = state.settings.read().await.clone();

    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .route("/v1/generations", post(handlers::create_generation))
        .route("/v1/creations", get(handlers::list_creations))
        .route("/v1/profile", get(handlers::get_profile))
        .with_state(state)
        .layer(AuthLayer::new(&settings.auth.sessions));

    if settings.rate_limit.enabled {
        router = router.layer(RateLimitLayer::new(
            settings.rate_limit.requests_per_minute,
            settings.rate_limit.burst_size,
        ));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
