//! Session authentication middleware
//!
//! Maps an opaque bearer session token (issued by the external identity
//! provider) to a `UserId` request extension. A missing or unknown token is
//! the `AuthRequired` terminal outcome, surfaced before any orchestrator
//! work begins.

use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Request},
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use std::{
    collections::HashMap,
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::warn;

use crate::config::SessionConfig;
use crate::error::AppError;
use crate::store::UserId;

/// Session authentication layer
#[derive(Clone)]
pub struct AuthLayer {
    sessions: Arc<HashMap<String, UserId>>,
}

impl AuthLayer {
    pub fn new(sessions: &[SessionConfig]) -> Self {
        let sessions = sessions
            .iter()
            .map(|s| (s.token.clone(), UserId::new(s.user_id.clone())))
            .collect();
        Self {
            sessions: Arc::new(sessions),
        }
    }

    /// Resolve a token to the user it authenticates
    pub fn resolve(&self, token: &str) -> Option<UserId> {
        self.sessions.get(token).cloned()
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            sessions: self.sessions.clone(),
        }
    }
}

/// Session authentication middleware service
#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    sessions: Arc<HashMap<String, UserId>>,
}

impl<S> Service<Request<Body>> for AuthMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        // The liveness endpoint stays open
        if request.uri().path() == "/health" {
            let future = self.inner.call(request);
            return Box::pin(async move { future.await });
        }

        let token = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .map(|h| h.strip_prefix("Bearer ").unwrap_or(h).to_string());

        let user = token.as_deref().and_then(|t| self.sessions.get(t).cloned());

        match user {
            Some(user) => {
                request.extensions_mut().insert(user);
                let future = self.inner.call(request);
                Box::pin(async move { future.await })
            }
            None => {
                if token.is_some() {
                    warn!("Unknown session token");
                }
                Box::pin(async move { Ok(AppError::AuthRequired.into_response()) })
            }
        }
    }
}
