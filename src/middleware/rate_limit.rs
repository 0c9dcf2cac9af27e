//! Per-session rate limiting middleware using the Governor crate
//!
//! Generations are billable and slow; the limiter is keyed by session token
//! so one client hammering the endpoint cannot starve everyone else.

use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::future::BoxFuture;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use serde::Serialize;
use std::{
    num::NonZeroU32,
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::warn;

/// Rate limit error response
#[derive(Serialize)]
struct RateLimitError {
    error: RateLimitErrorDetail,
}

#[derive(Serialize)]
struct RateLimitErrorDetail {
    message: String,
    r#type: String,
    code: String,
}

type SharedLimiter = Arc<DefaultKeyedRateLimiter<String>>;

/// Rate limiting layer, keyed per session token
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: SharedLimiter,
}

impl RateLimitLayer {
    pub fn new(requests_per_minute: u32, burst_size: u32) -> Self {
        let per_minute = NonZeroU32::new(requests_per_minute)
            .unwrap_or_else(|| NonZeroU32::new(30).unwrap());
        let burst = NonZeroU32::new(burst_size).unwrap_or_else(|| NonZeroU32::new(10).unwrap());
        let quota = Quota::per_minute(per_minute).allow_burst(burst);

        Self {
            limiter: Arc::new(RateLimiter::keyed(quota)),
        }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitMiddleware {
            inner,
            limiter: self.limiter.clone(),
        }
    }
}

/// Rate limiting middleware service
#[derive(Clone)]
pub struct RateLimitMiddleware<S> {
    inner: S,
    limiter: SharedLimiter,
}

impl<S> Service<Request<Body>> for RateLimitMiddleware<S>
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

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        if request.uri().path() == "/health" {
            let future = self.inner.call(request);
            return Box::pin(async move { future.await });
        }

        // Key by session token; unauthenticated traffic shares one bucket
        // and gets rejected by the auth layer anyway
        let key = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .map(|h| h.strip_prefix("Bearer ").unwrap_or(h).to_string())
            .unwrap_or_else(|| "anonymous".to_string());

        match self.limiter.check_key(&key) {
            Ok(_) => {
                let future = self.inner.call(request);
                Box::pin(async move { future.await })
            }
            Err(_) => {
                warn!("Rate limit exceeded for session");
                Box::pin(async move { Ok(create_rate_limit_response()) })
            }
        }
    }
}

fn create_rate_limit_response() -> Response {
    let error = RateLimitError {
        error: RateLimitErrorDetail {
            message: "Too many generation requests. Slow down and try again.".to_string(),
            r#type: "rate_limit_error".to_string(),
            code: "rate_limit_exceeded".to_string(),
        },
    };

    (StatusCode::TOO_MANY_REQUESTS, Json(error)).into_response()
}
