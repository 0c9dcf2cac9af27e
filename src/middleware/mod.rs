//! Middleware module - session auth and rate limiting

pub mod auth;
pub mod rate_limit;
