//! Request rate limiting

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{Response, StatusCode},
    response::IntoResponse,
    Router,
};
use clap::Parser;
use tower_governor::{governor::GovernorConfigBuilder, GovernorError, GovernorLayer};
use tracing::warn;

use super::errors::ApiError;

/// Rate limit configuration, applied per client IP address
#[derive(Clone, Debug, PartialEq, Eq, Parser)]
pub struct RateLimitConfig {
    /// Milliseconds needed to replenish one request
    #[arg(long, env = "RATE_LIMIT_REPLENISH_MS", default_value = "100")]
    pub replenish_ms: u64,

    /// The number of requests allowed in a burst
    #[arg(long, env = "RATE_LIMIT_BURST", default_value = "10")]
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            replenish_ms: 100,
            burst_size: 10,
        }
    }
}

/// Rate limit error handler
pub fn rate_limit_error_handler(err: GovernorError) -> Response<Body> {
    match err {
        GovernorError::TooManyRequests { wait_time, headers } => {
            warn!(retry_after = wait_time, "rate limit exceeded");

            let mut response =
                ApiError::new(StatusCode::TOO_MANY_REQUESTS, "Too many requests.").into_response();
            if let Some(headers) = headers {
                response.headers_mut().extend(headers);
            }

            response
        }
        GovernorError::UnableToExtractKey => {
            ApiError::new_500("Could not identify the client").into_response()
        }
        GovernorError::Other { code, msg, headers } => {
            let mut response =
                ApiError::new(code, msg.as_deref().unwrap_or("Internal Server Error"))
                    .into_response();
            if let Some(headers) = headers {
                response.headers_mut().extend(headers);
            }

            response
        }
    }
}

/// Wrap `router` in a per-IP rate limiter.
///
/// The router must be served with connect info so the peer address can be extracted.
pub fn rate_limited(router: Router, config: &RateLimitConfig) -> Result<Router> {
    let governor = GovernorConfigBuilder::default()
        .per_millisecond(config.replenish_ms)
        .burst_size(config.burst_size)
        .error_handler(rate_limit_error_handler)
        .finish()
        .context("invalid rate limit configuration")?;

    Ok(router.layer(GovernorLayer {
        config: Arc::new(governor),
    }))
}
