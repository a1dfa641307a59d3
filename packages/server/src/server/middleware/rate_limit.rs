// Rate limiting middleware using tower-governor
//
// Per-IP token bucket in front of the API routes. The client IP comes from
// X-Forwarded-For when present, otherwise from the socket address, so the
// server must be served with connect info.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use axum::Router;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use crate::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSettings {
    pub per_second: u64,
    pub burst_size: u32,
}

impl RateLimitSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            per_second: config.rate_limit_per_second,
            burst_size: config.rate_limit_burst,
        }
    }
}

/// Wrap `router` in a governor layer.
pub fn apply_rate_limit<S>(router: Router<S>, settings: RateLimitSettings) -> Result<Router<S>>
where
    S: Clone + Send + Sync + 'static,
{
    let config = GovernorConfigBuilder::default()
        .per_second(settings.per_second)
        .burst_size(settings.burst_size)
        .use_headers() // Extract IP from X-Forwarded-For header
        .finish()
        .ok_or_else(|| anyhow!("Invalid rate limit settings: {:?}", settings))?;

    Ok(router.layer(GovernorLayer {
        config: Arc::new(config),
    }))
}
