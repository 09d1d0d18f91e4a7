// src/state.rs
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::config::AppConfig;
use crate::services::rate_limiter::RateLimiter;
use crate::services::session_manager::SessionManager;
use crate::services::upstream::UpstreamClient;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: AppConfig,
    /// Absent when no upstream credential is configured.
    pub upstream: Option<UpstreamClient>,
    pub sessions: SessionManager,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let upstream = UpstreamClient::from_config(Client::new(), &config);
        Self {
            upstream,
            sessions: SessionManager::new(config.silence_threshold_ms),
            rate_limiter: RateLimiter::new(
                config.rate_limit_max,
                Duration::from_millis(config.rate_limit_window_ms),
            ),
            config,
        }
    }
}
