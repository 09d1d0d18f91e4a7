// src/config.rs
use std::env;
use std::str::FromStr;

pub const DEFAULT_UPSTREAM_BASE: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_RATE_LIMIT_MAX: usize = 10;
pub const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 60_000;
pub const DEFAULT_SILENCE_THRESHOLD_MS: u64 = 15_000;

/// Process configuration, built once at startup and handed to handlers
/// through application state. Handlers never read the environment directly;
/// the routing-policy file is the one input re-read per request so policy
/// edits take effect without a restart.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Upstream API credential. Absent means chat requests fail with 500.
    pub api_key: Option<String>,
    /// Fallback model when neither an override nor the policy resolves one.
    pub default_model: Option<String>,
    /// Path to the YAML routing-policy file.
    pub policy_path: Option<String>,
    /// Upstream base URL, without trailing slash.
    pub upstream_base: String,
    pub http_referer: String,
    pub x_title: String,
    pub port: u16,
    pub rate_limit_max: usize,
    pub rate_limit_window_ms: u64,
    pub silence_threshold_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_model: None,
            policy_path: None,
            upstream_base: DEFAULT_UPSTREAM_BASE.to_string(),
            http_referer: "https://local.dev".to_string(),
            x_title: "NLP Therapy AI".to_string(),
            port: DEFAULT_PORT,
            rate_limit_max: DEFAULT_RATE_LIMIT_MAX,
            rate_limit_window_ms: DEFAULT_RATE_LIMIT_WINDOW_MS,
            silence_threshold_ms: DEFAULT_SILENCE_THRESHOLD_MS,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: non_empty(env::var("OPENROUTER_API_KEY").ok()),
            default_model: non_empty(env::var("OPENROUTER_MODEL").ok()),
            policy_path: non_empty(env::var("OPENROUTER_POLICY").ok()),
            upstream_base: non_empty(env::var("OPENROUTER_BASE").ok())
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or(defaults.upstream_base),
            http_referer: non_empty(env::var("HTTP_REFERER").ok()).unwrap_or(defaults.http_referer),
            x_title: non_empty(env::var("X_TITLE").ok()).unwrap_or(defaults.x_title),
            port: parsed("PORT", defaults.port),
            rate_limit_max: parsed("RATE_LIMIT_MAX", defaults.rate_limit_max),
            rate_limit_window_ms: parsed("RATE_LIMIT_WINDOW_MS", defaults.rate_limit_window_ms),
            silence_threshold_ms: parsed("SILENCE_THRESHOLD_MS", defaults.silence_threshold_ms),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn parsed<T: FromStr>(var: &str, default: T) -> T {
    env::var(var)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}
