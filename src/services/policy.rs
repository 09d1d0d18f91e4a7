// src/services/policy.rs
//
// Routing policy: picks the upstream model for a caller-supplied task label.
// The policy file is re-read on every resolution so edits take effect
// without a restart.

use std::collections::HashMap;

use serde::Deserialize;

use crate::config::AppConfig;

#[derive(Debug, Default, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    tiers: Vec<Tier>,
}

#[derive(Debug, Deserialize)]
struct Tier {
    #[serde(default)]
    use_for: Vec<String>,
    #[serde(default)]
    models: Vec<String>,
}

/// Task label → model id, flattened from the tier file. Each `use_for`
/// label maps to its tier's first model; earlier tiers win duplicates.
#[derive(Clone, Debug, Default)]
pub struct RoutingPolicy {
    routes: HashMap<String, String>,
}

impl RoutingPolicy {
    /// Load from a YAML tier file. A missing, unreadable, or malformed
    /// file loads as the empty policy.
    pub fn load(path: Option<&str>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::debug!(path, error = %err, "routing policy not readable");
                return Self::default();
            }
        };
        match serde_yaml::from_str::<PolicyFile>(&raw) {
            Ok(file) => Self::from_tiers(file.tiers),
            Err(err) => {
                tracing::warn!(path, error = %err, "ignoring malformed routing policy");
                Self::default()
            }
        }
    }

    fn from_tiers(tiers: Vec<Tier>) -> Self {
        let mut routes = HashMap::new();
        for tier in tiers {
            let Some(model) = tier.models.first() else {
                continue;
            };
            for task in tier.use_for {
                routes.entry(task).or_insert_with(|| model.clone());
            }
        }
        Self { routes }
    }

    pub fn route_model(&self, task: &str) -> Option<&str> {
        self.routes.get(task).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Resolve the upstream model for a request.
///
/// Precedence: explicit override, then the task routing table (loaded fresh
/// from `config.policy_path`), then the configured default. `None` means the
/// request is unroutable.
pub fn resolve_model(
    config: &AppConfig,
    task: Option<&str>,
    explicit: Option<&str>,
) -> Option<String> {
    if let Some(model) = explicit.filter(|m| !m.trim().is_empty()) {
        return Some(model.to_string());
    }
    let policy = RoutingPolicy::load(config.policy_path.as_deref());
    if let Some(task) = task.filter(|t| !t.trim().is_empty()) {
        if let Some(model) = policy.route_model(task) {
            return Some(model.to_string());
        }
    }
    config.default_model.clone()
}
