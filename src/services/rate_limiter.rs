// src/services/rate_limiter.rs
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::Mutex;

/// Sliding-window request limiter keyed by client address.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<HashMap<String, Vec<Instant>>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window,
        }
    }

    /// Record a hit for `key`. Returns false once the key is over budget
    /// for the current window.
    pub async fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut guard = self.inner.lock().await;
        let hits = guard.entry(key.to_string()).or_default();
        hits.retain(|hit| now.duration_since(*hit) < self.window);
        if hits.len() >= self.max_requests {
            return false;
        }
        hits.push(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn rejects_over_budget() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.check("1.2.3.4").await);
        assert!(limiter.check("1.2.3.4").await);
        assert!(!limiter.check("1.2.3.4").await);
        // Other clients keep their own budget.
        assert!(limiter.check("5.6.7.8").await);
    }

    #[tokio::test]
    async fn window_expiry_frees_budget() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20));
        assert!(limiter.check("1.2.3.4").await);
        assert!(!limiter.check("1.2.3.4").await);
        sleep(Duration::from_millis(40)).await;
        assert!(limiter.check("1.2.3.4").await);
    }
}
