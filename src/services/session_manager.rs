// src/services/session_manager.rs
use std::{
    collections::HashMap,
    fmt::Debug,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Reported session duration is clamped to one day.
const MAX_DURATION_MS: u64 = 24 * 60 * 60 * 1000;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Listening,
    Processing,
    Paused,
    Ended,
}

#[derive(Clone, Debug, Serialize)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
    pub timestamp: u64,
}

#[derive(Clone, Debug)]
pub struct Session {
    pub id: String,
    pub state: SessionState,
    pub created_at: u64,
    started_at: Option<u64>,
    ended_at: Option<u64>,
    billing_started_at: Option<u64>,
    billing_ms: u64,
    last_activity_at: Option<u64>,
    silence_ms: u64,
    silence_threshold_ms: u64,
    history: Vec<HistoryEntry>,
}

/// Snapshot of a session as reported to clients.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub id: String,
    pub state: SessionState,
    pub started_at: Option<u64>,
    pub ended_at: Option<u64>,
    pub duration_ms: u64,
    pub billing: BillingStatus,
    pub listening: bool,
    pub silence_ms: u64,
    pub silence_threshold_ms: u64,
    pub can_prompt_silence: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingStatus {
    pub active: bool,
    pub total_ms: u64,
}

impl Session {
    fn new(id: impl Into<String>, silence_threshold_ms: u64) -> Self {
        Self {
            id: id.into(),
            state: SessionState::Idle,
            created_at: now_ms(),
            started_at: None,
            ended_at: None,
            billing_started_at: None,
            billing_ms: 0,
            last_activity_at: None,
            silence_ms: 0,
            silence_threshold_ms,
            history: Vec::new(),
        }
    }

    /// Begin (or resume) listening. Only valid from idle or paused.
    pub fn start(&mut self) {
        if self.state != SessionState::Idle && self.state != SessionState::Paused {
            return;
        }
        let t = now_ms();
        if self.started_at.is_none() {
            self.started_at = Some(t);
        }
        self.state = SessionState::Listening;
        self.last_activity_at = Some(t);
    }

    pub fn pause(&mut self) {
        if matches!(self.state, SessionState::Paused | SessionState::Ended) {
            return;
        }
        self.fold_billing();
        self.state = SessionState::Paused;
    }

    pub fn end(&mut self) {
        if self.state == SessionState::Ended {
            return;
        }
        self.fold_billing();
        self.state = SessionState::Ended;
        self.ended_at = Some(now_ms());
    }

    /// Open a billing span unless one is already running.
    pub fn begin_billing(&mut self) {
        if self.billing_started_at.is_none() {
            self.billing_started_at = Some(now_ms());
        }
    }

    fn fold_billing(&mut self) {
        if let Some(since) = self.billing_started_at.take() {
            self.billing_ms += now_ms().saturating_sub(since);
        }
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        let t = now_ms();
        self.history.push(HistoryEntry {
            role: "user".to_string(),
            content: content.into(),
            timestamp: t,
        });
        self.last_activity_at = Some(t);
        self.silence_ms = 0;
    }

    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.history.push(HistoryEntry {
            role: "assistant".to_string(),
            content: content.into(),
            timestamp: now_ms(),
        });
    }

    /// Refresh the silence counter while the session is listening.
    pub fn tick(&mut self) {
        if self.state == SessionState::Listening {
            let now = now_ms();
            self.silence_ms = now.saturating_sub(self.last_activity_at.unwrap_or(now));
        }
    }

    pub fn status(&self) -> SessionStatus {
        let now = now_ms();
        let duration_ms = self
            .started_at
            .map(|started| self.ended_at.unwrap_or(now).saturating_sub(started))
            .unwrap_or(0)
            .min(MAX_DURATION_MS);
        let billing_total_ms = match self.billing_started_at {
            Some(since) => self.billing_ms + now.saturating_sub(since),
            None => self.billing_ms,
        };

        SessionStatus {
            id: self.id.clone(),
            state: self.state,
            started_at: self.started_at,
            ended_at: self.ended_at,
            duration_ms,
            billing: BillingStatus {
                active: self.billing_started_at.is_some(),
                total_ms: billing_total_ms,
            },
            listening: self.state == SessionState::Listening,
            silence_ms: self.silence_ms,
            silence_threshold_ms: self.silence_threshold_ms,
            can_prompt_silence: self.silence_ms >= self.silence_threshold_ms,
        }
    }
}

/// In-memory session registry. Sessions live for the process lifetime.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<RwLock<HashMap<String, Session>>>,
    silence_threshold_ms: u64,
}

impl Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("silence_threshold_ms", &self.silence_threshold_ms)
            .finish()
    }
}

impl SessionManager {
    pub fn new(silence_threshold_ms: u64) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            silence_threshold_ms,
        }
    }

    // Create a fresh session and return its status.
    pub async fn create_session(&self) -> SessionStatus {
        let id = Uuid::new_v4().to_string();
        let session = Session::new(id.clone(), self.silence_threshold_ms);
        let status = session.status();

        let mut guard = self.inner.write().await;
        guard.insert(id, session);
        status
    }

    pub async fn start(&self, id: &str) -> SessionStatus {
        let mut guard = self.inner.write().await;
        let session = Self::entry(&mut guard, id, self.silence_threshold_ms);
        session.start();
        session.status()
    }

    pub async fn pause(&self, id: &str) -> SessionStatus {
        let mut guard = self.inner.write().await;
        let session = Self::entry(&mut guard, id, self.silence_threshold_ms);
        session.pause();
        session.status()
    }

    pub async fn end(&self, id: &str) -> SessionStatus {
        let mut guard = self.inner.write().await;
        let session = Self::entry(&mut guard, id, self.silence_threshold_ms);
        session.end();
        session.status()
    }

    pub async fn begin_billing(&self, id: &str) -> SessionStatus {
        let mut guard = self.inner.write().await;
        let session = Self::entry(&mut guard, id, self.silence_threshold_ms);
        session.begin_billing();
        session.status()
    }

    /// Status of a known session, with the silence counter refreshed.
    pub async fn status(&self, id: &str) -> Option<SessionStatus> {
        let mut guard = self.inner.write().await;
        let session = guard.get_mut(id)?;
        session.tick();
        Some(session.status())
    }

    /// Get a copy of the session history.
    pub async fn history(&self, id: &str) -> Option<Vec<HistoryEntry>> {
        let guard = self.inner.read().await;
        guard.get(id).map(|session| session.history.clone())
    }

    /// Record the user's side of a chat exchange and mark the session busy.
    pub async fn begin_exchange(&self, id: &str, user_content: impl Into<String>) {
        let mut guard = self.inner.write().await;
        let session = Self::entry(&mut guard, id, self.silence_threshold_ms);
        session.add_user_message(user_content);
        session.state = SessionState::Processing;
    }

    /// Record the assistant reply and return the session to listening.
    pub async fn complete_exchange(&self, id: &str, assistant_content: impl Into<String>) {
        let mut guard = self.inner.write().await;
        let session = Self::entry(&mut guard, id, self.silence_threshold_ms);
        session.add_assistant_message(assistant_content);
        session.state = SessionState::Listening;
        session.last_activity_at = Some(now_ms());
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        let guard = self.inner.read().await;
        guard.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn entry<'a>(
        guard: &'a mut HashMap<String, Session>,
        id: &str,
        silence_threshold_ms: u64,
    ) -> &'a mut Session {
        guard
            .entry(id.to_string())
            .or_insert_with(|| Session::new(id.to_string(), silence_threshold_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn basic_session_flow() {
        let mgr = SessionManager::new(15_000);
        let created = mgr.create_session().await;
        assert!(!created.id.is_empty());
        assert_eq!(created.state, SessionState::Idle);

        let started = mgr.start(&created.id).await;
        assert_eq!(started.state, SessionState::Listening);
        assert!(started.listening);
        assert_eq!(mgr.len().await, 1);
    }
}
