// src/message.rs
use serde::{Deserialize, Serialize};

/// One turn in a conversation, as sent to and from the upstream API.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    /// Routing label, e.g. "plan", "red", "green".
    #[serde(default)]
    pub task: Option<String>,
    /// Explicit model override; beats the routing policy.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, rename = "sessionId")]
    pub session_id: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    /// The model actually used, echoed back for traceability.
    pub model: String,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Deserialize)]
pub struct SummaryRequest {
    #[serde(default, rename = "sessionId")]
    pub session_id: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct SummaryResponse {
    pub summary: String,
    pub model: String,
}
