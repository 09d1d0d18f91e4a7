use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::{
    error::AppError,
    message::{ChatMessage, ChatRequest, ChatResponse, SummaryRequest, SummaryResponse},
    services::policy::resolve_model,
    state::SharedState,
};

const MAX_MESSAGE_CHARS: usize = 50_000;
const ALLOWED_ROLES: &[&str] = &["system", "user", "assistant"];

const SUMMARY_SYSTEM_PROMPT: &str = "You are an empathetic therapist assistant. Generate a concise, supportive session summary: key insights, emotional tone, gentle next steps, and optional resources. Use clear, non-clinical language.";

pub async fn healthz_handler() -> Json<Value> {
    Json(json!({ "ok": true }))
}

pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "name": "nlp-therapy-ai",
        "docs": "/docs",
        "chat_endpoint": "/api/chat",
    }))
}

pub async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    // Credential check comes first: a misconfigured server reports 500 no
    // matter what the request looks like.
    let upstream = state
        .upstream
        .as_ref()
        .ok_or_else(|| AppError::Config("OpenRouter API key not configured".to_string()))?;

    validate_messages(&payload.messages)?;

    let model = resolve_model(&state.config, payload.task.as_deref(), payload.model.as_deref())
        .ok_or_else(|| {
            AppError::BadRequest("Model not resolvable. Set OPENROUTER_MODEL or policy.".to_string())
        })?;

    let session_id = payload
        .session_id
        .as_deref()
        .filter(|id| !id.trim().is_empty());

    if let Some(id) = session_id {
        let user_content = payload
            .messages
            .iter()
            .find(|m| m.role == "user")
            .map(|m| m.content.clone())
            .unwrap_or_default();
        state.sessions.begin_exchange(id, user_content).await;
    }

    let content = upstream
        .chat(&model, &payload.messages)
        .await
        .ok_or_else(|| AppError::Upstream("Upstream model error or empty response".to_string()))?;

    if let Some(id) = session_id {
        state.sessions.complete_exchange(id, content.clone()).await;
    }

    Ok(Json(ChatResponse {
        content,
        model,
        session_id: session_id.map(String::from),
    }))
}

fn validate_messages(messages: &[ChatMessage]) -> Result<(), AppError> {
    if messages.is_empty() {
        return Err(AppError::BadRequest(
            "At least one message is required".to_string(),
        ));
    }
    for message in messages {
        if !ALLOWED_ROLES.contains(&message.role.as_str()) {
            return Err(AppError::BadRequest(
                "Message role must be system, user, or assistant".to_string(),
            ));
        }
        if message.content.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AppError::BadRequest(
                "Message content too long (max 50000 characters)".to_string(),
            ));
        }
    }
    Ok(())
}

// Summarize a live session's transcript through the upstream model routed
// for the "docs" task.
pub async fn summary_handler(
    State(state): State<SharedState>,
    Json(payload): Json<SummaryRequest>,
) -> Result<Json<SummaryResponse>, AppError> {
    let upstream = state
        .upstream
        .as_ref()
        .ok_or_else(|| AppError::Config("OpenRouter API key not configured".to_string()))?;

    let session_id = payload
        .session_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("sessionId is required".to_string()))?;

    let history = state
        .sessions
        .history(session_id)
        .await
        .ok_or_else(|| AppError::NotFound("session not found".to_string()))?;

    let model = resolve_model(&state.config, Some("docs"), None).ok_or_else(|| {
        AppError::BadRequest("Model not resolvable. Set OPENROUTER_MODEL or policy.".to_string())
    })?;

    let transcript = history
        .iter()
        .map(|entry| format!("{}: {}", entry.role.to_uppercase(), entry.content))
        .collect::<Vec<_>>()
        .join("\n");

    let messages = vec![
        ChatMessage {
            role: "system".to_string(),
            content: SUMMARY_SYSTEM_PROMPT.to_string(),
        },
        ChatMessage {
            role: "user".to_string(),
            content: format!(
                "Here is the session transcript. Summarize it for the client.\n\n{transcript}"
            ),
        },
    ];

    let summary = upstream
        .chat(&model, &messages)
        .await
        .ok_or_else(|| AppError::Upstream("Upstream returned empty content".to_string()))?;

    Ok(Json(SummaryResponse { summary, model }))
}
