use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use crate::{error::AppError, services::session_manager::SessionStatus, state::SharedState};

#[derive(Serialize)]
pub struct CreatedSession {
    pub id: String,
    pub status: SessionStatus,
}

pub async fn create_session_handler(State(state): State<SharedState>) -> Json<CreatedSession> {
    let status = state.sessions.create_session().await;
    Json(CreatedSession {
        id: status.id.clone(),
        status,
    })
}

pub async fn start_session_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Json<SessionStatus> {
    Json(state.sessions.start(&id).await)
}

pub async fn pause_session_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Json<SessionStatus> {
    Json(state.sessions.pause(&id).await)
}

pub async fn end_session_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Json<SessionStatus> {
    Json(state.sessions.end(&id).await)
}

pub async fn begin_billing_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Json<SessionStatus> {
    Json(state.sessions.begin_billing(&id).await)
}

pub async fn get_session_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<SessionStatus>, AppError> {
    state
        .sessions
        .status(&id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound("not found".to_string()))
}
