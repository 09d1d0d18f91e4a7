// src/routes/mod.rs
pub mod chat;
pub mod session;

use std::net::SocketAddr;

use crate::error::AppError;
use crate::state::SharedState;
use axum::{
    Router,
    extract::{ConnectInfo, DefaultBodyLimit, Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use chat::{chat_handler, healthz_handler, root_handler, summary_handler};
use session::{
    begin_billing_handler, create_session_handler, end_session_handler, get_session_handler,
    pause_session_handler, start_session_handler,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn create_router(state: SharedState) -> Router {
    let chat_routes = Router::new()
        .route("/api/chat", post(chat_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/", get(root_handler))
        .merge(chat_routes)
        .route("/api/summary", post(summary_handler))
        .route("/api/session", post(create_session_handler))
        .route("/api/session/{id}", get(get_session_handler))
        .route("/api/session/{id}/start", post(start_session_handler))
        .route("/api/session/{id}/pause", post(pause_session_handler))
        .route("/api/session/{id}/end", post(end_session_handler))
        .route("/api/session/{id}/billing/start", post(begin_billing_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn rate_limit_middleware(
    State(state): State<SharedState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Peer address when served with connect info; shared bucket otherwise.
    let key = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "local".to_string());

    if !state.rate_limiter.check(&key).await {
        return Err(AppError::RateLimited);
    }
    Ok(next.run(req).await)
}
