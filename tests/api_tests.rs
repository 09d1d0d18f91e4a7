use nlp_therapy_ai::config::AppConfig;
use nlp_therapy_ai::message::ChatResponse;
use nlp_therapy_ai::routes::create_router;
use nlp_therapy_ai::services::session_manager::SessionState;
use nlp_therapy_ai::state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tower::util::ServiceExt;

fn test_config() -> AppConfig {
    AppConfig {
        api_key: Some("test-key".to_string()),
        default_model: Some("test/default-model".to_string()),
        rate_limit_max: 100,
        ..AppConfig::default()
    }
}

fn app_with(config: AppConfig) -> Router {
    create_router(Arc::new(AppState::new(config)))
}

/// Serve a canned chat-completions response on an ephemeral port and
/// return its base address.
async fn spawn_stub_upstream(reply: Value) -> SocketAddr {
    let app = Router::new().route(
        "/chat/completions",
        post(move || {
            let reply = reply.clone();
            async move { Json(reply) }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn post_json(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_healthz_ignores_configuration() {
    // Nothing configured at all, health still reports ok.
    let app = app_with(AppConfig::default());

    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "ok": true }));
}

#[tokio::test]
async fn test_root_service_metadata() {
    let app = app_with(test_config());

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({
            "name": "nlp-therapy-ai",
            "docs": "/docs",
            "chat_endpoint": "/api/chat",
        })
    );
}

#[tokio::test]
async fn test_chat_without_credential_is_500() {
    let config = AppConfig {
        api_key: None,
        ..test_config()
    };
    let app = app_with(config);

    let body = json!({ "messages": [{ "role": "user", "content": "hello" }] });
    let response = app
        .oneshot(post_json("/api/chat", body.to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body_json(response).await;
    assert!(detail["detail"].as_str().unwrap().contains("not configured"));
}

#[tokio::test]
async fn test_chat_without_resolvable_model_is_400() {
    let config = AppConfig {
        default_model: None,
        policy_path: None,
        ..test_config()
    };
    let app = app_with(config);

    let body = json!({ "messages": [{ "role": "user", "content": "hello" }] });
    let response = app
        .oneshot(post_json("/api/chat", body.to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let detail = body_json(response).await;
    assert!(detail["detail"].as_str().unwrap().contains("not resolvable"));
}

#[tokio::test]
async fn test_chat_rejects_unknown_role() {
    let app = app_with(test_config());

    let body = json!({ "messages": [{ "role": "wizard", "content": "hello" }] });
    let response = app
        .oneshot(post_json("/api/chat", body.to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_rejects_empty_messages() {
    let app = app_with(test_config());

    let response = app
        .oneshot(post_json("/api/chat", json!({ "messages": [] }).to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_empty_upstream_is_502() {
    let upstream = spawn_stub_upstream(json!({
        "choices": [{ "message": { "content": null } }]
    }))
    .await;
    let config = AppConfig {
        upstream_base: format!("http://{upstream}"),
        ..test_config()
    };
    let app = app_with(config);

    let body = json!({ "messages": [{ "role": "user", "content": "hello" }] });
    let response = app
        .oneshot(post_json("/api/chat", body.to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_chat_success_echoes_default_model() {
    let upstream = spawn_stub_upstream(json!({
        "choices": [{ "message": { "content": "Hello" } }]
    }))
    .await;
    let config = AppConfig {
        upstream_base: format!("http://{upstream}"),
        ..test_config()
    };
    let app = app_with(config);

    let body = json!({ "messages": [{ "role": "user", "content": "hi there" }] });
    let response = app
        .oneshot(post_json("/api/chat", body.to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let chat_resp: ChatResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(chat_resp.content, "Hello");
    assert_eq!(chat_resp.model, "test/default-model");
    assert!(chat_resp.session_id.is_none());
}

#[tokio::test]
async fn test_chat_explicit_model_override() {
    let upstream = spawn_stub_upstream(json!({
        "choices": [{ "message": { "content": "Hello" } }]
    }))
    .await;
    let config = AppConfig {
        upstream_base: format!("http://{upstream}"),
        ..test_config()
    };
    let app = app_with(config);

    let body = json!({
        "messages": [{ "role": "user", "content": "hi" }],
        "task": "plan",
        "model": "custom/override",
    });
    let response = app
        .oneshot(post_json("/api/chat", body.to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let chat_resp = body_json(response).await;
    assert_eq!(chat_resp["model"], "custom/override");
}

#[tokio::test]
async fn test_chat_session_flow_integration() {
    let upstream = spawn_stub_upstream(json!({
        "choices": [{ "message": { "content": "That sounds difficult." } }]
    }))
    .await;
    let config = AppConfig {
        upstream_base: format!("http://{upstream}"),
        ..test_config()
    };
    let app = app_with(config);

    // Create and start a session.
    let response = app
        .clone()
        .oneshot(post_json("/api/session", String::new()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created = body_json(response).await;
    let session_id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["status"]["state"], "idle");

    let response = app
        .clone()
        .oneshot(post_json(&format!("/api/session/{session_id}/start"), String::new()))
        .await
        .unwrap();
    let started = body_json(response).await;
    assert_eq!(started["state"], "listening");
    assert_eq!(started["listening"], true);

    // Chat against that session.
    let body = json!({
        "messages": [{ "role": "user", "content": "I feel anxious" }],
        "sessionId": session_id,
    });
    let response = app
        .clone()
        .oneshot(post_json("/api/chat", body.to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let chat_resp = body_json(response).await;
    assert_eq!(chat_resp["sessionId"], session_id.as_str());

    // The exchange left the session listening again.
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/session/{session_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let status: nlp_therapy_ai::services::session_manager::SessionStatus =
        serde_json::from_slice(
            &axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap(),
        )
        .unwrap();
    assert_eq!(status.state, SessionState::Listening);
}

#[tokio::test]
async fn test_get_unknown_session_is_404() {
    let app = app_with(test_config());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/session/nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_summary_unknown_session_is_404() {
    let app = app_with(test_config());

    let response = app
        .oneshot(post_json(
            "/api/summary",
            json!({ "sessionId": "missing" }).to_string(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_summary_requires_session_id() {
    let app = app_with(test_config());

    let response = app
        .oneshot(post_json("/api/summary", json!({}).to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_rate_limit_429() {
    let config = AppConfig {
        api_key: None, // requests bounce with 500 before reaching upstream
        rate_limit_max: 2,
        ..AppConfig::default()
    };
    let app = app_with(config);

    let body = json!({ "messages": [{ "role": "user", "content": "hi" }] });
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(post_json("/api/chat", body.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    let response = app
        .oneshot(post_json("/api/chat", body.to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_rate_limit_spares_other_routes() {
    let config = AppConfig {
        rate_limit_max: 1,
        ..AppConfig::default()
    };
    let app = app_with(config);

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
