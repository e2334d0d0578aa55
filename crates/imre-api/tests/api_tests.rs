//! Integration tests for the IMRE API.
//!
//! Each test builds its own orchestrator over in-process collaborators and
//! drives the router with `oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use imre_api::create_router;
use imre_api::handlers::{ClearedResponse, HealthResponse, HistoryResponse, MemoryResponse};
use imre_api::state::AppState;
use imre_chat::{Collaborators, ConversationOrchestrator, FixedPhrases};
use imre_core::services::local::{LocalKnowledgeBase, LocalPatientRecords, LocalReportService};
use imre_core::ImreConfig;

// =============================================================================
// Helpers
// =============================================================================

fn make_state() -> AppState {
    let config = ImreConfig::default();
    let orchestrator = ConversationOrchestrator::new(
        config.clone(),
        Collaborators {
            knowledge: Arc::new(LocalKnowledgeBase::with_defaults()),
            reports: Arc::new(LocalReportService::new()),
            records: Some(Arc::new(LocalPatientRecords::new())),
            assistant: None,
        },
    )
    .with_phrases(Arc::new(FixedPhrases::new(0)));
    AppState::new(config, Arc::new(orchestrator))
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, json: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

fn chat_body(user_id: &str, text: &str) -> String {
    serde_json::json!({ "user_id": user_id, "text": text }).to_string()
}

async fn body_json(resp: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health() {
    let app = create_router(make_state());
    let resp = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let health: HealthResponse = serde_json::from_value(body_json(resp).await).unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.active_sessions, 0);
    assert_eq!(health.memory_entries, 0);
}

// =============================================================================
// Chat
// =============================================================================

#[tokio::test]
async fn test_chat_returns_reply_envelope() {
    let app = create_router(make_state());
    let resp = app
        .oneshot(post_json(
            "/chat",
            &chat_body("u-1", "Qual o status atual da plataforma?"),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let reply = body_json(resp).await;
    assert_eq!(reply["type"], "status");
    assert!(reply["content"].as_str().unwrap().contains("Avaliações em andamento"));
    let confidence = reply["confidence"].as_f64().unwrap();
    assert!(confidence > 0.2 && confidence <= 1.0);
    assert_eq!(reply["metadata"]["degraded"], false);
}

#[tokio::test]
async fn test_chat_rejects_empty_user() {
    let app = create_router(make_state());
    let resp = app
        .oneshot(post_json("/chat", &chat_body("  ", "oi")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_chat_rejects_long_message() {
    let app = create_router(make_state());
    let long = "a".repeat(4001);
    let resp = app
        .oneshot(post_json("/chat", &chat_body("u-1", &long)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_chat_rejects_malformed_body() {
    let app = create_router(make_state());
    let resp = app
        .oneshot(post_json("/chat", r#"{"user_id": "u-1"}"#))
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
}

// =============================================================================
// Sessions
// =============================================================================

#[tokio::test]
async fn test_session_lifecycle_over_http() {
    let state = make_state();

    let resp = create_router(state.clone())
        .oneshot(get("/sessions/u-1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = create_router(state.clone())
        .oneshot(post_json("/chat", &chat_body("u-1", "iniciar avaliação")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = create_router(state.clone())
        .oneshot(post_json("/chat", &chat_body("u-1", "Sou a Ana")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = create_router(state.clone())
        .oneshot(get("/sessions/u-1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let session = body_json(resp).await;
    assert_eq!(session["user_id"], "u-1");
    assert_eq!(session["step"], "investigation");
    assert_eq!(session["investigation"]["presenting_self"], "Sou a Ana");

    let resp = create_router(state)
        .oneshot(get("/sessions/u-2"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Memory and history
// =============================================================================

#[tokio::test]
async fn test_memory_read_and_clear() {
    let state = make_state();
    for text in ["oi", "Qual o status da plataforma?"] {
        create_router(state.clone())
            .oneshot(post_json("/chat", &chat_body("u-1", text)))
            .await
            .unwrap();
    }

    let resp = create_router(state.clone())
        .oneshot(get("/memory"))
        .await
        .unwrap();
    let memory: MemoryResponse = serde_json::from_value(body_json(resp).await).unwrap();
    assert_eq!(memory.count, 2);
    assert_eq!(memory.entries[0].content, "oi");

    let resp = create_router(state.clone())
        .oneshot(
            Request::delete("/memory")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let cleared: ClearedResponse = serde_json::from_value(body_json(resp).await).unwrap();
    assert!(cleared.cleared);

    let resp = create_router(state).oneshot(get("/memory")).await.unwrap();
    let memory: MemoryResponse = serde_json::from_value(body_json(resp).await).unwrap();
    assert_eq!(memory.count, 0);
}

#[tokio::test]
async fn test_history_per_user() {
    let state = make_state();
    create_router(state.clone())
        .oneshot(post_json("/chat", &chat_body("u-1", "oi")))
        .await
        .unwrap();

    let resp = create_router(state.clone())
        .oneshot(get("/history/u-1"))
        .await
        .unwrap();
    let history: HistoryResponse = serde_json::from_value(body_json(resp).await).unwrap();
    assert_eq!(history.user_id, "u-1");
    assert_eq!(history.messages.len(), 2);
    assert_eq!(history.messages[0].content, "oi");

    let resp = create_router(state).oneshot(get("/history/u-9")).await.unwrap();
    let history: HistoryResponse = serde_json::from_value(body_json(resp).await).unwrap();
    assert!(history.messages.is_empty());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = create_router(make_state());
    let resp = app.oneshot(get("/nope")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
