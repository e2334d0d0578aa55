//! Route handler functions for all API endpoints.

use axum::extract::{Path, State};
use axum::Json;
use imre_assessment::InterviewSession;
use imre_chat::Reply;
use imre_core::{ConversationMessage, MemoryEntry};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request / response types
// =============================================================================

/// Request body for POST /chat.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub active_sessions: usize,
    pub memory_entries: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MemoryResponse {
    pub entries: Vec<MemoryEntry>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearedResponse {
    pub cleared: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub user_id: String,
    pub messages: Vec<ConversationMessage>,
}

// =============================================================================
// Handler functions
// =============================================================================

/// GET /health
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let memory_entries = state.orchestrator.get_memory()?.len();
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        active_sessions: state.orchestrator.active_sessions(),
        memory_entries,
    }))
}

/// POST /chat - handle one user message.
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<Reply>, ApiError> {
    let reply = state.orchestrator.handle(&req.user_id, &req.text).await?;
    Ok(Json(reply))
}

/// GET /memory
pub async fn get_memory(State(state): State<AppState>) -> Result<Json<MemoryResponse>, ApiError> {
    let entries = state.orchestrator.get_memory()?;
    Ok(Json(MemoryResponse {
        count: entries.len(),
        entries,
    }))
}

/// DELETE /memory
pub async fn clear_memory(
    State(state): State<AppState>,
) -> Result<Json<ClearedResponse>, ApiError> {
    state.orchestrator.clear_memory()?;
    Ok(Json(ClearedResponse { cleared: true }))
}

/// GET /sessions/{user_id} - the user's live interview.
pub async fn get_session(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<InterviewSession>, ApiError> {
    state
        .orchestrator
        .get_session_state(&user_id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No active session for user {}", user_id)))
}

/// GET /history/{user_id}
pub async fn get_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let messages = state.orchestrator.get_history(&user_id)?;
    Ok(Json(HistoryResponse { user_id, messages }))
}
