//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{ErrorResponse, OkResponse, SendRequest, SendResponse, VersionResponse};
use super::AppState;
use crate::runtime::ControllerError;
use crate::state_machine::Snapshot;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Observable state
        .route("/api/state", get(get_state))
        .route("/api/stream", get(stream_state))
        // Commands
        .route("/api/send", post(send_message))
        .route("/api/cancel", post(cancel_exchange))
        .route("/api/reset", post(reset_conversation))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Observable State
// ============================================================

async fn get_state(State(state): State<AppState>) -> Json<Snapshot> {
    Json(state.controller.snapshot())
}

async fn stream_state(State(state): State<AppState>) -> impl IntoResponse {
    // Subscribe before reading the snapshot so no update falls in between
    let broadcast_rx = state.controller.subscribe();
    let init = state.controller.snapshot();
    sse_stream(init, broadcast_rx)
}

// ============================================================
// Commands
// ============================================================

async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendRequest>,
) -> Result<(StatusCode, Json<SendResponse>), AppError> {
    state.controller.send(req.text).await?;
    Ok((StatusCode::ACCEPTED, Json(SendResponse { queued: true })))
}

async fn cancel_exchange(State(state): State<AppState>) -> Result<Json<OkResponse>, AppError> {
    state.controller.cancel().await?;
    Ok(Json(OkResponse { ok: true }))
}

async fn reset_conversation(
    State(state): State<AppState>,
) -> Result<Json<OkResponse>, AppError> {
    state.controller.reset().await?;
    Ok(Json(OkResponse { ok: true }))
}

async fn get_version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    Internal(String),
}

impl From<ControllerError> for AppError {
    fn from(e: ControllerError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
