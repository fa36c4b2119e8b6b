use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use genome_chat::{wants_report, ConversationExport, IntentResult, SessionStart, SessionSummary};
use genome_core::{validate_email, Message};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::genome::{start_job, JobAccepted};
use super::{map_session_error, map_validation_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct CreateSessionRequest {
    pub brand: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatRequest {
    pub session_id: Uuid,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub(super) struct ChatReply {
    pub session_id: Uuid,
    pub result: IntentResult,
    /// The message asked for a full report; clients should offer
    /// `POST /api/v1/chat/report`.
    pub needs_report: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct SessionReportRequest {
    pub session_id: Uuid,
    pub email: String,
}

/// POST /api/v1/chat/sessions
pub(super) async fn create_session(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SessionStart>>), ApiError> {
    let rid = &req_id.0;
    let start = state
        .chat()
        .create_session(&body.brand)
        .await
        .map_err(|e| map_session_error(rid, &e))?;
    Ok((StatusCode::CREATED, ApiResponse::new(rid, start)))
}

/// POST /api/v1/chat
pub(super) async fn send_message(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ApiResponse<ChatReply>>, ApiError> {
    let rid = &req_id.0;
    let result = state
        .chat()
        .handle_message(body.session_id, &body.message)
        .await
        .map_err(|e| map_session_error(rid, &e))?;
    Ok(ApiResponse::new(
        rid,
        ChatReply {
            session_id: body.session_id,
            result,
            needs_report: wants_report(&body.message),
        },
    ))
}

/// GET /api/v1/chat/sessions
pub(super) async fn list_sessions(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<SessionSummary>>> {
    ApiResponse::new(&req_id.0, state.chat().list_sessions().await)
}

/// GET /api/v1/chat/sessions/{session_id}/history
pub(super) async fn history(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Message>>>, ApiError> {
    let rid = &req_id.0;
    let messages = state
        .chat()
        .history(session_id)
        .await
        .map_err(|e| map_session_error(rid, &e))?;
    Ok(ApiResponse::new(rid, messages))
}

/// GET /api/v1/chat/sessions/{session_id}/export
pub(super) async fn export(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ConversationExport>>, ApiError> {
    let rid = &req_id.0;
    let export = state
        .chat()
        .export(session_id)
        .await
        .map_err(|e| map_session_error(rid, &e))?;
    Ok(ApiResponse::new(rid, export))
}

/// POST /api/v1/chat/sessions/{session_id}/reset
pub(super) async fn reset(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ApiResponse<SessionSummary>>, ApiError> {
    let rid = &req_id.0;
    let summary = state
        .chat()
        .reset(session_id)
        .await
        .map_err(|e| map_session_error(rid, &e))?;
    Ok(ApiResponse::new(rid, summary))
}

/// DELETE /api/v1/chat/sessions/{session_id}
pub(super) async fn end_session(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ConversationExport>>, ApiError> {
    let rid = &req_id.0;
    let export = state
        .chat()
        .end_session(session_id)
        .await
        .map_err(|e| map_session_error(rid, &e))?;
    tracing::info!(session_id = %session_id, "chat session ended");
    Ok(ApiResponse::new(rid, export))
}

/// POST /api/v1/chat/report: start a genome job for the session's brand.
pub(super) async fn request_report(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<SessionReportRequest>,
) -> Result<(StatusCode, Json<ApiResponse<JobAccepted>>), ApiError> {
    let rid = &req_id.0;
    let email = validate_email(&body.email).map_err(|e| map_validation_error(rid, &e))?;
    let brand = state
        .chat()
        .brand_of(body.session_id)
        .await
        .map_err(|e| map_session_error(rid, &e))?;

    let accepted = start_job(&state, &brand, email, Some(body.session_id)).await;
    tracing::info!(
        job_id = %accepted.job_id,
        session_id = %body.session_id,
        "genome job requested from chat"
    );
    Ok((StatusCode::ACCEPTED, ApiResponse::new(rid, accepted)))
}
