//! Genome report jobs: request, poll, fetch and redeliver.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use genome_core::{validate_email, BrandContext, Report};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::jobs::{GenomeJob, JobStatus};
use crate::middleware::RequestId;

use super::{map_validation_error, ApiError, ApiResponse, AppState};

const ESTIMATED_TIME: &str = "2-3 minutes";

#[derive(Debug, Deserialize)]
pub(super) struct GenomeRequest {
    pub brand_identifier: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub(super) struct JobAccepted {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub message: String,
    pub estimated_time: &'static str,
}

/// Create a job and start it in the background.
pub(super) async fn start_job(
    state: &AppState,
    brand: &BrandContext,
    email: &str,
    chat_session_id: Option<Uuid>,
) -> JobAccepted {
    let job = state
        .jobs
        .jobs
        .create(&brand.identifier, email, chat_session_id)
        .await;
    state.jobs.spawn(job.job_id);

    JobAccepted {
        job_id: job.job_id,
        status: job.status,
        message: format!(
            "Marketing Genome analysis started for {}. You'll receive an email when complete.",
            brand.display_name
        ),
        estimated_time: ESTIMATED_TIME,
    }
}

fn job_not_found(rid: &str, job_id: Uuid) -> ApiError {
    ApiError::new(rid, "not_found", format!("genome job {job_id} not found"))
}

/// POST /api/v1/genome
pub(super) async fn create_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<GenomeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<JobAccepted>>), ApiError> {
    let rid = &req_id.0;

    let brand =
        BrandContext::new(&body.brand_identifier).map_err(|e| map_validation_error(rid, &e))?;
    let email = validate_email(&body.email).map_err(|e| map_validation_error(rid, &e))?;

    let accepted = start_job(&state, &brand, email, None).await;
    tracing::info!(job_id = %accepted.job_id, brand = %brand.identifier, "genome job accepted");
    Ok((StatusCode::ACCEPTED, ApiResponse::new(rid, accepted)))
}

/// GET /api/v1/genome
pub(super) async fn list_jobs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<GenomeJob>>> {
    ApiResponse::new(&req_id.0, state.jobs.jobs.list().await)
}

/// GET /api/v1/genome/{job_id}
pub(super) async fn get_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<ApiResponse<GenomeJob>>, ApiError> {
    let rid = &req_id.0;
    let job = state
        .jobs
        .jobs
        .get(job_id)
        .await
        .ok_or_else(|| job_not_found(rid, job_id))?;
    Ok(ApiResponse::new(rid, job))
}

/// GET /api/v1/genome/{job_id}/report
pub(super) async fn get_report(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Arc<Report>>>, ApiError> {
    let rid = &req_id.0;
    let job = state
        .jobs
        .jobs
        .get(job_id)
        .await
        .ok_or_else(|| job_not_found(rid, job_id))?;

    match (job.report, job.status) {
        (Some(report), _) => Ok(ApiResponse::new(rid, report)),
        (None, JobStatus::Failed) => Err(ApiError::new(
            rid,
            "not_found",
            format!("genome job {job_id} failed without a report"),
        )),
        (None, _) => Err(ApiError::new(
            rid,
            "conflict",
            format!("genome job {job_id} is still {}", status_label(job.status)),
        )),
    }
}

/// POST /api/v1/genome/{job_id}/redeliver
pub(super) async fn redeliver(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<ApiResponse<GenomeJob>>, ApiError> {
    let rid = &req_id.0;
    let job = state
        .jobs
        .jobs
        .get(job_id)
        .await
        .ok_or_else(|| job_not_found(rid, job_id))?;

    let Some(report) = job.report.filter(|_| job.status == JobStatus::DeliveryFailed) else {
        return Err(ApiError::new(
            rid,
            "conflict",
            "only jobs whose delivery failed can be redelivered",
        ));
    };

    let updated = state
        .jobs
        .deliver(job_id, report, &job.email)
        .await
        .ok_or_else(|| job_not_found(rid, job_id))?;

    if updated.status == JobStatus::Completed {
        Ok(ApiResponse::new(rid, updated))
    } else {
        Err(ApiError::new(rid, "upstream_error", updated.message))
    }
}

fn status_label(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Pending => "pending",
        JobStatus::Processing => "processing",
        JobStatus::Completed => "completed",
        JobStatus::DeliveryFailed => "delivery_failed",
        JobStatus::Failed => "failed",
    }
}
