//! Axum route handlers for the analysis job queue.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::processor::ProcessOutcome;
use crate::models::analysis::{AnalysisJob, AnalysisResult, JobStatus};
use crate::screening::handlers::prepare_request;
use crate::state::AppState;

const DEFAULT_PENDING_LIMIT: u32 = 10;
const MAX_PENDING_LIMIT: u32 = 100;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub jobs: Vec<AnalysisJob>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub job_id: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/analyze/jobs
///
/// Stores the request as a pending job. The payload snapshot (with resume text
/// filled in) is what the processor later evaluates.
pub async fn handle_enqueue(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<EnqueueResponse>), AppError> {
    let request = prepare_request(&state, &payload).await?;
    let snapshot = serde_json::to_value(&request)
        .map_err(|e| AppError::Validation(format!("Invalid analysis request: {e}")))?;

    let job_id = state
        .jobs
        .create(&request.candidate_slug, &request.job_slug, &snapshot)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(EnqueueResponse {
            job_id,
            status: JobStatus::Pending,
            message: "Analysis job created".to_string(),
        }),
    ))
}

/// GET /api/v1/analyze/jobs/pending?limit=
pub async fn handle_list_pending(
    State(state): State<AppState>,
    Query(query): Query<PendingQuery>,
) -> Result<Json<PendingResponse>, AppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PENDING_LIMIT)
        .min(MAX_PENDING_LIMIT);
    let jobs = state.jobs.list_pending(limit).await?;
    Ok(Json(PendingResponse { jobs }))
}

/// GET /api/v1/analyze/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobStatusResponse>, AppError> {
    let job = state
        .jobs
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Analysis job {id} not found")))?;

    Ok(Json(JobStatusResponse {
        job_id: job.id,
        status: job.status,
        result: job.result,
        error: job.error,
    }))
}

/// POST /api/v1/analyze/process
///
/// Runs one job to completion. Requires `Authorization: Bearer <PROCESSOR_SECRET>`;
/// with no secret configured every call is rejected.
pub async fn handle_process(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), AppError> {
    authorize(&headers, state.config.processor_secret.as_deref())?;

    let target = requested_job_id(&body)?;
    let outcome = state.processor.process(target).await?;

    let response = match outcome {
        ProcessOutcome::Idle => (
            StatusCode::OK,
            Json(json!({ "message": "No pending jobs found" })),
        ),
        ProcessOutcome::Finished(job) if job.status == JobStatus::Completed => (
            StatusCode::OK,
            Json(json!({
                "message": "Job processed successfully",
                "jobId": job.job_id,
                "status": job.status,
                "result": job.result,
            })),
        ),
        ProcessOutcome::Finished(job) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": job.error,
                "jobId": job.job_id,
                "status": job.status,
            })),
        ),
    };

    Ok(response)
}

/// Only an absent body or an absent/empty `jobId` means "oldest pending job".
/// Anything else that does not name a job is rejected.
fn requested_job_id(body: &[u8]) -> Result<Option<Uuid>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let request: ProcessRequest = serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Invalid process request: {e}")))?;

    match request.job_id.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => Uuid::parse_str(raw)
            .map(Some)
            .map_err(|_| AppError::Validation(format!("Invalid jobId '{raw}'"))),
    }
}

fn authorize(headers: &HeaderMap, secret: Option<&str>) -> Result<(), AppError> {
    let secret = secret.ok_or(AppError::Unauthorized)?;
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    if token.trim() != secret {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}
