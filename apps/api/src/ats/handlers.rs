//! Axum route handlers proxying the RecruitCRM job and candidate listings.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::ats::models::{filter_by_created_on, AssignedCandidate, AtsJob};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct JobsQuery {
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JobsResponse {
    pub data: Vec<AtsJob>,
    pub hiring_stages: Value,
}

#[derive(Debug, Deserialize)]
pub struct CandidatesQuery {
    pub job_slug: String,
    /// `YYYY-MM-DD`; keeps only candidates created that day.
    pub created_on: Option<String>,
    pub status_id: Option<u64>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CandidatesResponse {
    pub data: Vec<AssignedCandidate>,
}

async fn api_key(state: &AppState, email: Option<&str>) -> Result<String, AppError> {
    state
        .credentials
        .recruit_api_key(email)
        .await?
        .ok_or_else(|| {
            AppError::Configuration("No RecruitCRM API key is configured".to_string())
        })
}

/// GET /api/v1/ats/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobsQuery>,
) -> Result<Json<JobsResponse>, AppError> {
    let key = api_key(&state, query.email.as_deref()).await?;

    let (jobs, hiring_stages) = tokio::try_join!(
        state.ats.list_jobs(&key),
        state.ats.hiring_pipeline(&key)
    )?;

    Ok(Json(JobsResponse {
        data: jobs,
        hiring_stages,
    }))
}

/// GET /api/v1/ats/candidates?job_slug=&created_on=&status_id=
///
/// 404 when the job does not exist in the ATS.
pub async fn handle_list_candidates(
    State(state): State<AppState>,
    Query(query): Query<CandidatesQuery>,
) -> Result<Json<CandidatesResponse>, AppError> {
    if query.job_slug.trim().is_empty() {
        return Err(AppError::Validation("job_slug cannot be empty".to_string()));
    }
    let created_on = query
        .created_on
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d"))
        .transpose()
        .map_err(|_| AppError::Validation("created_on must be YYYY-MM-DD".to_string()))?;

    let key = api_key(&state, query.email.as_deref()).await?;

    let job = state.ats.get_job(&key, &query.job_slug).await?;
    let mut candidates = state
        .ats
        .assigned_candidates(&key, &job.slug, query.status_id)
        .await?;

    if let Some(date) = created_on {
        candidates = filter_by_created_on(candidates, date);
    }

    info!(
        "Listing {} candidates for job {} ({})",
        candidates.len(),
        job.slug,
        job.name.as_deref().unwrap_or("unnamed")
    );
    Ok(Json(CandidatesResponse { data: candidates }))
}
