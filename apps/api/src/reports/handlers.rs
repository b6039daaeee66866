//! Axum route handler for emailing analysis reports.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::analysis::AnalysisJob;
use crate::reports::render::{AnalysisReport, ReportEntry};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EmailReportRequest {
    pub to: String,
    pub job_title: String,
    pub company_name: String,
    pub job_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct EmailReportResponse {
    pub sent: usize,
}

/// Completed jobs contribute an entry; anything else is skipped.
pub fn report_entries(jobs: impl IntoIterator<Item = AnalysisJob>) -> Vec<ReportEntry> {
    jobs.into_iter()
        .filter_map(|job| {
            job.result.map(|result| ReportEntry {
                candidate_slug: job.candidate_slug,
                result,
            })
        })
        .collect()
}

/// POST /api/v1/reports/email
pub async fn handle_email_report(
    State(state): State<AppState>,
    Json(request): Json<EmailReportRequest>,
) -> Result<Json<EmailReportResponse>, AppError> {
    if request.to.trim().is_empty() {
        return Err(AppError::Validation("to cannot be empty".to_string()));
    }
    if request.job_ids.is_empty() {
        return Err(AppError::Validation("job_ids cannot be empty".to_string()));
    }

    let mut jobs = Vec::with_capacity(request.job_ids.len());
    for id in &request.job_ids {
        if let Some(job) = state.jobs.get(*id).await? {
            jobs.push(job);
        }
    }

    let entries = report_entries(jobs);
    if entries.is_empty() {
        return Err(AppError::Validation(
            "None of the requested jobs have completed".to_string(),
        ));
    }

    let mailer = state.mailer.as_ref().ok_or_else(|| {
        AppError::Configuration("SMTP is not configured; reports cannot be emailed".to_string())
    })?;

    let report = AnalysisReport {
        job_title: request.job_title,
        company_name: request.company_name,
        entries,
    };
    mailer.send_report(request.to.trim(), &report).await?;

    Ok(Json(EmailReportResponse {
        sent: report.entries.len(),
    }))
}
