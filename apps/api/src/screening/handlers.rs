//! Axum route handlers for synchronous candidate analysis.

use axum::{extract::State, Json};
use serde_json::Value;
use tracing::info;

use crate::errors::AppError;
use crate::models::analysis::AnalysisResult;
use crate::screening::request::ScreeningRequest;
use crate::screening::screen_candidate;
use crate::state::AppState;

/// Parses and validates an analysis payload. When only `resumeUrl` is given the
/// PDF is downloaded and its text filled in, so what gets evaluated (or stored
/// as a job snapshot) always carries the resume text.
pub async fn prepare_request(state: &AppState, payload: &Value) -> Result<ScreeningRequest, AppError> {
    let mut request = ScreeningRequest::from_request_data(payload)
        .map_err(|e| AppError::Validation(format!("Invalid analysis request: {e}")))?;
    request.validate().map_err(AppError::Validation)?;

    if request.text.trim().is_empty() {
        if let Some(url) = request.resume_url.as_deref() {
            info!(
                "Extracting resume for candidate {} from PDF",
                request.candidate_slug
            );
            request.text = state.extractor.extract_from_url(url).await?;
        }
    }

    Ok(request)
}

/// POST /api/v1/analyze
///
/// Evaluates a candidate immediately and moves them to the approved/declined
/// stage in the ATS. Nothing is persisted locally.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<AnalysisResult>, AppError> {
    let request = prepare_request(&state, &payload).await?;

    let result = screen_candidate(
        state.evaluator.as_ref(),
        state.credentials.as_ref(),
        state.ats.as_ref(),
        &request,
    )
    .await?;

    Ok(Json(result))
}
