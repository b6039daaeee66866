use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub pdf_url: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub text: String,
}

/// POST /api/v1/resumes/extract
pub async fn handle_extract(
    State(state): State<AppState>,
    Json(request): Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>, AppError> {
    if request.pdf_url.trim().is_empty() {
        return Err(AppError::Validation("pdf_url is required".to_string()));
    }
    let text = state.extractor.extract_from_url(&request.pdf_url).await?;
    Ok(Json(ExtractResponse { text }))
}
