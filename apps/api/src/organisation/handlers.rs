//! Axum route handlers for organisation settings and credits.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::organisation::{Organisation, OrganisationOverview};
use crate::organisation::store::mask_api_key;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveApiKeyRequest {
    pub email: String,
    pub api_key: String,
    pub organisation_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApiKeyStatus {
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub masked: Option<String>,
}

fn require_email(email: &str) -> Result<&str, AppError> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("A valid email is required".to_string()));
    }
    Ok(email)
}

/// GET /api/v1/organisation?email=
pub async fn handle_get_organisation(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<OrganisationOverview>, AppError> {
    let email = require_email(&query.email)?;
    let overview = state
        .credentials
        .organisation_overview(email)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No organisation registered for {email}")))?;
    Ok(Json(overview))
}

/// PUT /api/v1/organisation/api-key
pub async fn handle_save_api_key(
    State(state): State<AppState>,
    Json(request): Json<SaveApiKeyRequest>,
) -> Result<Json<Organisation>, AppError> {
    let email = require_email(&request.email)?;
    let api_key = request.api_key.trim();
    if api_key.is_empty() {
        return Err(AppError::Validation("api_key cannot be empty".to_string()));
    }
    let name = request
        .organisation_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let organisation = state.credentials.upsert_api_key(email, api_key, name).await?;
    Ok(Json(organisation))
}

/// GET /api/v1/organisation/api-key?email=
///
/// Reports whether a key is stored; only a masked form is ever returned.
pub async fn handle_api_key_status(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<ApiKeyStatus>, AppError> {
    let email = require_email(&query.email)?;
    let key = state.credentials.recruit_api_key(Some(email)).await?;
    Ok(Json(ApiKeyStatus {
        configured: key.is_some(),
        masked: key.as_deref().map(mask_api_key),
    }))
}
