use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::ats::AtsError;
use crate::jobs::processor::ProcessError;
use crate::jobs::store::JobStoreError;
use crate::models::analysis::JobStatus;
use crate::organisation::store::CredentialError;
use crate::reports::mailer::MailError;
use crate::resume::ExtractionError;
use crate::screening::evaluator::EvaluationError;
use crate::screening::ScreeningError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// Upstream details are logged, never returned to the caller.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Analysis job {job_id} is not pending (status: {status})")]
    JobNotPending { job_id: Uuid, status: JobStatus },

    /// The job's lease expired while it was still running.
    #[error("{0}")]
    LeaseLost(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("ATS error: {0}")]
    Ats(String),

    #[error("PDF extraction error: {0}")]
    Extraction(String),

    #[error("Mail error: {0}")]
    Mail(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            AppError::Configuration(msg) => {
                tracing::error!("Configuration error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CONFIGURATION_ERROR",
                    msg.clone(),
                )
            }
            AppError::JobNotPending { .. } => {
                (StatusCode::CONFLICT, "JOB_NOT_PENDING", self.to_string())
            }
            AppError::LeaseLost(msg) => {
                tracing::error!("Lost processing lease: {msg}");
                (StatusCode::CONFLICT, "JOB_LEASE_LOST", msg.clone())
            }
            AppError::Database(msg) => {
                tracing::error!("Database error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::Ats(msg) => {
                tracing::error!("ATS error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "ATS_ERROR",
                    "The applicant tracking system request failed".to_string(),
                )
            }
            AppError::Extraction(msg) => {
                tracing::error!("PDF extraction error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "EXTRACTION_ERROR",
                    "Failed to extract text from the resume".to_string(),
                )
            }
            AppError::Mail(msg) => {
                tracing::error!("Mail error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "MAIL_ERROR",
                    "Failed to send the report email".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

impl From<JobStoreError> for AppError {
    fn from(err: JobStoreError) -> Self {
        match err {
            JobStoreError::NotFound(id) => AppError::NotFound(format!("Analysis job {id} not found")),
            JobStoreError::InvalidTransition { id, from, .. } => AppError::JobNotPending {
                job_id: id,
                status: from,
            },
            other => AppError::Database(other.to_string()),
        }
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<AtsError> for AppError {
    fn from(err: AtsError) -> Self {
        match err {
            AtsError::NotFound(resource) => AppError::NotFound(format!("ATS {resource} not found")),
            other => AppError::Ats(other.to_string()),
        }
    }
}

impl From<EvaluationError> for AppError {
    fn from(err: EvaluationError) -> Self {
        match err {
            EvaluationError::EmptyResume => {
                AppError::Validation(EvaluationError::EmptyResume.to_string())
            }
            EvaluationError::Llm(e) => AppError::Llm(e.to_string()),
        }
    }
}

impl From<ExtractionError> for AppError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::InvalidUrl(msg) => AppError::Validation(format!("Invalid resume URL: {msg}")),
            other => AppError::Extraction(other.to_string()),
        }
    }
}

impl From<MailError> for AppError {
    fn from(err: MailError) -> Self {
        match err {
            MailError::Address(msg) => AppError::Validation(format!("Invalid email address: {msg}")),
            other => AppError::Mail(other.to_string()),
        }
    }
}

impl From<ScreeningError> for AppError {
    fn from(err: ScreeningError) -> Self {
        match err {
            ScreeningError::Evaluation(e) => e.into(),
            ScreeningError::MissingApiKey => {
                AppError::Configuration(ScreeningError::MissingApiKey.to_string())
            }
            ScreeningError::Credentials(e) => e.into(),
            ScreeningError::Ats(e) => e.into(),
        }
    }
}

impl From<ProcessError> for AppError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::NotFound(id) => AppError::NotFound(format!("Analysis job {id} not found")),
            ProcessError::NotPending { job_id, status } => {
                AppError::JobNotPending { job_id, status }
            }
            ProcessError::LeaseLost {
                job_id,
                status,
                ats_updated,
            } => {
                let ats = if ats_updated {
                    "the ATS hiring stage was already updated"
                } else {
                    "the ATS was not updated"
                };
                AppError::LeaseLost(format!(
                    "Analysis job {job_id} ran past its processing lease and is now {status}; {ats}"
                ))
            }
            ProcessError::Store(e) => e.into(),
        }
    }
}
