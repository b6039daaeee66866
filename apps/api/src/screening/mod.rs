//! Candidate screening: evaluate a candidate with the LLM and record the
//! decision in the ATS. Shared by the synchronous endpoint and the job processor.

pub mod evaluator;
pub mod handlers;
pub mod prompts;
pub mod request;

use thiserror::Error;

use crate::ats::models::HiringStageUpdate;
use crate::ats::{Ats, AtsError};
use crate::models::analysis::AnalysisResult;
use crate::organisation::store::{CredentialError, CredentialStore};
use evaluator::{EvaluationError, Evaluator};
use request::ScreeningRequest;

#[derive(Debug, Error)]
pub enum ScreeningError {
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error("No RecruitCRM API key is configured for this organisation")]
    MissingApiKey,

    #[error("Credential lookup failed: {0}")]
    Credentials(#[from] CredentialError),

    #[error("Failed to update ATS hiring stage: {0}")]
    Ats(#[from] AtsError),
}

/// Evaluates `request` and pushes the decision to the ATS.
/// The result is only returned once the ATS has accepted the new stage.
pub async fn screen_candidate(
    evaluator: &dyn Evaluator,
    credentials: &dyn CredentialStore,
    ats: &dyn Ats,
    request: &ScreeningRequest,
) -> Result<AnalysisResult, ScreeningError> {
    let verdict = evaluator.evaluate(request).await?;

    let api_key = credentials
        .recruit_api_key(request.organisation_email.as_deref())
        .await?
        .ok_or(ScreeningError::MissingApiKey)?;

    let update = HiringStageUpdate {
        candidate_slug: request.candidate_slug.clone(),
        job_slug: request.job_slug.clone(),
        status_id: verdict.decision.status_id(),
        remark: verdict.reason.clone(),
    };
    ats.update_hiring_stage(&api_key, &update).await?;

    Ok(verdict.to_result())
}
