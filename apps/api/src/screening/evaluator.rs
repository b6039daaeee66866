//! LLM Evaluator: turns a screening request into a typed hiring verdict.
//!
//! Unrecognized or malformed verdicts are errors. They are never coerced into
//! a decline, so a broken model response cannot silently reject a candidate.

use std::borrow::Cow;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::info;

use crate::ats::{STATUS_APPROVED, STATUS_DECLINED};
use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;
use crate::llm_client::{LlmClient, LlmError};
use crate::models::analysis::AnalysisResult;
use crate::screening::prompts::{screening_prompt, SCREENING_SYSTEM};
use crate::screening::request::ScreeningRequest;

/// Resume text beyond this many characters is cut before prompting.
pub const MAX_RESUME_CHARS: usize = 10_000;
/// Job description text beyond this many characters is cut before prompting.
pub const MAX_JOB_DESCRIPTION_CHARS: usize = 2_000;
const MISSING_REASON: &str = "No specific reason provided";

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("LLM evaluation failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Resume text is empty")]
    EmptyResume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Declined,
}

impl Decision {
    /// ATS pipeline stage for this decision.
    pub fn status_id(self) -> u64 {
        match self {
            Decision::Approved => STATUS_APPROVED,
            Decision::Declined => STATUS_DECLINED,
        }
    }
}

/// Exactly the JSON object the prompt asks for.
#[derive(Debug, Deserialize)]
pub struct RawVerdict {
    pub result: Decision,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub decision: Decision,
    pub reason: String,
}

impl From<RawVerdict> for Verdict {
    fn from(raw: RawVerdict) -> Self {
        let reason = raw
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| MISSING_REASON.to_string());
        Verdict {
            decision: raw.result,
            reason,
        }
    }
}

impl Verdict {
    pub fn to_result(&self) -> AnalysisResult {
        match self.decision {
            Decision::Approved => AnalysisResult {
                score: 100,
                status: "Approved".to_string(),
                suitable: true,
                summary: format!("Candidate approved: {}", self.reason),
                cold_email: String::new(),
            },
            Decision::Declined => AnalysisResult {
                score: 0,
                status: "Declined".to_string(),
                suitable: false,
                summary: format!("Candidate declined: {}", self.reason),
                cold_email: String::new(),
            },
        }
    }
}

#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, request: &ScreeningRequest) -> Result<Verdict, EvaluationError>;
}

pub struct LlmEvaluator {
    llm: LlmClient,
}

impl LlmEvaluator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Evaluator for LlmEvaluator {
    async fn evaluate(&self, request: &ScreeningRequest) -> Result<Verdict, EvaluationError> {
        if request.text.trim().is_empty() {
            return Err(EvaluationError::EmptyResume);
        }

        let prompt = build_prompt(request);
        let system = format!("{SCREENING_SYSTEM}\n\n{JSON_ONLY_INSTRUCTION}");
        let raw: RawVerdict = self.llm.call_json(&prompt, &system).await?;
        let verdict = Verdict::from(raw);

        info!(
            "Candidate {} on job {} evaluated: {:?}",
            request.candidate_slug, request.job_slug, verdict.decision
        );
        Ok(verdict)
    }
}

/// Builds the user prompt with resume and job description capped to fixed sizes.
pub fn build_prompt(request: &ScreeningRequest) -> String {
    let resume = truncate_chars(&request.text, MAX_RESUME_CHARS);
    let job_description = truncate_chars(request.job_description_text(), MAX_JOB_DESCRIPTION_CHARS);
    let candidate = json!({
        "resume": resume,
        "id": request.candidate_slug,
    });
    screening_prompt(
        &job_description,
        &candidate.to_string(),
        &request.candidate_attributes(),
    )
}

/// Cuts `text` to at most `max` characters (not bytes), marking the cut with `...`.
pub fn truncate_chars(text: &str, max: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => Cow::Owned(format!("{}...", &text[..byte_idx])),
        None => Cow::Borrowed(text),
    }
}
