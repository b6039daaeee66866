use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// RecruitCRM list endpoints wrap their items in `{"data": [...]}`.
#[derive(Debug, Deserialize)]
pub struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// A job opening. Only the fields the screener reads are typed; the rest pass through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtsJob {
    #[serde(deserialize_with = "string_or_number")]
    pub slug: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub job_description_text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of `GET /jobs/{slug}/assigned-candidates`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignedCandidate {
    pub candidate: Candidate,
    #[serde(default)]
    pub status: Option<CandidateStage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(deserialize_with = "string_or_number")]
    pub slug: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_on: Option<String>,
    #[serde(default)]
    pub resume: Option<ResumeFile>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeFile {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub file_link: Option<String>,
}

/// Current hiring stage of a candidate against the job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateStage {
    #[serde(default)]
    pub status_id: Option<u64>,
    #[serde(default)]
    pub label: Option<String>,
}

/// A hiring-stage transition pushed back to the ATS.
#[derive(Debug, Clone, PartialEq)]
pub struct HiringStageUpdate {
    pub candidate_slug: String,
    pub job_slug: String,
    pub status_id: u64,
    pub remark: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct HiringStageBody<'a> {
    pub status_id: u64,
    pub remark: &'a str,
}

impl Candidate {
    /// Calendar date the candidate was created, accepting RFC 3339 or a bare date prefix.
    pub fn created_on_date(&self) -> Option<NaiveDate> {
        let raw = self.created_on.as_deref()?.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.date_naive());
        }
        raw.get(..10)
            .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
    }
}

/// Keeps only candidates created on `date`. Candidates without a parseable date are dropped.
pub fn filter_by_created_on(
    candidates: Vec<AssignedCandidate>,
    date: NaiveDate,
) -> Vec<AssignedCandidate> {
    candidates
        .into_iter()
        .filter(|c| c.candidate.created_on_date() == Some(date))
        .collect()
}

/// RecruitCRM is inconsistent about whether slugs are strings or numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number slug, got {other}"
        ))),
    }
}
