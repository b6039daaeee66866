use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of an analysis job. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// States a job may be in immediately before entering `self`.
    /// `pending -> failed` covers jobs that could not be started at all.
    pub fn predecessors(&self) -> &'static [JobStatus] {
        match self {
            JobStatus::Pending => &[],
            JobStatus::Processing => &[JobStatus::Pending],
            JobStatus::Completed => &[JobStatus::Processing],
            JobStatus::Failed => &[JobStatus::Pending, JobStatus::Processing],
        }
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        next.predecessors().contains(self)
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(format!("Invalid analysis job status: {s}")),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome recorded on a completed job. Shape is shared with the synchronous
/// analyze endpoint, so clients render both the same way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub score: i32,
    pub status: String,
    pub suitable: bool,
    pub summary: String,
    /// Reserved for outreach copy; always empty today.
    #[serde(default)]
    pub cold_email: String,
}

/// A status transition together with the payload that state requires.
/// Completed jobs always carry a result and failed jobs always carry an error.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    Processing,
    Completed(AnalysisResult),
    Failed(String),
}

impl StatusUpdate {
    pub fn status(&self) -> JobStatus {
        match self {
            StatusUpdate::Processing => JobStatus::Processing,
            StatusUpdate::Completed(_) => JobStatus::Completed,
            StatusUpdate::Failed(_) => JobStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisJob {
    pub id: Uuid,
    pub status: JobStatus,
    pub candidate_slug: String,
    pub job_slug: String,
    pub request_data: Value,
    pub result: Option<AnalysisResult>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct AnalysisJobRow {
    pub id: Uuid,
    pub status: String,
    pub candidate_slug: String,
    pub job_slug: String,
    pub request_data: Value,
    pub result: Option<Json<AnalysisResult>>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AnalysisJobRow> for AnalysisJob {
    type Error = String;

    fn try_from(row: AnalysisJobRow) -> Result<Self, Self::Error> {
        Ok(AnalysisJob {
            id: row.id,
            status: row.status.parse()?,
            candidate_slug: row.candidate_slug,
            job_slug: row.job_slug,
            request_data: row.request_data,
            result: row.result.map(|Json(result)| result),
            error: row.error,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
