//! Analysis Job Store: durable record of analysis requests and their outcomes.
//!
//! Every status write is a conditional UPDATE guarded by the allowed predecessor
//! states, so two workers can never both move the same job out of `pending`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::models::analysis::{AnalysisJob, AnalysisJobRow, JobStatus, StatusUpdate};

const JOB_COLUMNS: &str = "id, status, candidate_slug, job_slug, request_data, result, error, created_at, updated_at";

#[derive(Debug, Error)]
pub enum JobStoreError {
    #[error("Analysis job {0} not found")]
    NotFound(Uuid),

    #[error("Analysis job {id} cannot move from '{from}' to '{to}'")]
    InvalidTransition {
        id: Uuid,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Corrupt analysis job row: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Inserts a `pending` job holding `request_data` as an immutable snapshot.
    async fn create(
        &self,
        candidate_slug: &str,
        job_slug: &str,
        request_data: &Value,
    ) -> Result<Uuid, JobStoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<AnalysisJob>, JobStoreError>;

    /// Moves a job forward. Only `status`, `updated_at` and the carried
    /// result/error are written.
    async fn update_status(&self, id: Uuid, update: StatusUpdate) -> Result<(), JobStoreError>;

    /// Oldest-first pending jobs, at most `limit`.
    async fn list_pending(&self, limit: u32) -> Result<Vec<AnalysisJob>, JobStoreError>;

    /// `pending -> processing` for one job. False if another worker got there first
    /// or the job was never pending.
    async fn claim(&self, id: Uuid) -> Result<bool, JobStoreError>;

    /// Claims the oldest pending job, if any.
    async fn claim_next(&self) -> Result<Option<AnalysisJob>, JobStoreError>;

    /// Fails jobs stuck in `processing` for longer than `max_age`. Returns how many.
    async fn expire_stale(&self, max_age: Duration) -> Result<u64, JobStoreError>;
}

/// Error text written to jobs whose processing lease ran out.
pub fn lease_expired_message(max_age: Duration) -> String {
    format!(
        "Processing did not finish within {}s; the job was abandoned",
        max_age.as_secs_f64()
    )
}

pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn current_status(&self, id: Uuid) -> Result<Option<JobStatus>, JobStoreError> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM analysis_jobs WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        status
            .map(|s| s.parse::<JobStatus>().map_err(JobStoreError::Corrupt))
            .transpose()
    }
}

fn into_job(row: AnalysisJobRow) -> Result<AnalysisJob, JobStoreError> {
    AnalysisJob::try_from(row).map_err(JobStoreError::Corrupt)
}

#[async_trait]
impl JobStore for PgJobStore {
    #[instrument(skip(self, request_data))]
    async fn create(
        &self,
        candidate_slug: &str,
        job_slug: &str,
        request_data: &Value,
    ) -> Result<Uuid, JobStoreError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO analysis_jobs
                (id, status, candidate_slug, job_slug, request_data, created_at, updated_at)
            VALUES ($1, 'pending', $2, $3, $4, $5, $5)
            "#,
        )
        .bind(id)
        .bind(candidate_slug)
        .bind(job_slug)
        .bind(request_data)
        .bind(now)
        .execute(&self.pool)
        .await?;

        info!("Created analysis job {id}");
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn get(&self, id: Uuid) -> Result<Option<AnalysisJob>, JobStoreError> {
        let row = sqlx::query_as::<_, AnalysisJobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM analysis_jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(into_job).transpose()
    }

    #[instrument(skip(self, update), fields(status = %update.status()))]
    async fn update_status(&self, id: Uuid, update: StatusUpdate) -> Result<(), JobStoreError> {
        let next = update.status();
        let allowed: Vec<String> = next
            .predecessors()
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();
        let now = Utc::now();

        let query = match &update {
            StatusUpdate::Processing => sqlx::query(
                "UPDATE analysis_jobs SET status = $1, updated_at = $2 WHERE id = $3 AND status = ANY($4)",
            )
            .bind(next.as_str())
            .bind(now)
            .bind(id)
            .bind(allowed),
            StatusUpdate::Completed(result) => sqlx::query(
                "UPDATE analysis_jobs SET status = $1, updated_at = $2, result = $3 WHERE id = $4 AND status = ANY($5)",
            )
            .bind(next.as_str())
            .bind(now)
            .bind(Json(result.clone()))
            .bind(id)
            .bind(allowed),
            StatusUpdate::Failed(error) => sqlx::query(
                "UPDATE analysis_jobs SET status = $1, updated_at = $2, error = $3 WHERE id = $4 AND status = ANY($5)",
            )
            .bind(next.as_str())
            .bind(now)
            .bind(error.clone())
            .bind(id)
            .bind(allowed),
        };

        let outcome = query.execute(&self.pool).await?;
        if outcome.rows_affected() == 1 {
            return Ok(());
        }

        match self.current_status(id).await? {
            None => Err(JobStoreError::NotFound(id)),
            Some(from) => Err(JobStoreError::InvalidTransition { id, from, to: next }),
        }
    }

    #[instrument(skip(self))]
    async fn list_pending(&self, limit: u32) -> Result<Vec<AnalysisJob>, JobStoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, AnalysisJobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM analysis_jobs WHERE status = 'pending' ORDER BY created_at ASC, id ASC LIMIT $1"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(into_job).collect()
    }

    #[instrument(skip(self))]
    async fn claim(&self, id: Uuid) -> Result<bool, JobStoreError> {
        let outcome = sqlx::query(
            "UPDATE analysis_jobs SET status = 'processing', updated_at = $1 WHERE id = $2 AND status = 'pending'",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(outcome.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn claim_next(&self) -> Result<Option<AnalysisJob>, JobStoreError> {
        let row = sqlx::query_as::<_, AnalysisJobRow>(&format!(
            r#"
            UPDATE analysis_jobs
            SET status = 'processing', updated_at = $1
            WHERE id = (
                SELECT id FROM analysis_jobs
                WHERE status = 'pending'
                ORDER BY created_at ASC, id ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        row.map(into_job).transpose()
    }

    #[instrument(skip(self))]
    async fn expire_stale(&self, max_age: Duration) -> Result<u64, JobStoreError> {
        let max_age_chrono = chrono::Duration::from_std(max_age)
            .map_err(|e| JobStoreError::Corrupt(format!("invalid lease duration: {e}")))?;
        let now = Utc::now();

        let outcome = sqlx::query(
            r#"
            UPDATE analysis_jobs
            SET status = 'failed', error = $1, updated_at = $2
            WHERE status = 'processing' AND updated_at < $3
            "#,
        )
        .bind(lease_expired_message(max_age))
        .bind(now)
        .bind(now - max_age_chrono)
        .execute(&self.pool)
        .await?;

        let expired = outcome.rows_affected();
        if expired > 0 {
            warn!("Expired {expired} analysis job(s) stuck in processing");
        }
        Ok(expired)
    }
}
