//! Job Processor: runs exactly one pending analysis job per invocation.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::ats::{self, Ats};
use crate::jobs::store::{JobStore, JobStoreError};
use crate::llm_client;
use crate::models::analysis::{AnalysisJob, AnalysisResult, JobStatus, StatusUpdate};
use crate::organisation::store::CredentialStore;
use crate::screening::evaluator::Evaluator;
use crate::screening::request::ScreeningRequest;
use crate::screening::{screen_candidate, ScreeningError};

/// Longest one screening run can take before its HTTP clients give up.
/// The processing lease must be longer than this.
pub const MAX_SCREENING_DURATION: Duration = Duration::from_secs(
    llm_client::MAX_CALL_DURATION.as_secs() + ats::REQUEST_TIMEOUT.as_secs(),
);

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Analysis job {0} not found")]
    NotFound(Uuid),

    #[error("Analysis job {job_id} is not pending (status: {status})")]
    NotPending { job_id: Uuid, status: JobStatus },

    /// The job left `processing` (lease expiry) while this run was still
    /// screening it, so the terminal write was rejected.
    #[error("Analysis job {job_id} ran past its processing lease and is now {status}")]
    LeaseLost {
        job_id: Uuid,
        status: JobStatus,
        ats_updated: bool,
    },

    #[error(transparent)]
    Store(#[from] JobStoreError),
}

/// Why a claimed job ended up `failed`. The display text becomes the job's `error`.
#[derive(Debug, Error)]
enum JobFailure {
    #[error("Invalid request data: {0}")]
    InvalidRequest(#[from] serde_json::Error),

    #[error(transparent)]
    Screening(#[from] ScreeningError),
}

/// Terminal state of a job this invocation ran.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedJob {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub result: Option<AnalysisResult>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// Nothing was pending.
    Idle,
    Finished(ProcessedJob),
}

#[derive(Clone)]
pub struct JobProcessor {
    jobs: Arc<dyn JobStore>,
    evaluator: Arc<dyn Evaluator>,
    credentials: Arc<dyn CredentialStore>,
    ats: Arc<dyn Ats>,
    stale_after: Duration,
}

impl JobProcessor {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        evaluator: Arc<dyn Evaluator>,
        credentials: Arc<dyn CredentialStore>,
        ats: Arc<dyn Ats>,
        stale_after: Duration,
    ) -> Self {
        Self {
            jobs,
            evaluator,
            credentials,
            ats,
            stale_after,
        }
    }

    /// Claims `target` (or the oldest pending job) and drives it to a terminal state.
    ///
    /// Errors are only returned when no job was claimed, or when the final status
    /// write itself fails; every failure after the claim is recorded on the job.
    pub async fn process(&self, target: Option<Uuid>) -> Result<ProcessOutcome, ProcessError> {
        if let Err(err) = self.jobs.expire_stale(self.stale_after).await {
            warn!("Could not expire stale analysis jobs: {err}");
        }

        let job = match target {
            Some(id) => self.claim_by_id(id).await?,
            None => match self.jobs.claim_next().await? {
                Some(job) => job,
                None => {
                    info!("No pending analysis jobs");
                    return Ok(ProcessOutcome::Idle);
                }
            },
        };

        info!(
            "Processing analysis job {} (candidate {}, job {})",
            job.id, job.candidate_slug, job.job_slug
        );

        let update = match self.run(&job).await {
            Ok(result) => StatusUpdate::Completed(result),
            Err(failure) => {
                error!("Analysis job {} failed: {failure}", job.id);
                StatusUpdate::Failed(failure.to_string())
            }
        };

        let processed = ProcessedJob {
            job_id: job.id,
            status: update.status(),
            result: match &update {
                StatusUpdate::Completed(result) => Some(result.clone()),
                _ => None,
            },
            error: match &update {
                StatusUpdate::Failed(message) => Some(message.clone()),
                _ => None,
            },
        };

        match self.jobs.update_status(job.id, update).await {
            Ok(()) => {}
            Err(JobStoreError::InvalidTransition { from, .. }) => {
                let ats_updated = processed.status == JobStatus::Completed;
                error!(
                    "Analysis job {} was moved to {from} while running; its {} outcome was dropped (ATS updated: {ats_updated})",
                    job.id, processed.status
                );
                return Err(ProcessError::LeaseLost {
                    job_id: job.id,
                    status: from,
                    ats_updated,
                });
            }
            Err(err) => return Err(err.into()),
        }
        info!("Analysis job {} finished as {}", job.id, processed.status);

        Ok(ProcessOutcome::Finished(processed))
    }

    async fn claim_by_id(&self, id: Uuid) -> Result<AnalysisJob, ProcessError> {
        let job = self.jobs.get(id).await?.ok_or(ProcessError::NotFound(id))?;
        if !job.status.can_transition_to(JobStatus::Processing) {
            return Err(ProcessError::NotPending {
                job_id: id,
                status: job.status,
            });
        }

        if !self.jobs.claim(id).await? {
            // Another invocation claimed it between the read and the update.
            let status = self
                .jobs
                .get(id)
                .await?
                .map(|j| j.status)
                .unwrap_or(JobStatus::Processing);
            return Err(ProcessError::NotPending { job_id: id, status });
        }

        Ok(job)
    }

    /// Works from the stored snapshot only; the ATS is not re-read.
    async fn run(&self, job: &AnalysisJob) -> Result<AnalysisResult, JobFailure> {
        let request = ScreeningRequest::from_request_data(&job.request_data)?;
        let result = screen_candidate(
            self.evaluator.as_ref(),
            self.credentials.as_ref(),
            self.ats.as_ref(),
            &request,
        )
        .await?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ats::{STATUS_APPROVED, STATUS_DECLINED};
    use crate::testing::{screening_payload, Fakes, StubVerdict};
    use serde_json::json;

    async fn enqueue(fakes: &Fakes, candidate: &str) -> Uuid {
        fakes
            .jobs
            .create(candidate, "job-7", &screening_payload(candidate, "job-7"))
            .await
            .unwrap()
    }

    fn finished(outcome: ProcessOutcome) -> ProcessedJob {
        match outcome {
            ProcessOutcome::Finished(job) => job,
            ProcessOutcome::Idle => panic!("expected a processed job"),
        }
    }

    #[tokio::test]
    async fn test_process_completes_job_and_pushes_stage() {
        let fakes = Fakes::new();
        let id = enqueue(&fakes, "cand-1").await;

        let processed = finished(fakes.processor().process(Some(id)).await.unwrap());
        assert_eq!(processed.status, JobStatus::Completed);
        assert!(processed.error.is_none());

        let job = fakes.jobs.get(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result, processed.result);
        assert!(job.error.is_none());

        let updates = fakes.ats.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, "recruit-key");
        assert_eq!(updates[0].1.candidate_slug, "cand-1");
        assert_eq!(updates[0].1.status_id, STATUS_APPROVED);
    }

    #[tokio::test]
    async fn test_declined_verdict_completes_with_declined_stage() {
        let fakes = Fakes::new();
        fakes.evaluator.set(StubVerdict::Decline("No backend experience"));
        let id = enqueue(&fakes, "cand-2").await;

        let processed = finished(fakes.processor().process(Some(id)).await.unwrap());
        let result = processed.result.unwrap();
        assert_eq!(result.score, 0);
        assert!(!result.suitable);
        assert_eq!(fakes.ats.updates()[0].1.status_id, STATUS_DECLINED);
        assert_eq!(fakes.ats.updates()[0].1.remark, "No backend experience");
    }

    #[tokio::test]
    async fn test_process_without_id_takes_oldest_pending() {
        let fakes = Fakes::new();
        let first = enqueue(&fakes, "cand-a").await;
        let second = enqueue(&fakes, "cand-b").await;

        let processed = finished(fakes.processor().process(None).await.unwrap());
        assert_eq!(processed.job_id, first);

        let still_pending = fakes.jobs.get(second).await.unwrap().unwrap();
        assert_eq!(still_pending.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_process_is_idle_when_nothing_pending() {
        let fakes = Fakes::new();
        let outcome = fakes.processor().process(None).await.unwrap();
        assert_eq!(outcome, ProcessOutcome::Idle);
    }

    #[tokio::test]
    async fn test_invalid_llm_output_fails_job_without_ats_call() {
        let fakes = Fakes::new();
        fakes.evaluator.set(StubVerdict::Malformed);
        let id = enqueue(&fakes, "cand-3").await;

        let processed = finished(fakes.processor().process(Some(id)).await.unwrap());
        assert_eq!(processed.status, JobStatus::Failed);

        let job = fakes.jobs.get(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.result.is_none());
        assert!(job.error.is_some());
        assert!(fakes.ats.updates().is_empty());
    }

    #[tokio::test]
    async fn test_missing_credential_fails_job() {
        let fakes = Fakes::new();
        fakes.credentials.clear_key();
        let id = enqueue(&fakes, "cand-4").await;

        finished(fakes.processor().process(Some(id)).await.unwrap());

        let job = fakes.jobs.get(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.result.is_none());
        assert!(job.error.unwrap().contains("API key"));
        assert!(fakes.ats.updates().is_empty());
    }

    #[tokio::test]
    async fn test_ats_push_failure_fails_job() {
        let fakes = Fakes::new();
        fakes.ats.fail_updates();
        let id = enqueue(&fakes, "cand-5").await;

        let processed = finished(fakes.processor().process(Some(id)).await.unwrap());
        assert_eq!(processed.status, JobStatus::Failed);
        assert!(processed.result.is_none());
        assert!(processed.error.unwrap().contains("ATS"));
    }

    #[tokio::test]
    async fn test_unparseable_snapshot_fails_job() {
        let fakes = Fakes::new();
        let id = fakes
            .jobs
            .create("cand-6", "job-7", &json!({"unexpected": true}))
            .await
            .unwrap();

        let processed = finished(fakes.processor().process(Some(id)).await.unwrap());
        assert_eq!(processed.status, JobStatus::Failed);
        assert!(processed.error.unwrap().starts_with("Invalid request data"));
        assert_eq!(fakes.evaluator.calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_and_finished_jobs_are_rejected() {
        let fakes = Fakes::new();
        let processor = fakes.processor();

        let missing = Uuid::new_v4();
        assert!(matches!(
            processor.process(Some(missing)).await,
            Err(ProcessError::NotFound(id)) if id == missing
        ));

        let id = enqueue(&fakes, "cand-7").await;
        processor.process(Some(id)).await.unwrap();
        assert!(matches!(
            processor.process(Some(id)).await,
            Err(ProcessError::NotPending { status: JobStatus::Completed, .. })
        ));
        assert_eq!(fakes.ats.updates().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_processors_claim_job_once() {
        let fakes = Fakes::new();
        let id = enqueue(&fakes, "cand-8").await;
        let (a, b) = (fakes.processor(), fakes.processor());

        let (first, second) = tokio::join!(a.process(Some(id)), b.process(Some(id)));
        let outcomes = [first, second];

        let finished_count = outcomes
            .iter()
            .filter(|o| matches!(o, Ok(ProcessOutcome::Finished(_))))
            .count();
        let rejected_count = outcomes
            .iter()
            .filter(|o| matches!(o, Err(ProcessError::NotPending { .. })))
            .count();
        assert_eq!(finished_count, 1);
        assert_eq!(rejected_count, 1);
        assert_eq!(fakes.evaluator.calls(), 1);
        assert_eq!(fakes.ats.updates().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_processing_job_is_expired_on_next_run() {
        let fakes = Fakes::new();
        let stuck = enqueue(&fakes, "cand-9").await;
        assert!(fakes.jobs.claim(stuck).await.unwrap());
        fakes.jobs.backdate(stuck, Duration::from_secs(900));

        let outcome = fakes.processor().process(None).await.unwrap();
        assert_eq!(outcome, ProcessOutcome::Idle);

        let job = fakes.jobs.get(stuck).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.result.is_none());
        assert!(job.error.unwrap().contains("abandoned"));
    }

    #[tokio::test]
    async fn test_job_expired_mid_run_reports_lost_lease() {
        let fakes = Fakes::new();
        fakes.evaluator.set_delay(Duration::from_millis(300));
        let id = enqueue(&fakes, "cand-10").await;
        let lease = Duration::from_millis(100);
        let (slow, late) = (fakes.processor_with_lease(lease), fakes.processor_with_lease(lease));

        let (slow_outcome, late_outcome) = tokio::join!(slow.process(Some(id)), async {
            tokio::time::sleep(Duration::from_millis(150)).await;
            late.process(None).await
        });

        assert_eq!(late_outcome.unwrap(), ProcessOutcome::Idle);
        assert!(matches!(
            slow_outcome,
            Err(ProcessError::LeaseLost {
                status: JobStatus::Failed,
                ats_updated: true,
                ..
            })
        ));
        assert_eq!(fakes.ats.updates().len(), 1);

        let job = fakes.jobs.get(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.unwrap().contains("within 0.1s"));
    }

    #[test]
    fn test_screening_bound_includes_llm_and_ats_timeouts() {
        assert_eq!(MAX_SCREENING_DURATION, Duration::from_secs(393));
    }
}
