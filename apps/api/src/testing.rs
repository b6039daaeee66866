//! In-memory stand-ins for the database and external services, used by unit
//! and route tests. Semantics match the real implementations closely enough
//! that claim races and transition guards behave the same.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::ats::models::{AssignedCandidate, AtsJob, HiringStageUpdate};
use crate::ats::{Ats, AtsError};
use crate::config::Config;
use crate::jobs::processor::JobProcessor;
use crate::jobs::store::{lease_expired_message, JobStore, JobStoreError};
use crate::llm_client::LlmError;
use crate::models::analysis::{AnalysisJob, JobStatus, StatusUpdate};
use crate::models::organisation::{Credits, Organisation, OrganisationOverview};
use crate::organisation::store::{CredentialError, CredentialStore, INITIAL_CREDITS};
use crate::resume::ResumeExtractor;
use crate::screening::evaluator::{Decision, EvaluationError, Evaluator, RawVerdict, Verdict};
use crate::screening::request::ScreeningRequest;
use crate::state::AppState;

pub const TEST_PROCESSOR_SECRET: &str = "test-processor-secret";
const TEST_API_KEY: &str = "recruit-key";
const STALE_AFTER: Duration = Duration::from_secs(600);

pub fn screening_payload(candidate_slug: &str, job_slug: &str) -> Value {
    json!({
        "candidateSlug": candidate_slug,
        "jobSlug": job_slug,
        "text": "Five years building Rust services with Tokio and PostgreSQL.",
        "jobDescription": "Backend engineer for a hiring automation platform",
        "skills": ["Rust", "PostgreSQL"]
    })
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        openai_api_key: "sk-test".to_string(),
        llm_base_url: "http://127.0.0.1:9".to_string(),
        llm_model: "gpt-4-turbo".to_string(),
        recruit_crm_base_url: "http://127.0.0.1:9".to_string(),
        recruit_crm_api_key: None,
        processor_secret: Some(TEST_PROCESSOR_SECRET.to_string()),
        stale_processing_secs: STALE_AFTER.as_secs(),
        smtp: None,
        port: 0,
        rust_log: "debug".to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Job store
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: Mutex<Vec<AnalysisJob>>,
}

impl InMemoryJobStore {
    /// Pushes `updated_at` into the past, as if the job had been sitting there.
    pub fn backdate(&self, id: Uuid, by: Duration) {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs.iter_mut().find(|j| j.id == id).unwrap();
        job.updated_at -= chrono::Duration::from_std(by).unwrap();
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(
        &self,
        candidate_slug: &str,
        job_slug: &str,
        request_data: &Value,
    ) -> Result<Uuid, JobStoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        // Strictly increasing creation times keep oldest-first ordering deterministic.
        let mut now = Utc::now();
        if let Some(last) = jobs.last() {
            if now <= last.created_at {
                now = last.created_at + chrono::Duration::milliseconds(1);
            }
        }
        let id = Uuid::new_v4();
        jobs.push(AnalysisJob {
            id,
            status: JobStatus::Pending,
            candidate_slug: candidate_slug.to_string(),
            job_slug: job_slug.to_string(),
            request_data: request_data.clone(),
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }

    async fn get(&self, id: Uuid) -> Result<Option<AnalysisJob>, JobStoreError> {
        let jobs = self.jobs.lock().unwrap();
        Ok(jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn update_status(&self, id: Uuid, update: StatusUpdate) -> Result<(), JobStoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or(JobStoreError::NotFound(id))?;

        let next = update.status();
        if !job.status.can_transition_to(next) {
            return Err(JobStoreError::InvalidTransition {
                id,
                from: job.status,
                to: next,
            });
        }

        job.status = next;
        job.updated_at = Utc::now();
        match update {
            StatusUpdate::Processing => {}
            StatusUpdate::Completed(result) => job.result = Some(result),
            StatusUpdate::Failed(error) => job.error = Some(error),
        }
        Ok(())
    }

    async fn list_pending(&self, limit: u32) -> Result<Vec<AnalysisJob>, JobStoreError> {
        let jobs = self.jobs.lock().unwrap();
        let mut pending: Vec<AnalysisJob> = jobs
            .iter()
            .filter(|j| j.status == JobStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|j| (j.created_at, j.id));
        pending.truncate(limit as usize);
        Ok(pending)
    }

    async fn claim(&self, id: Uuid) -> Result<bool, JobStoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        match jobs
            .iter_mut()
            .find(|j| j.id == id && j.status == JobStatus::Pending)
        {
            Some(job) => {
                job.status = JobStatus::Processing;
                job.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn claim_next(&self) -> Result<Option<AnalysisJob>, JobStoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        let oldest = jobs
            .iter_mut()
            .filter(|j| j.status == JobStatus::Pending)
            .min_by_key(|j| (j.created_at, j.id));
        Ok(oldest.map(|job| {
            job.status = JobStatus::Processing;
            job.updated_at = Utc::now();
            job.clone()
        }))
    }

    async fn expire_stale(&self, max_age: Duration) -> Result<u64, JobStoreError> {
        let cutoff = Utc::now() - chrono::Duration::from_std(max_age).unwrap();
        let mut jobs = self.jobs.lock().unwrap();
        let mut expired = 0;
        for job in jobs
            .iter_mut()
            .filter(|j| j.status == JobStatus::Processing && j.updated_at < cutoff)
        {
            job.status = JobStatus::Failed;
            job.error = Some(lease_expired_message(max_age));
            job.updated_at = Utc::now();
            expired += 1;
        }
        Ok(expired)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Evaluator
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub enum StubVerdict {
    Approve(&'static str),
    Decline(&'static str),
    /// The model answered with a result outside the allowed set.
    Malformed,
}

pub struct StubEvaluator {
    verdict: Mutex<StubVerdict>,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl StubEvaluator {
    pub fn set(&self, verdict: StubVerdict) {
        *self.verdict.lock().unwrap() = verdict;
    }

    /// Makes every evaluation take `delay`, like a slow model.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for StubEvaluator {
    fn default() -> Self {
        Self {
            verdict: Mutex::new(StubVerdict::Approve("Strong Rust background")),
            delay: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Evaluator for StubEvaluator {
    async fn evaluate(&self, request: &ScreeningRequest) -> Result<Verdict, EvaluationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if request.text.trim().is_empty() {
            return Err(EvaluationError::EmptyResume);
        }
        let verdict = *self.verdict.lock().unwrap();
        match verdict {
            StubVerdict::Approve(reason) => Ok(Verdict {
                decision: Decision::Approved,
                reason: reason.to_string(),
            }),
            StubVerdict::Decline(reason) => Ok(Verdict {
                decision: Decision::Declined,
                reason: reason.to_string(),
            }),
            StubVerdict::Malformed => {
                let err = serde_json::from_str::<RawVerdict>(r#"{"result": "maybe"}"#).unwrap_err();
                Err(EvaluationError::Llm(LlmError::Parse(err)))
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Credentials
// ────────────────────────────────────────────────────────────────────────────

pub struct StubCredentials {
    /// Plays the role of the environment fallback key.
    default_key: Mutex<Option<String>>,
    organisations: Mutex<Vec<Organisation>>,
}

impl StubCredentials {
    pub fn clear_key(&self) {
        *self.default_key.lock().unwrap() = None;
    }
}

impl Default for StubCredentials {
    fn default() -> Self {
        Self {
            default_key: Mutex::new(Some(TEST_API_KEY.to_string())),
            organisations: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CredentialStore for StubCredentials {
    async fn recruit_api_key(&self, email: Option<&str>) -> Result<Option<String>, CredentialError> {
        let organisations = self.organisations.lock().unwrap();
        let stored = organisations
            .iter()
            .filter(|o| email.map_or(true, |e| o.email == e))
            .find_map(|o| o.recruit_api_key.clone());
        Ok(stored.or_else(|| self.default_key.lock().unwrap().clone()))
    }

    async fn upsert_api_key(
        &self,
        email: &str,
        api_key: &str,
        organisation_name: Option<&str>,
    ) -> Result<Organisation, CredentialError> {
        let mut organisations = self.organisations.lock().unwrap();
        if let Some(existing) = organisations.iter_mut().find(|o| o.email == email) {
            existing.recruit_api_key = Some(api_key.to_string());
            if let Some(name) = organisation_name {
                existing.organisation_name = Some(name.to_string());
            }
            return Ok(existing.clone());
        }

        let organisation = Organisation {
            id: organisations.len() as i64 + 1,
            email: email.to_string(),
            recruit_api_key: Some(api_key.to_string()),
            organisation_name: organisation_name.map(str::to_string),
            created_at: Utc::now(),
        };
        organisations.push(organisation.clone());
        Ok(organisation)
    }

    async fn organisation_overview(
        &self,
        email: &str,
    ) -> Result<Option<OrganisationOverview>, CredentialError> {
        let organisations = self.organisations.lock().unwrap();
        Ok(organisations
            .iter()
            .find(|o| o.email == email)
            .map(|o| OrganisationOverview {
                organisation: o.clone(),
                credits: Credits {
                    organisation_id: o.id,
                    total_credit: INITIAL_CREDITS,
                    purchase_type: "initial".to_string(),
                    created_at: o.created_at,
                },
            }))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ATS
// ────────────────────────────────────────────────────────────────────────────

/// Serves one job (`job-7`) with two candidates and records stage updates.
#[derive(Default)]
pub struct RecordingAts {
    updates: Mutex<Vec<(String, HiringStageUpdate)>>,
    fail: AtomicBool,
}

impl RecordingAts {
    pub fn updates(&self) -> Vec<(String, HiringStageUpdate)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn fail_updates(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    fn job() -> AtsJob {
        serde_json::from_value(json!({
            "slug": "job-7",
            "name": "Backend Engineer",
            "job_description_text": "Backend engineer for a hiring automation platform"
        }))
        .unwrap()
    }
}

#[async_trait]
impl Ats for RecordingAts {
    async fn list_jobs(&self, _api_key: &str) -> Result<Vec<AtsJob>, AtsError> {
        Ok(vec![Self::job()])
    }

    async fn get_job(&self, _api_key: &str, job_slug: &str) -> Result<AtsJob, AtsError> {
        if job_slug == "job-7" {
            Ok(Self::job())
        } else {
            Err(AtsError::NotFound(format!("job {job_slug}")))
        }
    }

    async fn assigned_candidates(
        &self,
        _api_key: &str,
        _job_slug: &str,
        _status_id: Option<u64>,
    ) -> Result<Vec<AssignedCandidate>, AtsError> {
        Ok(serde_json::from_value(json!([
            {
                "candidate": {"slug": "cand-1", "first_name": "Ada", "created_on": "2025-03-01T09:00:00Z"},
                "status": {"status_id": 1, "label": "Applied"}
            },
            {
                "candidate": {"slug": "cand-2", "first_name": "Grace", "created_on": "2025-03-02T14:30:00Z"},
                "status": {"status_id": 1, "label": "Applied"}
            }
        ]))
        .unwrap())
    }

    async fn hiring_pipeline(&self, _api_key: &str) -> Result<Value, AtsError> {
        Ok(json!({
            "data": [
                {"status_id": 523720, "label": "Declined"},
                {"status_id": 523721, "label": "Approved"}
            ]
        }))
    }

    async fn update_hiring_stage(
        &self,
        api_key: &str,
        update: &HiringStageUpdate,
    ) -> Result<(), AtsError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AtsError::Api {
                status: 503,
                message: "pipeline unavailable".to_string(),
            });
        }
        self.updates
            .lock()
            .unwrap()
            .push((api_key.to_string(), update.clone()));
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wiring
// ────────────────────────────────────────────────────────────────────────────

/// Shared fakes; `processor()` and `state()` hand out views over the same instances.
#[derive(Default)]
pub struct Fakes {
    pub jobs: Arc<InMemoryJobStore>,
    pub evaluator: Arc<StubEvaluator>,
    pub credentials: Arc<StubCredentials>,
    pub ats: Arc<RecordingAts>,
}

impl Fakes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn processor(&self) -> JobProcessor {
        self.processor_with_lease(STALE_AFTER)
    }

    pub fn processor_with_lease(&self, stale_after: Duration) -> JobProcessor {
        JobProcessor::new(
            self.jobs.clone(),
            self.evaluator.clone(),
            self.credentials.clone(),
            self.ats.clone(),
            stale_after,
        )
    }

    pub fn state(&self) -> AppState {
        AppState {
            jobs: self.jobs.clone(),
            credentials: self.credentials.clone(),
            evaluator: self.evaluator.clone(),
            ats: self.ats.clone(),
            extractor: ResumeExtractor::new().unwrap(),
            processor: self.processor(),
            mailer: None,
            config: test_config(),
        }
    }
}
