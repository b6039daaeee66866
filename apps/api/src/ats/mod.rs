//! ATS client: authenticated REST calls to RecruitCRM.
//!
//! The API key is passed per call because it belongs to an organisation row,
//! not to the process. `Ats` is the seam the processor and handlers depend on.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

pub mod handlers;
pub mod models;

use models::{AssignedCandidate, AtsJob, DataEnvelope, HiringStageBody, HiringStageUpdate};

pub const DEFAULT_BASE_URL: &str = "https://api.recruitcrm.io/v1";
/// Pipeline stage a candidate moves to when the model approves them.
pub const STATUS_APPROVED: u64 = 523721;
/// Pipeline stage a candidate moves to when the model declines them.
pub const STATUS_DECLINED: u64 = 523720;
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum AtsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ATS returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("ATS resource not found: {0}")]
    NotFound(String),
}

#[async_trait]
pub trait Ats: Send + Sync {
    async fn list_jobs(&self, api_key: &str) -> Result<Vec<AtsJob>, AtsError>;

    async fn get_job(&self, api_key: &str, job_slug: &str) -> Result<AtsJob, AtsError>;

    async fn assigned_candidates(
        &self,
        api_key: &str,
        job_slug: &str,
        status_id: Option<u64>,
    ) -> Result<Vec<AssignedCandidate>, AtsError>;

    /// Raw hiring pipeline definition; passed through to clients untouched.
    async fn hiring_pipeline(&self, api_key: &str) -> Result<Value, AtsError>;

    async fn update_hiring_stage(
        &self,
        api_key: &str,
        update: &HiringStageUpdate,
    ) -> Result<(), AtsError>;
}

#[derive(Clone)]
pub struct RecruitCrmClient {
    client: Client,
    base_url: String,
}

impl RecruitCrmClient {
    pub fn new(base_url: &str) -> Result<Self, AtsError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn get(&self, api_key: &str, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(api_key)
            .header("Accept", "application/json")
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        resource: &str,
    ) -> Result<T, AtsError> {
        let response = check_status(request.send().await?, resource).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Maps non-2xx responses to `AtsError`, keeping 404 distinct.
async fn check_status(response: Response, resource: &str) -> Result<Response, AtsError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status.as_u16() == 404 {
        return Err(AtsError::NotFound(resource.to_string()));
    }
    let message = response.text().await.unwrap_or_default();
    Err(AtsError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl Ats for RecruitCrmClient {
    async fn list_jobs(&self, api_key: &str) -> Result<Vec<AtsJob>, AtsError> {
        let envelope: DataEnvelope<AtsJob> =
            self.fetch_json(self.get(api_key, "/jobs"), "jobs").await?;
        debug!("Fetched {} jobs from ATS", envelope.data.len());
        Ok(envelope.data)
    }

    async fn get_job(&self, api_key: &str, job_slug: &str) -> Result<AtsJob, AtsError> {
        self.fetch_json(
            self.get(api_key, &format!("/jobs/{job_slug}")),
            &format!("job {job_slug}"),
        )
        .await
    }

    async fn assigned_candidates(
        &self,
        api_key: &str,
        job_slug: &str,
        status_id: Option<u64>,
    ) -> Result<Vec<AssignedCandidate>, AtsError> {
        let mut request = self.get(api_key, &format!("/jobs/{job_slug}/assigned-candidates"));
        if let Some(status_id) = status_id {
            request = request.query(&[("status_id", status_id)]);
        }
        let envelope: DataEnvelope<AssignedCandidate> = self
            .fetch_json(request, &format!("candidates for job {job_slug}"))
            .await?;
        debug!(
            "Fetched {} assigned candidates for job {job_slug}",
            envelope.data.len()
        );
        Ok(envelope.data)
    }

    async fn hiring_pipeline(&self, api_key: &str) -> Result<Value, AtsError> {
        self.fetch_json(self.get(api_key, "/hiring-pipelines/0"), "hiring pipeline")
            .await
    }

    async fn update_hiring_stage(
        &self,
        api_key: &str,
        update: &HiringStageUpdate,
    ) -> Result<(), AtsError> {
        let url = format!(
            "{}/candidates/{}/hiring-stages/{}",
            self.base_url, update.candidate_slug, update.job_slug
        );
        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(&HiringStageBody {
                status_id: update.status_id,
                remark: &update.remark,
            })
            .send()
            .await?;
        check_status(
            response,
            &format!(
                "candidate {} on job {}",
                update.candidate_slug, update.job_slug
            ),
        )
        .await?;

        info!(
            "Moved candidate {} on job {} to stage {}",
            update.candidate_slug, update.job_slug, update.status_id
        );
        Ok(())
    }
}
