pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::ats::handlers as ats;
use crate::jobs::handlers as jobs;
use crate::organisation::handlers as organisation;
use crate::reports::handlers as reports;
use crate::resume::handlers as resume;
use crate::screening::handlers as screening;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // ATS proxy
        .route("/api/v1/ats/jobs", get(ats::handle_list_jobs))
        .route("/api/v1/ats/candidates", get(ats::handle_list_candidates))
        // Resume text
        .route("/api/v1/resumes/extract", post(resume::handle_extract))
        // Analysis
        .route("/api/v1/analyze", post(screening::handle_analyze))
        .route("/api/v1/analyze/jobs", post(jobs::handle_enqueue))
        .route(
            "/api/v1/analyze/jobs/pending",
            get(jobs::handle_list_pending),
        )
        .route("/api/v1/analyze/jobs/:id", get(jobs::handle_get_job))
        .route("/api/v1/analyze/process", post(jobs::handle_process))
        // Organisation settings
        .route(
            "/api/v1/organisation",
            get(organisation::handle_get_organisation),
        )
        .route(
            "/api/v1/organisation/api-key",
            get(organisation::handle_api_key_status).put(organisation::handle_save_api_key),
        )
        // Reports
        .route("/api/v1/reports/email", post(reports::handle_email_report))
        .with_state(state)
}
