use std::sync::Arc;

use crate::ats::Ats;
use crate::config::Config;
use crate::jobs::processor::JobProcessor;
use crate::jobs::store::JobStore;
use crate::organisation::store::CredentialStore;
use crate::reports::mailer::ReportMailer;
use crate::resume::ResumeExtractor;
use crate::screening::evaluator::Evaluator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<dyn JobStore>,
    pub credentials: Arc<dyn CredentialStore>,
    pub evaluator: Arc<dyn Evaluator>,
    pub ats: Arc<dyn Ats>,
    pub extractor: ResumeExtractor,
    /// Shares the same store, evaluator and ATS handles as the fields above.
    pub processor: JobProcessor,
    /// `None` when SMTP is not configured; the report endpoint then refuses.
    pub mailer: Option<Arc<ReportMailer>>,
    pub config: Config,
}
