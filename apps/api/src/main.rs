mod ats;
mod config;
mod db;
mod errors;
mod jobs;
mod llm_client;
mod models;
mod organisation;
mod reports;
mod resume;
mod routes;
mod screening;
mod state;
#[cfg(test)]
mod testing;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::ats::RecruitCrmClient;
use crate::config::Config;
use crate::db::create_pool;
use crate::jobs::processor::JobProcessor;
use crate::jobs::store::PgJobStore;
use crate::llm_client::LlmClient;
use crate::organisation::store::PgCredentialStore;
use crate::reports::mailer::ReportMailer;
use crate::resume::ResumeExtractor;
use crate::routes::build_router;
use crate::screening::evaluator::LlmEvaluator;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Screener API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs embedded migrations)
    let db = create_pool(&config.database_url).await?;

    let jobs = Arc::new(PgJobStore::new(db.clone()));
    let credentials = Arc::new(PgCredentialStore::new(
        db,
        config.recruit_crm_api_key.clone(),
    ));

    // Initialize LLM client
    let llm = LlmClient::new(
        config.openai_api_key.clone(),
        config.llm_base_url.clone(),
        config.llm_model.clone(),
    )?;
    info!("LLM client initialized (model: {})", llm.model());
    let evaluator = Arc::new(LlmEvaluator::new(llm));

    let ats = Arc::new(RecruitCrmClient::new(&config.recruit_crm_base_url)?);
    info!("ATS client initialized ({})", config.recruit_crm_base_url);

    let extractor = ResumeExtractor::new()?;

    let mailer = match &config.smtp {
        Some(smtp) => {
            let mailer = ReportMailer::from_config(smtp)?;
            info!("Report mailer initialized (relay: {})", smtp.relay);
            Some(Arc::new(mailer))
        }
        None => {
            warn!("SMTP not configured; report emails are disabled");
            None
        }
    };

    if config.processor_secret.is_none() {
        warn!("PROCESSOR_SECRET not set; the job processing endpoint will reject every call");
    }

    let processor = JobProcessor::new(
        jobs.clone(),
        evaluator.clone(),
        credentials.clone(),
        ats.clone(),
        Duration::from_secs(config.stale_processing_secs),
    );

    // Build app state
    let state = AppState {
        jobs,
        credentials,
        evaluator,
        ats,
        extractor,
        processor,
        mailer,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the dashboard host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
