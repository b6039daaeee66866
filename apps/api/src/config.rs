use anyhow::{bail, Context, Result};

use crate::ats::DEFAULT_BASE_URL as DEFAULT_RECRUIT_CRM_BASE_URL;
use crate::jobs::processor::MAX_SCREENING_DURATION;
use crate::llm_client::{DEFAULT_BASE_URL as DEFAULT_LLM_BASE_URL, DEFAULT_MODEL};

/// Seconds a job may sit in `processing` before the next invocation fails it.
/// Must stay above `MAX_SCREENING_DURATION`.
const DEFAULT_STALE_PROCESSING_SECS: u64 = 600;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub openai_api_key: String,
    pub llm_base_url: String,
    pub llm_model: String,
    pub recruit_crm_base_url: String,
    /// Used when no organisation in the database has stored a key.
    pub recruit_crm_api_key: Option<String>,
    /// Bearer secret guarding the job processing endpoint. Unset = endpoint always 401.
    pub processor_secret: Option<String>,
    pub stale_processing_secs: u64,
    pub smtp: Option<SmtpConfig>,
    pub port: u16,
    pub rust_log: String,
}

/// SMTP settings for the analysis report mailer. All four must be present.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub relay: String,
    pub username: String,
    pub password: String,
    pub from: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            openai_api_key: require_env("OPENAI_API_KEY")?,
            llm_base_url: optional_env("LLM_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            llm_model: optional_env("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            recruit_crm_base_url: optional_env("RECRUIT_CRM_BASE_URL")
                .unwrap_or_else(|| DEFAULT_RECRUIT_CRM_BASE_URL.to_string()),
            recruit_crm_api_key: optional_env("RECRUIT_CRM_API_KEY"),
            processor_secret: optional_env("PROCESSOR_SECRET"),
            stale_processing_secs: stale_processing_secs(optional_env("STALE_PROCESSING_SECS"))?,
            smtp: smtp_from_env(),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn smtp_from_env() -> Option<SmtpConfig> {
    Some(SmtpConfig {
        relay: optional_env("SMTP_RELAY")?,
        username: optional_env("SMTP_USERNAME")?,
        password: optional_env("SMTP_PASSWORD")?,
        from: optional_env("REPORT_FROM")?,
    })
}

/// A lease shorter than the slowest possible screening run would let the next
/// invocation fail a job that is still running.
fn stale_processing_secs(raw: Option<String>) -> Result<u64> {
    let secs = match raw {
        Some(v) => v
            .trim()
            .parse::<u64>()
            .context("STALE_PROCESSING_SECS must be a whole number of seconds")?,
        None => DEFAULT_STALE_PROCESSING_SECS,
    };
    let floor = MAX_SCREENING_DURATION.as_secs();
    if secs <= floor {
        bail!("STALE_PROCESSING_SECS must be greater than {floor}, the longest a screening run can take");
    }
    Ok(secs)
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Blank values count as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
