use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::info;

use crate::config::SmtpConfig;
use crate::reports::render::AnalysisReport;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("{0}")]
    Address(String),

    #[error("Failed to build email: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Sends analysis reports through an authenticated SMTP relay.
pub struct ReportMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl ReportMailer {
    pub fn from_config(config: &SmtpConfig) -> Result<Self, MailError> {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.relay)?
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }

    pub async fn send_report(&self, to: &str, report: &AnalysisReport) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.parse().map_err(|e| MailError::Address(format!("{e}")))?)
            .to(to.parse().map_err(|e| MailError::Address(format!("{e}")))?)
            .subject(report.subject())
            .header(ContentType::TEXT_HTML)
            .body(report.to_html())?;

        self.transport.send(message).await?;
        info!(
            "Sent analysis report with {} candidate(s) to {to}",
            report.entries.len()
        );
        Ok(())
    }
}
