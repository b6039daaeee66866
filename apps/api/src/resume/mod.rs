//! Resume Extractor: downloads a PDF by URL and converts it to plain text.

use std::time::Duration;

use reqwest::{Client, Url};
use thiserror::Error;
use tracing::debug;

pub mod handlers;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Invalid resume URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to download PDF: {0}")]
    Download(#[from] reqwest::Error),

    #[error("PDF download returned status {0}")]
    Status(u16),

    #[error("Failed to extract text from PDF: {0}")]
    Parse(String),

    #[error("PDF contains no extractable text")]
    Empty,

    #[error("PDF extraction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Clone)]
pub struct ResumeExtractor {
    client: Client,
}

impl ResumeExtractor {
    pub fn new() -> Result<Self, ExtractionError> {
        Ok(Self {
            client: Client::builder().timeout(DOWNLOAD_TIMEOUT).build()?,
        })
    }

    /// Fetches `url` and returns the PDF's text. Never returns partial text.
    pub async fn extract_from_url(&self, url: &str) -> Result<String, ExtractionError> {
        let url = parse_http_url(url)?;

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        debug!("Downloaded {} bytes of PDF from {}", bytes.len(), url);

        extract_text(bytes.to_vec()).await
    }
}

/// Runs `pdf-extract` on the blocking pool; PDF parsing is CPU-bound.
pub async fn extract_text(pdf_bytes: Vec<u8>) -> Result<String, ExtractionError> {
    let text = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem(&pdf_bytes).map(|s| s.trim().to_string())
    })
    .await?
    .map_err(|err| ExtractionError::Parse(err.to_string()))?;

    if text.is_empty() {
        return Err(ExtractionError::Empty);
    }
    Ok(text)
}

fn parse_http_url(raw: &str) -> Result<Url, ExtractionError> {
    let url = Url::parse(raw.trim()).map_err(|e| ExtractionError::InvalidUrl(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ExtractionError::InvalidUrl(format!(
            "unsupported scheme '{other}'"
        ))),
    }
}
