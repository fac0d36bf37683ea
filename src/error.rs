use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CrawlError {
    #[error("Invalid seed URL: {0}")]
    SeedInvalid(String),

    #[error("Invalid link: {0}")]
    LinkInvalid(String),

    #[error("Fetch failed for {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Unsupported content type {content_type:?} for {url}")]
    UnsupportedContentType {
        url: String,
        content_type: Option<String>,
    },

    #[error("Page processing failed for {url}: {reason}")]
    ProcessorFailed { url: String, reason: String },

    #[error("Worker pool did not drain within {0:?}")]
    ShutdownTimeout(Duration),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl CrawlError {
    /// Errors that stay inside a single page's task and never end the run.
    pub fn is_page_local(&self) -> bool {
        matches!(
            self,
            CrawlError::LinkInvalid(_)
                | CrawlError::FetchFailed { .. }
                | CrawlError::Timeout(_)
                | CrawlError::UnsupportedContentType { .. }
                | CrawlError::ProcessorFailed { .. }
        )
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CrawlError::LinkInvalid(_) => ErrorSeverity::Low,
            CrawlError::UnsupportedContentType { .. } => ErrorSeverity::Low,
            CrawlError::SeedInvalid(_) => ErrorSeverity::High,
            CrawlError::ConfigurationError(_) => ErrorSeverity::High,
            CrawlError::ShutdownTimeout(_) => ErrorSeverity::High,
            _ => ErrorSeverity::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
}

impl From<std::io::Error> for CrawlError {
    fn from(err: std::io::Error) -> Self {
        CrawlError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for CrawlError {
    fn from(err: serde_json::Error) -> Self {
        CrawlError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for CrawlError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_default();
        CrawlError::FetchFailed {
            url,
            reason: err.to_string(),
        }
    }
}
