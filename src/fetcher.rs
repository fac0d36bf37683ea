//! Page fetching
//!
//! The crawler only needs a page's body and content type. [`ContentFetcher`]
//! is the seam; [`HttpFetcher`] is the reqwest-backed default.

use crate::{Config, CrawlError};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, redirect::Policy, Client};
use tracing::debug;
use url::Url;

/// A fetched page, whatever its HTTP status was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// The URL that was requested
    pub url: Url,
    /// The URL after redirects; relative links resolve against this
    pub final_url: Url,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl FetchedPage {
    pub fn is_markup(&self) -> bool {
        self.content_type
            .as_deref()
            .map(is_markup_content_type)
            .unwrap_or(false)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Whether a `Content-Type` value denotes a document links can be read from:
/// any `text/*`, `application/xml`, or an `application/*+xml` type.
pub fn is_markup_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    mime.starts_with("text/")
        || mime == "application/xml"
        || (mime.starts_with("application/") && mime.ends_with("+xml"))
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetches `url`. Non-2xx responses are returned, not raised.
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, CrawlError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Result<Self, CrawlError> {
        let client = Client::builder()
            .timeout(config.fetch_timeout)
            .user_agent(config.user_agent.clone())
            .redirect(Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| CrawlError::ConfigurationError(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, CrawlError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| CrawlError::FetchFailed {
                url: url.to_string(),
                reason: if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.to_string()
                },
            })?;

        let status = response.status();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        debug!("Fetched {} ({}, {:?})", url, status, content_type);

        let body = response.text().await?;

        Ok(FetchedPage {
            url: url.clone(),
            final_url,
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}
