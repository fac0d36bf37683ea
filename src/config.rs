//! Configuration management with serde serialization/deserialization
//!
//! Holds the knobs for one crawler instance: pool size, timeouts, the
//! optional crawl-wide deadline and the HTTP identity used by the default
//! fetcher.

use crate::CrawlError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// User agent sent by the default fetcher. Some sites serve stripped markup
/// to unknown clients, so it mimics a desktop browser.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/90.0.4430.93 Safari/537.36";

/// Main configuration structure for the crawler
///
/// # Examples
///
/// ```rust
/// use imagecrawl::Config;
/// use std::time::Duration;
///
/// let config = Config {
///     worker_count: 8,
///     crawl_deadline: Some(Duration::from_secs(120)),
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Number of pages fetched concurrently (default: 4)
    ///
    /// Work submitted beyond this bound waits for a free slot.
    pub worker_count: usize,

    /// Link depth used when the caller does not pass one (default: 2)
    pub max_depth: usize,

    /// Upper bound for a single page fetch (default: 10 seconds)
    pub fetch_timeout: Duration,

    /// Upper bound for artifact extraction on one page (default: 30 seconds)
    pub process_timeout: Duration,

    /// How long the final join may take once work has drained (default: 30 seconds)
    pub shutdown_timeout: Duration,

    /// Optional wall-clock limit for the whole run
    ///
    /// When it trips, scheduling stops and the collected artifacts are
    /// returned with the report marked partial.
    pub crawl_deadline: Option<Duration>,

    /// User-Agent header for the default HTTP fetcher
    pub user_agent: String,

    /// Redirects followed per fetch (default: 10)
    pub max_redirects: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_count: 4,
            max_depth: 2,
            fetch_timeout: Duration::from_secs(10),
            process_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(30),
            crawl_deadline: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_redirects: 10,
        }
    }
}

impl Config {
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CrawlError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CrawlError> {
        if self.worker_count == 0 {
            return Err(CrawlError::ConfigurationError(
                "Worker count must be greater than 0".to_string(),
            ));
        }

        if self.fetch_timeout.is_zero() {
            return Err(CrawlError::ConfigurationError(
                "Fetch timeout must be greater than 0".to_string(),
            ));
        }

        if self.process_timeout.is_zero() {
            return Err(CrawlError::ConfigurationError(
                "Process timeout must be greater than 0".to_string(),
            ));
        }

        if self.shutdown_timeout.is_zero() {
            return Err(CrawlError::ConfigurationError(
                "Shutdown timeout must be greater than 0".to_string(),
            ));
        }

        if self.user_agent.trim().is_empty() {
            return Err(CrawlError::ConfigurationError(
                "User agent must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.max_depth, 2);
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert!(config.crawl_deadline.is_none());
        assert_ok!(config.validate());
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = Config {
            worker_count: 0,
            ..Default::default()
        };
        assert_err!(config.validate());
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let config = Config {
            fetch_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert_err!(config.validate());

        let config = Config {
            shutdown_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert_err!(config.validate());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{ "worker_count": 2 }"#).unwrap();
        assert_eq!(config.worker_count, 2);
        assert_eq!(config.max_redirects, 10);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
    }

    #[tokio::test]
    async fn test_from_json_file_rejects_invalid() {
        let path = std::env::temp_dir().join(format!("imagecrawl-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, r#"{ "worker_count": 0 }"#).await.unwrap();

        let result = Config::from_json_file(&path).await;
        assert!(matches!(result, Err(CrawlError::ConfigurationError(_))));

        let _ = tokio::fs::remove_file(&path).await;
    }
}
