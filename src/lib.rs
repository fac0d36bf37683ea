//! # imagecrawl
//!
//! A concurrent same-site crawler that collects the images found on a
//! website. Starting from a seed URL it follows links within the seed's host
//! (and its subdomains) up to a bounded depth, fetches pages on a fixed-size
//! worker pool, and returns the deduplicated set of image URLs, favicons and
//! logos found along the way.
//!
//! ## Guarantees
//!
//! - Each URL is fetched at most once per run, even when several pages link to
//!   it concurrently.
//! - Pages more than `max_depth` links from the seed are never fetched.
//! - A failing page (network error, timeout, unsupported content, extraction
//!   error) only loses that page's artifacts; the crawl carries on.
//! - The run ends as soon as no work is outstanding, with no polling.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use imagecrawl::{Config, Crawler};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let crawler = Crawler::new(Config::default())?;
//!     let report = crawler.crawl_with_report("https://example.com/", 2).await;
//!
//!     for artifact in &report.artifacts {
//!         println!("{artifact}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Custom collaborators
//!
//! Fetching, link discovery and artifact extraction sit behind the
//! [`ContentFetcher`], [`LinkExtractor`] and [`PageProcessor`] traits and can
//! be swapped through [`Crawler::with_components`].
//!
//! ## CLI Usage
//!
//! ```bash
//! imagecrawl crawl --url https://example.com/ --depth 2 --json
//! imagecrawl --workers 8 --deadline 120 crawl --url https://example.com/
//! ```

/// Configuration and settings for the crawler
pub mod config;

/// Error types and error handling utilities
pub mod error;

/// Seed-domain scoping
pub mod scope;

/// Visited-URL bookkeeping
pub mod visited;

/// Outstanding-work tracking and drain detection
pub mod tracker;

/// Page fetching
pub mod fetcher;

/// Link and artifact extraction
pub mod extract;

/// Crawl orchestration
pub mod crawler;

/// Crawl metrics
pub mod metrics;

/// Command-line interface implementation
pub mod cli;


pub use cli::*;
pub use config::*;
pub use crawler::*;
pub use error::*;
pub use extract::*;
pub use fetcher::*;
pub use self::metrics::*;
pub use scope::*;
pub use tracker::*;
pub use visited::*;
