//! Crawl orchestration
//!
//! [`Crawler`] owns the collaborators and configuration; every call to
//! [`Crawler::crawl`] builds a fresh [`CrawlRun`] holding that run's visited
//! set, outstanding-task tracker, worker permits and task handles. Nothing is
//! shared between runs.
//!
//! A run proceeds as:
//!
//! 1. Derive the crawl domain from the seed (an unusable seed ends the run
//!    with an empty report).
//! 2. Submit the seed. Each scheduled page fetches, submits its in-scope links
//!    one level shallower, then extracts its artifacts.
//! 3. Wait until no request is outstanding (or the crawl deadline trips).
//! 4. Stop the run, join every task handle within the shutdown budget and
//!    merge the per-page artifact lists.

use crate::{
    classify_artifact, ArtifactKind, Config, ContentFetcher, CrawlError, DomainScope,
    ErrorSeverity, FetchedPage, HtmlImageProcessor, HtmlLinkExtractor, HttpFetcher, LinkExtractor, Metrics, PageProcessor,
    TaskGuard, TaskTracker, VisitedSet,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, info_span, warn, Instrument, Level};
use url::Url;
use uuid::Uuid;

/// One unit of crawl work.
///
/// `remaining_depth` counts the levels this request may still occupy,
/// itself included; a request at zero is resolved without fetching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    pub url: String,
    pub remaining_depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    /// Fetched, links followed, artifacts extracted
    Processed,
    /// Fetched but not markup; nothing extracted
    Skipped,
    /// Fetch failed or timed out
    FetchFailed,
    /// Fetched and links followed, but artifact extraction failed
    ProcessorFailed,
    /// Scheduled but never started because the run was stopped
    Abandoned,
}

#[derive(Debug, Clone)]
pub struct PageOutcome {
    pub url: String,
    pub status: PageStatus,
    pub artifacts: Vec<String>,
}

impl PageOutcome {
    fn empty(url: &str, status: PageStatus) -> Self {
        Self {
            url: url.to_string(),
            status,
            artifacts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PageRecord {
    pub url: String,
    pub status: PageStatus,
    pub artifact_count: usize,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub run_id: Uuid,
    pub seed: String,
    pub max_depth: usize,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    /// Deduplicated artifacts in sorted order
    pub artifacts: Vec<String>,
    pub artifact_kinds: BTreeMap<ArtifactKind, usize>,
    /// Pages sorted by URL
    pub pages: Vec<PageRecord>,
    pub pages_visited: usize,
    pub pages_failed: usize,
    /// Set when the deadline or the shutdown budget cut the run short
    pub partial: bool,
    /// Why the run did not start, if it did not
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CrawlReport {
    fn new(run_id: Uuid, seed: &str, max_depth: usize) -> Self {
        Self {
            run_id,
            seed: seed.to_string(),
            max_depth,
            started_at: Utc::now(),
            elapsed_ms: 0,
            artifacts: Vec::new(),
            artifact_kinds: BTreeMap::new(),
            pages: Vec::new(),
            pages_visited: 0,
            pages_failed: 0,
            partial: false,
            error: None,
        }
    }

    fn absorb(&mut self, outcomes: Vec<PageOutcome>) {
        let mut artifacts = BTreeSet::new();

        for outcome in outcomes {
            if outcome.status != PageStatus::Abandoned {
                self.pages_visited += 1;
            }
            if matches!(
                outcome.status,
                PageStatus::FetchFailed | PageStatus::ProcessorFailed
            ) {
                self.pages_failed += 1;
            }

            self.pages.push(PageRecord {
                url: outcome.url,
                status: outcome.status,
                artifact_count: outcome.artifacts.len(),
            });
            artifacts.extend(outcome.artifacts);
        }

        for artifact in &artifacts {
            *self
                .artifact_kinds
                .entry(classify_artifact(artifact))
                .or_insert(0) += 1;
        }

        self.pages.sort_by(|a, b| a.url.cmp(&b.url));
        self.artifacts = artifacts.into_iter().collect();
    }

    pub fn page(&self, url: &str) -> Option<&PageRecord> {
        self.pages.iter().find(|p| p.url == url)
    }
}

/// Site crawler that collects page artifacts.
///
/// # Examples
///
/// ```rust,no_run
/// use imagecrawl::{Config, Crawler};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let crawler = Crawler::new(Config::default())?;
///     let images = crawler.crawl("https://example.com/", 2).await;
///     println!("Found {} images", images.len());
///     Ok(())
/// }
/// ```
pub struct Crawler {
    config: Config,
    fetcher: Arc<dyn ContentFetcher>,
    link_extractor: Arc<dyn LinkExtractor>,
    processor: Arc<dyn PageProcessor>,
    metrics: Arc<Metrics>,
}

impl Crawler {
    /// Builds a crawler backed by HTTP fetching and static-markup extraction.
    pub fn new(config: Config) -> Result<Self, CrawlError> {
        let fetcher = HttpFetcher::new(&config)?;
        Self::with_components(
            config,
            Arc::new(fetcher),
            Arc::new(HtmlLinkExtractor::new()),
            Arc::new(HtmlImageProcessor::new()),
        )
    }

    pub fn with_components(
        config: Config,
        fetcher: Arc<dyn ContentFetcher>,
        link_extractor: Arc<dyn LinkExtractor>,
        processor: Arc<dyn PageProcessor>,
    ) -> Result<Self, CrawlError> {
        config.validate()?;

        Ok(Self {
            config,
            fetcher,
            link_extractor,
            processor,
            metrics: Arc::new(Metrics::new()),
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Crawls from `seed_url` and returns the deduplicated artifacts.
    ///
    /// Pages up to `max_depth` links away from the seed are visited; the seed
    /// itself is depth 0. An unusable seed yields an empty list.
    pub async fn crawl(&self, seed_url: &str, max_depth: usize) -> Vec<String> {
        self.crawl_with_report(seed_url, max_depth).await.artifacts
    }

    pub async fn crawl_with_report(&self, seed_url: &str, max_depth: usize) -> CrawlReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("crawl", %run_id, seed = %seed_url.trim());
        self.run(run_id, seed_url, max_depth).instrument(span).await
    }

    async fn run(&self, run_id: Uuid, seed_url: &str, max_depth: usize) -> CrawlReport {
        let start = Instant::now();
        let mut report = CrawlReport::new(run_id, seed_url, max_depth);

        let scope = match DomainScope::from_seed(seed_url) {
            Ok((scope, _)) => scope,
            Err(e) => {
                error!("Not crawling: {}", e);
                report.error = Some(e.to_string());
                return report;
            }
        };

        info!(
            "Starting crawl of {} (domain {}, max depth {}, {} workers)",
            seed_url.trim(),
            scope.domain(),
            max_depth,
            self.config.worker_count
        );

        let (handle_tx, mut handle_rx) = mpsc::unbounded_channel();
        let run = Arc::new(CrawlRun {
            scope,
            visited: VisitedSet::new(),
            tracker: TaskTracker::new(),
            workers: Semaphore::new(self.config.worker_count),
            handles: handle_tx,
            stopped: AtomicBool::new(false),
            fetcher: self.fetcher.clone(),
            link_extractor: self.link_extractor.clone(),
            processor: self.processor.clone(),
            metrics: self.metrics.clone(),
            fetch_timeout: self.config.fetch_timeout,
            process_timeout: self.config.process_timeout,
        });

        // The seed occupies a level of its own.
        let seed_guard = run.tracker.track();
        run.submit(
            CrawlRequest {
                url: seed_url.trim().to_string(),
                remaining_depth: max_depth.saturating_add(1),
            },
            seed_guard,
        );

        let drained = match self.config.crawl_deadline {
            Some(deadline) => timeout(deadline, run.tracker.wait_idle()).await.is_ok(),
            None => {
                run.tracker.wait_idle().await;
                true
            }
        };

        if !drained {
            warn!(
                "Crawl deadline reached with {} request(s) outstanding; returning partial results",
                run.tracker.outstanding()
            );
            report.partial = true;
        }

        run.stop();

        let mut handles = Vec::new();
        while let Ok(handle) = handle_rx.try_recv() {
            handles.push(handle);
        }

        let (outcomes, joined_all) = join_within(handles, self.config.shutdown_timeout).await;
        if !joined_all {
            report.partial = true;
        }

        report.absorb(outcomes);
        report.elapsed_ms = start.elapsed().as_millis() as u64;
        self.metrics.set_outstanding(run.tracker.outstanding());

        info!(
            "Crawl finished: {} URL(s) claimed, {} page(s) visited, {} failed, {} artifact(s) in {}ms{}",
            run.visited.claimed(),
            report.pages_visited,
            report.pages_failed,
            report.artifacts.len(),
            report.elapsed_ms,
            if report.partial { " (partial)" } else { "" }
        );

        report
    }
}

/// Joins every handle, sharing one deadline. Handles still pending at the
/// deadline are aborted; the flag reports whether all of them finished.
async fn join_within(
    handles: Vec<JoinHandle<PageOutcome>>,
    limit: Duration,
) -> (Vec<PageOutcome>, bool) {
    let deadline = tokio::time::Instant::now() + limit;
    let mut outcomes = Vec::with_capacity(handles.len());
    let mut pending = 0;

    for mut handle in handles {
        match tokio::time::timeout_at(deadline, &mut handle).await {
            Ok(Ok(outcome)) => outcomes.push(outcome),
            Ok(Err(e)) => error!("Crawl task ended abnormally: {}", e),
            Err(_) => {
                handle.abort();
                pending += 1;
            }
        }
    }

    if pending > 0 {
        error!(
            "{}; abandoned {} task(s)",
            CrawlError::ShutdownTimeout(limit),
            pending
        );
    }

    (outcomes, pending == 0)
}

/// Level a contained page failure is logged at. Errors a collaborator
/// should never raise for a single page always go to `error`.
fn page_error_level(err: &CrawlError) -> Level {
    if !err.is_page_local() {
        return Level::ERROR;
    }

    match err.severity() {
        ErrorSeverity::Low => Level::INFO,
        ErrorSeverity::Medium => Level::WARN,
        ErrorSeverity::High => Level::ERROR,
    }
}

fn log_page_error(action: &str, url: &str, err: &CrawlError) {
    let level = page_error_level(err);
    if level == Level::ERROR {
        error!("{} {}: {}", action, url, err);
    } else if level == Level::WARN {
        warn!("{} {}: {}", action, url, err);
    } else {
        info!("{} {}: {}", action, url, err);
    }
}

/// Per-run state. Dropped once the last task referencing it finishes.
struct CrawlRun {
    scope: DomainScope,
    visited: VisitedSet,
    tracker: TaskTracker,
    workers: Semaphore,
    handles: mpsc::UnboundedSender<JoinHandle<PageOutcome>>,
    stopped: AtomicBool,
    fetcher: Arc<dyn ContentFetcher>,
    link_extractor: Arc<dyn LinkExtractor>,
    processor: Arc<dyn PageProcessor>,
    metrics: Arc<Metrics>,
    fetch_timeout: Duration,
    process_timeout: Duration,
}

impl CrawlRun {
    /// Accepts a request already counted by `guard` and schedules it unless
    /// it is depth-exhausted, already visited, or the run has stopped.
    fn submit(self: &Arc<Self>, request: CrawlRequest, guard: TaskGuard) {
        if request.remaining_depth == 0 {
            debug!("Depth exhausted, not fetching {}", request.url);
            return;
        }

        if self.stopped.load(Ordering::SeqCst) {
            debug!("Run stopped, not scheduling {}", request.url);
            return;
        }

        if !self.visited.try_visit(&request.url) {
            self.metrics.record_duplicate();
            debug!("Already visited {}", request.url);
            return;
        }

        // Held until the handle is queued, so the run cannot be seen as
        // drained while a finished task's handle is still in transit.
        let registration = self.tracker.track();
        self.metrics.set_outstanding(self.tracker.outstanding());

        let run = Arc::clone(self);
        let handle = tokio::spawn(
            async move {
                let _guard = guard;
                run.execute(request).await
            }
            .in_current_span(),
        );

        if self.handles.send(handle).is_err() {
            warn!("Result collector is gone; a page result will be lost");
        }
        drop(registration);
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.workers.close();
    }

    async fn execute(self: &Arc<Self>, request: CrawlRequest) -> PageOutcome {
        let _permit = match self.workers.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                debug!("Abandoning {}: run stopped while queued", request.url);
                return PageOutcome::empty(&request.url, PageStatus::Abandoned);
            }
        };

        if self.stopped.load(Ordering::SeqCst) {
            return PageOutcome::empty(&request.url, PageStatus::Abandoned);
        }

        self.visit(&request).await
    }

    async fn visit(self: &Arc<Self>, request: &CrawlRequest) -> PageOutcome {
        let url = match Url::parse(request.url.trim()) {
            Ok(url) => url,
            Err(e) => {
                log_page_error(
                    "Not crawling",
                    &request.url,
                    &CrawlError::LinkInvalid(e.to_string()),
                );
                return PageOutcome::empty(&request.url, PageStatus::FetchFailed);
            }
        };

        debug!("Crawling {} ({} level(s) below)", url, request.remaining_depth - 1);

        let started = Instant::now();
        let page = match timeout(self.fetch_timeout, self.fetcher.fetch(&url)).await {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => {
                self.metrics.record_fetch(started.elapsed(), false);
                log_page_error("Failed to crawl", url.as_str(), &e);
                return PageOutcome::empty(&request.url, PageStatus::FetchFailed);
            }
            Err(_) => {
                self.metrics.record_fetch(started.elapsed(), false);
                log_page_error(
                    "Failed to crawl",
                    url.as_str(),
                    &CrawlError::Timeout(self.fetch_timeout),
                );
                return PageOutcome::empty(&request.url, PageStatus::FetchFailed);
            }
        };
        self.metrics.record_fetch(started.elapsed(), true);

        if !page.is_success() {
            warn!("{} answered with HTTP {}", url, page.status);
        }

        if !page.is_markup() {
            self.metrics.record_skip();
            info!(
                "Skipping {}",
                CrawlError::UnsupportedContentType {
                    url: url.to_string(),
                    content_type: page.content_type.clone(),
                }
            );
            return PageOutcome::empty(&request.url, PageStatus::Skipped);
        }

        self.discover(&page, request.remaining_depth - 1);

        match timeout(self.process_timeout, self.processor.extract_artifacts(&page)).await {
            Ok(Ok(artifacts)) => {
                self.metrics.record_artifacts(artifacts.len());
                debug!("{} artifact(s) on {}", artifacts.len(), url);
                PageOutcome {
                    url: request.url.clone(),
                    status: PageStatus::Processed,
                    artifacts,
                }
            }
            Ok(Err(e)) => {
                self.metrics.record_process_failure();
                log_page_error("Artifact extraction failed for", url.as_str(), &e);
                PageOutcome::empty(&request.url, PageStatus::ProcessorFailed)
            }
            Err(_) => {
                self.metrics.record_process_failure();
                log_page_error(
                    "Artifact extraction failed for",
                    url.as_str(),
                    &CrawlError::Timeout(self.process_timeout),
                );
                PageOutcome::empty(&request.url, PageStatus::ProcessorFailed)
            }
        }
    }

    fn discover(self: &Arc<Self>, page: &FetchedPage, remaining_depth: usize) {
        for link in self.link_extractor.extract_links(page) {
            if !self.scope.in_scope(&link) {
                self.metrics.record_out_of_scope();
                debug!("Out of scope: {}", link);
                continue;
            }

            let guard = self.tracker.track();
            self.submit(
                CrawlRequest {
                    url: link,
                    remaining_depth,
                },
                guard,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_error_level_follows_severity() {
        assert_eq!(
            page_error_level(&CrawlError::LinkInvalid("x".to_string())),
            Level::INFO
        );
        assert_eq!(
            page_error_level(&CrawlError::FetchFailed {
                url: "http://a.test/".to_string(),
                reason: "refused".to_string(),
            }),
            Level::WARN
        );
        assert_eq!(
            page_error_level(&CrawlError::Timeout(Duration::from_secs(1))),
            Level::WARN
        );
    }

    #[test]
    fn test_unexpected_page_error_logged_as_error() {
        assert_eq!(
            page_error_level(&CrawlError::IoError("disk full".to_string())),
            Level::ERROR
        );
        assert_eq!(
            page_error_level(&CrawlError::ConfigurationError("bad".to_string())),
            Level::ERROR
        );
    }

    #[test]
    fn test_report_counts_failures_and_sorts() {
        let mut report = CrawlReport::new(Uuid::new_v4(), "http://a.test/", 2);
        report.absorb(vec![
            PageOutcome {
                url: "http://a.test/b".to_string(),
                status: PageStatus::Processed,
                artifacts: vec!["http://a.test/logo.png".to_string()],
            },
            PageOutcome::empty("http://a.test/a", PageStatus::ProcessorFailed),
            PageOutcome::empty("http://a.test/c", PageStatus::Abandoned),
        ]);

        assert_eq!(report.pages_visited, 2);
        assert_eq!(report.pages_failed, 1);
        assert_eq!(report.pages[0].url, "http://a.test/a");
        assert_eq!(report.artifact_kinds.get(&ArtifactKind::Logo), Some(&1));
    }
}
