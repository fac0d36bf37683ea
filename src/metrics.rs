use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

/// Handles for the crawler's metrics.
///
/// Handles are resolved against whatever recorder is installed when the
/// struct is built; without one they are no-ops.
pub struct Metrics {
    pub pages_fetched: Counter,
    pub pages_failed: Counter,
    pub pages_skipped: Counter,
    pub duplicates: Counter,
    pub out_of_scope: Counter,
    pub artifacts: Counter,
    pub fetch_duration: Histogram,
    pub outstanding_tasks: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            pages_fetched: counter!("imagecrawl_pages_fetched_total"),
            pages_failed: counter!("imagecrawl_pages_failed_total"),
            pages_skipped: counter!("imagecrawl_pages_skipped_total"),
            duplicates: counter!("imagecrawl_duplicates_total"),
            out_of_scope: counter!("imagecrawl_out_of_scope_total"),
            artifacts: counter!("imagecrawl_artifacts_total"),
            fetch_duration: histogram!("imagecrawl_fetch_duration_seconds"),
            outstanding_tasks: gauge!("imagecrawl_outstanding_tasks"),
        }
    }

    pub fn record_fetch(&self, duration: Duration, success: bool) {
        if success {
            self.pages_fetched.increment(1);
        } else {
            self.pages_failed.increment(1);
        }

        self.fetch_duration.record(duration.as_secs_f64());
    }

    /// A fetched page whose artifact extraction failed or timed out.
    pub fn record_process_failure(&self) {
        self.pages_failed.increment(1);
    }

    pub fn record_skip(&self) {
        self.pages_skipped.increment(1);
    }

    pub fn record_duplicate(&self) {
        self.duplicates.increment(1);
    }

    pub fn record_out_of_scope(&self) {
        self.out_of_scope.increment(1);
    }

    pub fn record_artifacts(&self, count: usize) {
        self.artifacts.increment(count as u64);
    }

    pub fn set_outstanding(&self, count: usize) {
        self.outstanding_tasks.set(count as f64);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs a global Prometheus recorder with a scrape endpoint on `addr`.
///
/// Must be called from inside a tokio runtime, before any [`Metrics`] is built.
pub fn install_prometheus_exporter(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    info!("Serving Prometheus metrics on http://{}/metrics", addr);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_metrics_do_not_panic() {
        let metrics = Metrics::new();
        metrics.record_fetch(Duration::from_millis(25), true);
        metrics.record_fetch(Duration::from_millis(25), false);
        metrics.record_process_failure();
        metrics.record_skip();
        metrics.record_duplicate();
        metrics.record_out_of_scope();
        metrics.record_artifacts(3);
        metrics.set_outstanding(7);
    }
}
