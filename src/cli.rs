use crate::{Config, CrawlReport, Crawler};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "imagecrawl")]
#[command(about = "Crawl a website and collect the images it serves")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Configuration file path (JSON)")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Number of concurrent page fetches")]
    pub workers: Option<usize>,

    #[arg(long, global = true, help = "Per-page fetch timeout in seconds")]
    pub timeout: Option<u64>,

    #[arg(long, global = true, help = "Crawl-wide deadline in seconds")]
    pub deadline: Option<u64>,

    #[arg(long, global = true, help = "Serve Prometheus metrics on this address")]
    pub metrics_addr: Option<SocketAddr>,

    #[arg(long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Crawl a site and print the artifacts found
    Crawl {
        #[arg(short, long, help = "Seed URL to start from")]
        url: String,

        #[arg(short, long, help = "Maximum link depth from the seed")]
        depth: Option<usize>,

        #[arg(long, help = "Print the full crawl report as JSON")]
        json: bool,
    },

    /// Validate configuration
    Validate {
        #[arg(short, long, help = "Configuration file to validate")]
        config: PathBuf,
    },
}

impl Cli {
    /// Applies command-line overrides on top of a loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(workers) = self.workers {
            config.worker_count = workers;
        }
        if let Some(timeout) = self.timeout {
            config.fetch_timeout = Duration::from_secs(timeout);
        }
        if let Some(deadline) = self.deadline {
            config.crawl_deadline = Some(Duration::from_secs(deadline));
        }
    }
}

pub struct CliRunner {
    pub config: Config,
}

impl CliRunner {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn run(&self, command: Commands) -> anyhow::Result<()> {
        match command {
            Commands::Crawl { url, depth, json } => self.run_crawl(&url, depth, json).await,
            Commands::Validate { config } => self.validate_config(config).await,
        }
    }

    pub async fn run_crawl(&self, url: &str, depth: Option<usize>, json: bool) -> anyhow::Result<()> {
        let depth = depth.unwrap_or(self.config.max_depth);
        let crawler = Crawler::new(self.config.clone())?;
        let report = crawler.crawl_with_report(url, depth).await;

        if let Some(reason) = &report.error {
            anyhow::bail!("crawl did not start: {reason}");
        }

        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }

        if report.partial {
            warn!("Results are partial");
        }

        Ok(())
    }

    pub async fn validate_config(&self, config_path: PathBuf) -> anyhow::Result<()> {
        println!("Validating configuration: {}", config_path.display());

        let config = Config::from_json_file(&config_path).await?;

        println!("Configuration is valid:");
        println!("  Workers: {}", config.worker_count);
        println!("  Default depth: {}", config.max_depth);
        println!("  Fetch timeout: {:?}", config.fetch_timeout);
        println!("  Process timeout: {:?}", config.process_timeout);
        match config.crawl_deadline {
            Some(deadline) => println!("  Crawl deadline: {deadline:?}"),
            None => println!("  Crawl deadline: none"),
        }

        Ok(())
    }
}

fn print_report(report: &CrawlReport) {
    for artifact in &report.artifacts {
        println!("{artifact}");
    }

    info!(
        "{} artifact(s) from {} page(s) ({} failed) in {}ms",
        report.artifacts.len(),
        report.pages_visited,
        report.pages_failed,
        report.elapsed_ms
    );
    for (kind, count) in &report.artifact_kinds {
        info!("  {:?}: {}", kind, count);
    }
}

/// Installs the global fmt subscriber. `RUST_LOG` wins over `verbose`.
pub fn setup_logging(verbose: bool) -> anyhow::Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install logger: {e}"))?;

    Ok(())
}
