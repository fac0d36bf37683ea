use clap::Parser;
use imagecrawl::{install_prometheus_exporter, setup_logging, Cli, CliRunner, Config};
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    setup_logging(args.verbose)?;

    info!("Starting imagecrawl v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args).await?;

    // The recorder has to exist before any metric handle is resolved.
    if let Some(addr) = args.metrics_addr {
        if let Err(e) = install_prometheus_exporter(addr) {
            warn!("Metrics exporter not started: {}", e);
        }
    }

    let cli_runner = CliRunner::new(config);

    let result = tokio::select! {
        result = cli_runner.run(args.command) => result,
        _ = shutdown_signal() => {
            info!("Received shutdown signal, stopping");
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("Application error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn load_config(args: &Cli) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_json_file(path).await?,
        None => Config::default(),
    };

    args.apply_overrides(&mut config);
    config.validate()?;

    info!("Configuration loaded successfully");
    info!("Workers: {}", config.worker_count);
    info!("Fetch timeout: {:?}", config.fetch_timeout);

    Ok(config)
}

#[cfg(unix)]
async fn shutdown_signal() {
    let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {}", e);
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
            return;
        }
    };

    tokio::select! {
        result = signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received SIGINT");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM");
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
