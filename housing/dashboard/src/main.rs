use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use housing_dashboard::{serve, SessionCache};
use housing_pricing::{PricingConfig, PricingTelemetry};
use shared_event_bus::FileEventPublisher;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "housing-dashboard", version, about = "Housing price prediction dashboard")]
struct Cli {
    /// TOML config; defaults to $HOUSING_CONFIG or ./housing.toml.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides `[dashboard] bind`.
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Append pipeline events to this JSON-lines file.
    #[arg(long)]
    event_log: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let config = PricingConfig::load_or_discover(cli.config.as_deref())
        .context("loading configuration")?;
    let addr = match cli.bind {
        Some(addr) => addr,
        None => config
            .dashboard
            .bind
            .parse()
            .with_context(|| format!("invalid dashboard.bind `{}`", config.dashboard.bind))?,
    };

    let mut builder = PricingTelemetry::builder("dashboard")
        .log_path(config.log_path("dashboard"))
        .min_level(config.logging.level);
    if let Some(path) = &cli.event_log {
        builder = builder.event_publisher(Arc::new(FileEventPublisher::new(path)?));
    }
    let telemetry = builder.build()?;

    let cache = SessionCache::global(config, Some(telemetry));
    serve(addr, cache).await
}
