//! Ferry CLI
//!
//! Command-line interface for listing, creating and watching import jobs.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use ferry_client::Credentials;
use ferry_watcher::WatchConfig;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Log filter used when `RUST_LOG` is unset
const DEFAULT_LOG_FILTER: &str = "ferry=info,ferry_watcher=info,ferry_client=warn";

#[derive(Parser)]
#[command(name = "ferry")]
#[command(about = "Import job client", long_about = None)]
struct Cli {
    /// Import API base URL
    #[arg(
        long,
        env = "FERRY_API_URL",
        default_value = ferry_watcher::config::DEFAULT_API_URL
    )]
    api_url: String,

    /// Bearer token for the current session
    #[arg(long, env = "FERRY_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Delay between two polls of in-flight jobs, in milliseconds
    #[arg(long, env = "FERRY_POLL_INTERVAL_MS", default_value_t = 2000)]
    poll_interval_ms: u64,

    /// Per-request timeout, in seconds
    #[arg(long, env = "FERRY_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    request_timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let watch = WatchConfig::new(cli.api_url, cli.token)
        .with_poll_interval(Duration::from_millis(cli.poll_interval_ms))
        .with_request_timeout(Duration::from_secs(cli.request_timeout_secs));
    watch.validate()?;

    let config = Config {
        credentials: Credentials::new(watch.token.clone()),
        watch,
    };

    handle_command(cli.command, &config).await
}
