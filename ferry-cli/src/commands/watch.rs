//! Watch command
//!
//! Loads the job list once, then lets the reconciler poll in-flight jobs and
//! prints the collection every time a new view is published.

use anyhow::{Result, anyhow};
use clap::Args;
use colored::*;
use ferry_core::domain::job::JobId;
use ferry_watcher::{CollectionView, HttpJobRepository, JobListLoader, JobRepository, Reconciler};
use std::sync::Arc;
use tracing::{info, warn};

use super::job::print_job_summary;
use crate::config::Config;

/// Arguments of `ferry watch`
#[derive(Args)]
pub struct WatchArgs {
    /// Exit once no job is pending or running
    #[arg(long)]
    until_idle: bool,
}

/// Handle `ferry watch`
pub async fn handle_watch(args: WatchArgs, config: &Config) -> Result<()> {
    run(config, args.until_idle, None).await
}

/// Follow the job collection until interrupted (or idle)
///
/// # Arguments
/// * `config` - The CLI configuration
/// * `until_idle` - Stop once every job is terminal
/// * `created` - A freshly created job to track even if the list lags behind
pub(crate) async fn run(config: &Config, until_idle: bool, created: Option<JobId>) -> Result<()> {
    let repo: Arc<dyn JobRepository> = Arc::new(HttpJobRepository::new(config.client()?));
    let loader = JobListLoader::new(Arc::clone(&repo), config.credentials.clone());
    let reconciler = Reconciler::new(Arc::clone(&repo), config.watch.poll_interval);

    if let Err(e) = loader.refresh(&reconciler).await {
        if e.is_unauthorized() {
            return Err(anyhow!("Session rejected, set a fresh FERRY_TOKEN: {}", e));
        }
        return Err(anyhow!(e).context("Failed to load jobs"));
    }

    if let Some(id) = created {
        match repo.fetch_one(id).await {
            Ok(job) => reconciler.admit(job),
            Err(e) => warn!("Could not fetch created job {}: {}", id, e),
        }
    }

    let mut views = reconciler.subscribe();
    render(&views.borrow_and_update());

    let result = loop {
        if until_idle && reconciler.active_ids().is_empty() {
            info!("No job in flight, stopping");
            break Ok(());
        }

        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let view = Arc::clone(&views.borrow_and_update());
                render(&view);

                if view.last_tick.as_ref().is_some_and(|report| report.all_unauthorized()) {
                    config.credentials.clear();
                    break Err(anyhow!("Every poll was rejected as unauthorized, session expired"));
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break Ok(());
            }
        }
    };

    reconciler.dispose();
    result
}

/// Print the current collection
fn render(view: &CollectionView) {
    println!(
        "{}",
        format!(
            "── {} job(s), {} in flight (rev {}) ──",
            view.jobs.len(),
            view.active.len(),
            view.revision
        )
        .dimmed()
    );

    if view.jobs.is_empty() {
        println!("{}", "No jobs yet.".yellow());
        return;
    }

    for job in &view.jobs {
        print_job_summary(job);
    }

    if let Some(report) = &view.last_tick {
        if !report.failures.is_empty() {
            println!(
                "{}",
                format!(
                    "{} job(s) could not be refreshed, retrying next cycle",
                    report.failures.len()
                )
                .yellow()
            );
        }
    }
}
