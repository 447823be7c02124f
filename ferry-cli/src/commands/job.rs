//! Job command handlers
//!
//! Handles listing, inspecting and creating import jobs.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use ferry_core::domain::job::{Job, JobId, JobStatus, SourceProgress};
use ferry_core::dto::job::CreateJob;
use std::collections::HashMap;

use super::watch;
use crate::config::Config;

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// List all jobs
    List,
    /// Get job details
    Get {
        /// Job ID
        id: JobId,
    },
    /// Create a new import job
    Create {
        /// Source to import (repeatable, e.g. --source products --source carts)
        #[arg(long = "source", required = true)]
        sources: Vec<String>,

        /// Credentials per source as JSON, e.g. '{"products":{"apiKey":"..."}}'
        #[arg(long)]
        credentials: String,

        /// Follow the new job until every job settles
        #[arg(long)]
        watch: bool,
    },
}

/// Handle job commands
pub async fn handle_job_command(command: JobCommands, config: &Config) -> Result<()> {
    match command {
        JobCommands::List => list_jobs(config).await,
        JobCommands::Get { id } => get_job(config, id).await,
        JobCommands::Create {
            sources,
            credentials,
            watch,
        } => create_job(config, sources, &credentials, watch).await,
    }
}

/// List all jobs
async fn list_jobs(config: &Config) -> Result<()> {
    let client = config.client()?;
    let jobs = client.list_jobs().await.context("Failed to list jobs")?;

    if jobs.is_empty() {
        println!("{}", "No jobs yet.".yellow());
    } else {
        println!("{}", format!("Found {} job(s):", jobs.len()).bold());
        println!();
        for job in &jobs {
            print_job_summary(job);
        }
    }

    Ok(())
}

/// Get and display a single job
async fn get_job(config: &Config, id: JobId) -> Result<()> {
    let client = config.client()?;
    let job = client
        .get_job(id)
        .await
        .with_context(|| format!("Failed to get job {}", id))?;

    print_job_details(&job);

    Ok(())
}

/// Create a job, optionally following it afterwards
async fn create_job(
    config: &Config,
    sources: Vec<String>,
    credentials: &str,
    follow: bool,
) -> Result<()> {
    let credentials: HashMap<String, HashMap<String, String>> =
        serde_json::from_str(credentials).context("--credentials must be a JSON object")?;

    let client = config.client()?;
    let created = client
        .create_job(CreateJob {
            selected_sources: sources,
            credentials,
        })
        .await
        .context("Failed to create job")?;

    println!(
        "{} Created job {} ({})",
        "✓".green(),
        created.job_id.to_string().cyan(),
        colorize_status(created.status)
    );

    if follow {
        watch::run(config, true, Some(created.job_id)).await?;
    }

    Ok(())
}

/// Print a one-block job summary
pub(crate) fn print_job_summary(job: &Job) {
    println!(
        "  {} Job #{}  {}",
        "▸".cyan(),
        job.id,
        colorize_status(job.status)
    );
    println!("    Sources: {}", job.selected_sources.join(", ").dimmed());
    for (source, progress) in &job.progress {
        println!("    {:<10} {}", source, format_progress(progress));
    }
    if let Some(error) = &job.error {
        println!("    {}", error.red());
    }
    println!();
}

/// Print detailed job information
fn print_job_details(job: &Job) {
    println!("{}", "Job Details:".bold());
    println!("  ID:       {}", job.id.to_string().cyan());
    println!("  Status:   {}", colorize_status(job.status));
    println!("  Sources:  {}", job.selected_sources.join(", "));
    println!("  Created:  {}", job.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("  Updated:  {}", job.updated_at.format("%Y-%m-%d %H:%M:%S"));

    let elapsed = job.updated_at.signed_duration_since(job.created_at);
    println!("  Elapsed:  {}s", elapsed.num_seconds());

    if !job.progress.is_empty() {
        println!("\n{}", "Progress:".bold());
        for (source, progress) in &job.progress {
            println!("  {:<10} {}", source.cyan(), format_progress(progress));
        }
    }

    if let Some(error) = &job.error {
        println!("\n{}", "Error:".bold());
        println!("{}", error.red());
    }
}

/// Render `completed / total` with a small bar
fn format_progress(progress: &SourceProgress) -> String {
    const WIDTH: usize = 20;
    let filled = (progress.fraction() * WIDTH as f64).round() as usize;
    let bar = format!("{}{}", "#".repeat(filled), ".".repeat(WIDTH - filled));
    let bar = match progress.status {
        JobStatus::Completed => bar.green(),
        JobStatus::Failed => bar.red(),
        _ => bar.normal(),
    };
    format!(
        "[{}] {:>4} / {:<4} {}",
        bar,
        progress.completed,
        progress.total,
        colorize_status(progress.status)
    )
}

/// Colorize job status for display
pub(crate) fn colorize_status(status: JobStatus) -> ColoredString {
    let status_str = status.to_string();
    match status {
        JobStatus::Pending => status_str.yellow(),
        JobStatus::Running => status_str.cyan(),
        JobStatus::Completed => status_str.green(),
        JobStatus::Failed => status_str.red(),
    }
}
