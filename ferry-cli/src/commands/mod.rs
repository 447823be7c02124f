//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod job;
mod watch;

pub use job::JobCommands;
pub use watch::WatchArgs;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Import job management
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
    /// Follow jobs live until interrupted
    Watch(WatchArgs),
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Job { command } => job::handle_job_command(command, config).await,
        Commands::Watch(args) => watch::handle_watch(args, config).await,
    }
}
