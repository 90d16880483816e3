//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod check;
mod run;

pub use run::RunArgs;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Launch a template and follow it to completion
    Run(RunArgs),
    /// Verify connectivity, credentials, and the server version
    Check,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Run(args) => run::handle_run(args, config).await,
        Commands::Check => check::handle_check(config).await,
    }
}
