//! Towerline CLI
//!
//! Command-line interface for running Ansible Tower / AWX job and
//! workflow templates from CI pipelines. A run launches a template,
//! streams its output, waits for completion, and hands exported
//! variables back to the pipeline.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "towerline")]
#[command(about = "Run Ansible Tower / AWX templates from CI pipelines", long_about = None)]
struct Cli {
    /// Tower / AWX base URL
    #[arg(long, env = "TOWER_URL")]
    url: String,

    /// Username for basic authentication
    #[arg(long, env = "TOWER_USERNAME")]
    username: Option<String>,

    /// Password for basic authentication
    #[arg(long, env = "TOWER_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// OAuth token; wins over username/password when both are given
    #[arg(long, env = "TOWER_OAUTH_TOKEN", hide_env_values = true)]
    oauth_token: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long)]
    insecure: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "towerline_cli=info,towerline_client=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = Config {
        base_url: cli.url,
        username: cli.username,
        password: cli.password,
        oauth_token: cli.oauth_token,
        insecure: cli.insecure,
    };
    config.validate()?;

    handle_command(cli.command, &config).await
}
