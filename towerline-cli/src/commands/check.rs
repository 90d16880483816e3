//! Check command: verify the connection before a pipeline relies on it

use anyhow::{Context, Result};
use colored::*;

use crate::config::Config;
use towerline_client::TowerClient;

/// Ping the server and verify that it accepts our credentials
pub async fn handle_check(config: &Config) -> Result<()> {
    let client = TowerClient::new(config.profile()).context("Failed to build the HTTP client")?;
    if client.credentials().is_anonymous() {
        println!(
            "{}",
            "No credentials configured, checking anonymously".yellow()
        );
    }

    let version = client
        .ping()
        .await
        .context("The server did not answer the ping endpoint")?;
    match version {
        Some(version) => println!("Server version: {}", version.to_string().bold()),
        None => println!("Server reachable, version unknown"),
    }

    client
        .test_connection()
        .await
        .context("The server rejected an authenticated request")?;
    println!("{}", "Authentication OK".green());

    Ok(())
}
