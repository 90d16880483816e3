//! Run command: launch a template and follow it to completion
//!
//! Drives the whole lifecycle: resolve the template, warn about values
//! the template will not prompt for, launch, stream output while polling
//! for completion, then report the outcome and the exported variables.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::*;
use tokio::time::sleep;
use towerline_client::{EventSink, RunningJob, StreamOptions, TowerClient};
use towerline_core::{LaunchSpec, TemplateDetail, TemplateKind};
use tracing::debug;

use crate::config::Config;

/// Arguments for the run command
#[derive(Args)]
pub struct RunArgs {
    /// Template name or numeric ID
    #[arg(long)]
    pub template: String,

    /// Template kind: job or workflow
    #[arg(long, default_value = "job")]
    pub kind: TemplateKind,

    /// Variables passed to the run, JSON or YAML
    #[arg(long)]
    pub extra_vars: Option<String>,

    /// Host pattern to limit the run to
    #[arg(long)]
    pub limit: Option<String>,

    /// Comma-separated tags to run
    #[arg(long)]
    pub job_tags: Option<String>,

    /// Comma-separated tags to skip
    #[arg(long)]
    pub skip_tags: Option<String>,

    /// Job type override (run or check)
    #[arg(long)]
    pub job_type: Option<String>,

    /// Inventory name or numeric ID
    #[arg(long)]
    pub inventory: Option<String>,

    /// Comma-separated credential names or numeric IDs
    #[arg(long)]
    pub credentials: Option<String>,

    /// Print the run's own output into this log
    #[arg(long)]
    pub import_logs: bool,

    /// Keep ANSI color codes in imported output
    #[arg(long)]
    pub keep_color: bool,

    /// Also import the output of a workflow's child runs
    #[arg(long)]
    pub import_child_logs: bool,

    /// Seconds between polls while the run is active
    #[arg(long, default_value_t = 3)]
    pub poll_interval: u64,

    /// Write exported variables and the outcome as KEY=VALUE lines
    #[arg(long)]
    pub exports_file: Option<std::path::PathBuf>,
}

/// Prints streamed lines straight to stdout
struct StdoutSink;

impl EventSink for StdoutSink {
    fn line(&mut self, line: &str) {
        println!("{line}");
    }
}

/// Launch a template and follow it until the server reports an outcome
pub async fn handle_run(args: RunArgs, config: &Config) -> Result<()> {
    let client = TowerClient::new(config.profile()).context("Failed to build the HTTP client")?;
    if client.credentials().is_anonymous() {
        println!(
            "{}",
            "No credentials configured, connecting anonymously".yellow()
        );
    }

    let spec = LaunchSpec {
        extra_vars: args.extra_vars,
        limit: args.limit,
        job_tags: args.job_tags,
        skip_tags: args.skip_tags,
        job_type: args.job_type,
        inventory: args.inventory,
        credentials: args.credentials,
    }
    .normalized();
    debug!(?spec, "assembled launch parameters");

    let template = client
        .get_template(&args.template, args.kind)
        .await
        .context("Failed to look up the template")?;
    warn_about_ignored_fields(&template, &spec);

    let mut job = client
        .launch(template.id, &spec, args.kind)
        .await
        .context("Failed to launch the template")?;
    let job_url = client.job_url(job.id, job.kind);
    println!(
        "Launched {} as run {}: {}",
        template.name.bold(),
        job.id,
        job_url.underline()
    );

    let options = StreamOptions {
        emit_output: args.import_logs,
        strip_ansi: !args.keep_color,
        follow_workflow_children: args.import_child_logs,
    };
    let interval = Duration::from_secs(args.poll_interval);
    let mut sink = StdoutSink;

    loop {
        client
            .poll_events(&mut job, &options, &mut sink)
            .await
            .context("Failed to stream run output")?;
        if client
            .is_completed(&mut job)
            .await
            .context("Failed to poll the run status")?
        {
            break;
        }
        wait_or_abort(interval).await?;
    }
    // One last drain picks up output that landed with the final status.
    client
        .poll_events(&mut job, &options, &mut sink)
        .await
        .context("Failed to stream run output")?;

    let failed = client
        .is_failed(&job)
        .await
        .context("Failed to read the run outcome")?;
    let result = if failed { "FAILED" } else { "SUCCESS" };

    for (key, value) in job.exports().iter() {
        println!("{} {key}={value}", "export".cyan());
    }
    if let Some(path) = &args.exports_file {
        write_exports_file(path, &job, &job_url, result)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    if failed {
        bail!("Tower failed to complete the requested run, see {job_url}");
    }
    println!(
        "{}",
        format!("Run {} finished successfully", job.id).green()
    );
    Ok(())
}

/// Sleep between polls, aborting outright on Ctrl-C
async fn wait_or_abort(interval: Duration) -> Result<()> {
    tokio::select! {
        _ = sleep(interval) => Ok(()),
        _ = tokio::signal::ctrl_c() => bail!("interrupted while waiting for the run to finish"),
    }
}

/// Warn when a populated value is one the template will not prompt for
///
/// The server silently ignores such values, so each one is called out
/// before the launch. A template that does not report the flag at all
/// stays quiet.
fn warn_about_ignored_fields(template: &TemplateDetail, spec: &LaunchSpec) {
    let checks = [
        (
            spec.extra_vars.is_some(),
            template.ask_variables_on_launch,
            "extra variables",
        ),
        (spec.limit.is_some(), template.ask_limit_on_launch, "a limit"),
        (
            spec.job_tags.is_some(),
            template.ask_tags_on_launch,
            "job tags",
        ),
        (
            spec.skip_tags.is_some(),
            template.ask_skip_tags_on_launch,
            "skip tags",
        ),
        (
            spec.job_type.is_some(),
            template.ask_job_type_on_launch,
            "a job type",
        ),
        (
            spec.inventory.is_some(),
            template.ask_inventory_on_launch,
            "an inventory",
        ),
        (
            spec.credentials.is_some(),
            template.ask_credential_on_launch,
            "credentials",
        ),
    ];
    for (given, prompts, field) in checks {
        if given && prompts == Some(false) {
            println!(
                "{}",
                format!(
                    "[WARNING] The template does not prompt for {field}, the value may be ignored"
                )
                .yellow()
            );
        }
    }
}

/// Write collected exports plus the run identity as KEY=VALUE lines
fn write_exports_file(path: &Path, job: &RunningJob, job_url: &str, result: &str) -> Result<()> {
    let mut contents = String::new();
    for (key, value) in job.exports().iter() {
        contents.push_str(&format!("{key}={value}\n"));
    }
    contents.push_str(&format!("JOB_ID={}\n", job.id));
    contents.push_str(&format!("JOB_URL={job_url}\n"));
    contents.push_str(&format!("JOB_RESULT={result}\n"));
    std::fs::write(path, contents)?;
    Ok(())
}
