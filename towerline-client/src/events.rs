//! Streaming run output and workflow progress
//!
//! Plain jobs stream through the paged job events collection; workflows
//! stream by walking their nodes and, on request, pulling each finished
//! child's output. Both walks keep their cursor on the [`RunningJob`]
//! handle so repeated polls pick up where the last one stopped.

use std::borrow::Cow;

use reqwest::StatusCode;
use serde_json::Value;
use towerline_core::exports::strip_ansi;
use towerline_core::{ExportMap, TemplateKind};

use crate::error::{Result, TowerError};
use crate::{TowerClient, parse_object};

/// Receives log lines as they stream from the server
///
/// The client pushes every displayable line here; where the lines go is
/// the caller's concern.
pub trait EventSink {
    fn line(&mut self, line: &str);
}

/// Collects lines in memory
impl EventSink for Vec<String> {
    fn line(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

/// How streamed output should be handled
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Forward the run's own output lines to the sink
    pub emit_output: bool,
    /// Remove ANSI color sequences before forwarding
    pub strip_ansi: bool,
    /// Also pull the output of a workflow's finished children
    pub follow_workflow_children: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            emit_output: false,
            strip_ansi: true,
            follow_workflow_children: false,
        }
    }
}

/// Handle on a launched run
///
/// Carries the polling cursors and the exports collected so far. All
/// streaming and status calls take the handle, so several runs can be
/// driven through one client without their cursors mixing.
#[derive(Debug, Clone)]
pub struct RunningJob {
    pub id: i64,
    pub kind: TemplateKind,
    pub(crate) last_event_id: i64,
    pub(crate) last_node_id: i64,
    pub(crate) exports: ExportMap,
}

impl RunningJob {
    /// Handle for a run with the given ID, with fresh cursors
    pub fn new(id: i64, kind: TemplateKind) -> Self {
        Self {
            id,
            kind,
            last_event_id: 0,
            last_node_id: 0,
            exports: ExportMap::default(),
        }
    }

    /// Exports collected from output and artifacts so far
    pub fn exports(&self) -> &ExportMap {
        &self.exports
    }

    /// Highest job event ID streamed so far
    pub fn last_event_id(&self) -> i64 {
        self.last_event_id
    }

    /// Highest workflow node ID already reported
    pub fn last_node_id(&self) -> i64 {
        self.last_node_id
    }
}

impl TowerClient {
    /// Stream output that appeared since the last poll
    ///
    /// Dispatches on the kind of run the handle points at. Every event is
    /// forwarded at most once across repeated calls.
    pub async fn poll_events(
        &self,
        job: &mut RunningJob,
        options: &StreamOptions,
        sink: &mut dyn EventSink,
    ) -> Result<()> {
        match job.kind {
            TemplateKind::Job => {
                self.stream_job_events(
                    job.id,
                    &mut job.last_event_id,
                    &mut job.exports,
                    options,
                    sink,
                )
                .await
            }
            TemplateKind::Workflow => self.stream_workflow_nodes(job, options, sink).await,
        }
    }

    /// Drain new events of a plain job, following pagination to the end
    ///
    /// Asks only for events past the cursor and advances the cursor to
    /// the highest event ID seen.
    async fn stream_job_events(
        &self,
        job_id: i64,
        cursor: &mut i64,
        exports: &mut ExportMap,
        options: &StreamOptions,
        sink: &mut dyn EventSink,
    ) -> Result<()> {
        loop {
            let endpoint = format!("/jobs/{job_id}/job_events/");
            let (status, body) = self
                .get_with_params(&endpoint, &[("id__gt", cursor.to_string())])
                .await?;
            if status != StatusCode::OK {
                return Err(TowerError::api_error(status.as_u16(), body));
            }
            let page = parse_object(&body)?;
            let more = page
                .get("next")
                .is_some_and(|next| !next.is_null() && next.as_str() != Some("null"));
            let mut saw_events = false;
            if let Some(events) = page.get("results").and_then(Value::as_array) {
                for event in events {
                    saw_events = true;
                    let event_id = event.get("id").and_then(Value::as_i64).ok_or_else(|| {
                        TowerError::ParseError("job event carried no ID".to_string())
                    })?;
                    if let Some(stdout) = event.get("stdout").and_then(Value::as_str) {
                        forward_output(stdout, options, exports, sink);
                    }
                    if event_id > *cursor {
                        *cursor = event_id;
                    }
                }
            }
            // An empty page cannot advance the cursor, so following its
            // next link would repeat the same request.
            if !more || !saw_events {
                return Ok(());
            }
        }
    }

    /// Report workflow nodes that finished since the last poll
    ///
    /// Nodes are walked in ID order and the walk stops at the first node
    /// whose job has not finished yet, even if later nodes already have.
    /// A branch that finishes early is therefore reported only once every
    /// node before it is done, and nothing is skipped over.
    async fn stream_workflow_nodes(
        &self,
        job: &mut RunningJob,
        options: &StreamOptions,
        sink: &mut dyn EventSink,
    ) -> Result<()> {
        let endpoint = format!("/workflow_jobs/{}/workflow_nodes/", job.id);
        let (status, body) = self
            .get_with_params(&endpoint, &[("id__gt", job.last_node_id.to_string())])
            .await?;
        if status != StatusCode::OK {
            return Err(TowerError::api_error(status.as_u16(), body));
        }
        let page = parse_object(&body)?;
        let Some(nodes) = page.get("results").and_then(Value::as_array) else {
            return Ok(());
        };
        for node in nodes {
            let node_id = node
                .get("id")
                .and_then(Value::as_i64)
                .ok_or_else(|| TowerError::ParseError("workflow node carried no ID".to_string()))?;
            // Nodes without an embedded job summary carry no output.
            let Some(summary) = node.get("summary_fields") else {
                continue;
            };
            let Some(child_type) = summary
                .get("unified_job_template")
                .and_then(|template| template.get("unified_job_type"))
                .and_then(Value::as_str)
            else {
                continue;
            };
            let Some(child) = summary.get("job").filter(|child| !child.is_null()) else {
                return Ok(());
            };
            let Some(child_status) = child.get("status").and_then(Value::as_str) else {
                return Ok(());
            };
            if child_status.eq_ignore_ascii_case("running")
                || child_status.eq_ignore_ascii_case("pending")
            {
                return Ok(());
            }
            if node_id > job.last_node_id {
                job.last_node_id = node_id;
            }
            let child_id = child.get("id").and_then(Value::as_i64).ok_or_else(|| {
                TowerError::ParseError("workflow node job carried no ID".to_string())
            })?;
            let child_name = child.get("name").and_then(Value::as_str).ok_or_else(|| {
                TowerError::ParseError("workflow node job carried no name".to_string())
            })?;
            sink.line(&format!(
                "{child_name} => {child_status} {}",
                self.job_url(child_id, TemplateKind::Job)
            ));
            if options.follow_workflow_children {
                self.stream_child_output(child_id, child_type, job, options, sink)
                    .await?;
            }
            sink.line("");
            sink.line("");
        }
        Ok(())
    }

    /// Pull a finished child's output into the stream
    async fn stream_child_output(
        &self,
        child_id: i64,
        child_type: &str,
        job: &mut RunningJob,
        options: &StreamOptions,
        sink: &mut dyn EventSink,
    ) -> Result<()> {
        match child_type {
            "job" => {
                // The child is already terminal, so one pass drains it.
                let mut child_cursor = 0;
                self.stream_job_events(child_id, &mut child_cursor, &mut job.exports, options, sink)
                    .await
            }
            "project_update" => {
                let endpoint = format!("/project_updates/{child_id}/");
                self.stream_unified_stdout(&endpoint, options, &mut job.exports, sink)
                    .await
            }
            "inventory_update" => {
                let endpoint = format!("/inventory_updates/{child_id}/");
                self.stream_unified_stdout(&endpoint, options, &mut job.exports, sink)
                    .await
            }
            other => {
                sink.line(&format!("Unknown job type in workflow: {other}"));
                Ok(())
            }
        }
    }

    /// Forward the recorded stdout of a project or inventory update
    async fn stream_unified_stdout(
        &self,
        endpoint: &str,
        options: &StreamOptions,
        exports: &mut ExportMap,
        sink: &mut dyn EventSink,
    ) -> Result<()> {
        let (status, body) = self.get(endpoint).await?;
        if status != StatusCode::OK {
            return Err(TowerError::api_error(status.as_u16(), body));
        }
        let record = parse_object(&body)?;
        if let Some(stdout) = record.get("result_stdout").and_then(Value::as_str) {
            forward_output(stdout, options, exports, sink);
        }
        Ok(())
    }
}

/// Split an event's stdout block and forward each line
///
/// Lines are always scanned for exports, whether or not they reach the
/// sink.
fn forward_output(
    stdout: &str,
    options: &StreamOptions,
    exports: &mut ExportMap,
    sink: &mut dyn EventSink,
) {
    for line in stdout.split("\r\n") {
        if options.emit_output {
            let shown: Cow<'_, str> = if options.strip_ansi {
                strip_ansi(line)
            } else {
                Cow::Borrowed(line)
            };
            sink.line(&shown);
        }
        exports.absorb_line(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(emit_output: bool, strip: bool) -> StreamOptions {
        StreamOptions {
            emit_output,
            strip_ansi: strip,
            follow_workflow_children: false,
        }
    }

    #[test]
    fn test_forward_output_splits_on_crlf() {
        let mut exports = ExportMap::default();
        let mut lines: Vec<String> = Vec::new();
        forward_output("one\r\ntwo", &options(true, true), &mut exports, &mut lines);
        assert_eq!(lines, ["one", "two"]);
    }

    #[test]
    fn test_forward_output_strips_color_for_display() {
        let mut exports = ExportMap::default();
        let mut lines: Vec<String> = Vec::new();
        forward_output(
            "\u{1b}[0;32mok\u{1b}[0m",
            &options(true, true),
            &mut exports,
            &mut lines,
        );
        assert_eq!(lines, ["ok"]);
    }

    #[test]
    fn test_forward_output_keeps_color_when_asked() {
        let mut exports = ExportMap::default();
        let mut lines: Vec<String> = Vec::new();
        forward_output(
            "\u{1b}[0;32mok\u{1b}[0m",
            &options(true, false),
            &mut exports,
            &mut lines,
        );
        assert_eq!(lines, ["\u{1b}[0;32mok\u{1b}[0m"]);
    }

    #[test]
    fn test_forward_output_scans_exports_even_when_silent() {
        let mut exports = ExportMap::default();
        let mut lines: Vec<String> = Vec::new();
        forward_output(
            "JENKINS_EXPORT FOO=bar",
            &options(false, true),
            &mut exports,
            &mut lines,
        );
        assert!(lines.is_empty());
        assert_eq!(exports.get("FOO"), Some("bar"));
    }

    #[test]
    fn test_running_job_starts_with_fresh_cursors() {
        let job = RunningJob::new(42, TemplateKind::Workflow);
        assert_eq!(job.last_event_id(), 0);
        assert_eq!(job.last_node_id(), 0);
        assert!(job.exports().is_empty());
    }
}
