//! Run completion and outcome checks

use reqwest::StatusCode;
use serde_json::Value;

use crate::error::{Result, TowerError};
use crate::events::RunningJob;
use crate::{TowerClient, parse_object};

impl TowerClient {
    /// Check whether a run has finished
    ///
    /// A run counts as finished once its `finished` timestamp is set. On
    /// completion any exports the run published as artifacts are merged
    /// into the handle.
    pub async fn is_completed(&self, job: &mut RunningJob) -> Result<bool> {
        let detail = self.job_detail(job).await?;
        let finished = detail.get("finished").ok_or_else(|| {
            TowerError::ParseError("job status response carried no finished field".to_string())
        })?;
        let completed = !finished.is_null() && finished.as_str() != Some("null");
        if completed {
            if let Some(artifacts) = detail.get("artifacts") {
                job.exports.absorb_artifacts(artifacts);
            }
        }
        Ok(completed)
    }

    /// Check whether a finished run failed
    pub async fn is_failed(&self, job: &RunningJob) -> Result<bool> {
        let detail = self.job_detail(job).await?;
        detail.get("failed").and_then(Value::as_bool).ok_or_else(|| {
            TowerError::ParseError("job status response carried no failed field".to_string())
        })
    }

    async fn job_detail(&self, job: &RunningJob) -> Result<Value> {
        let endpoint = format!("/{}/{}/", job.kind.jobs_path(), job.id);
        let (status, body) = self.get(&endpoint).await?;
        if status != StatusCode::OK {
            return Err(TowerError::api_error(status.as_u16(), body));
        }
        parse_object(&body)
    }
}
