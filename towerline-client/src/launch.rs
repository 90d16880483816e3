//! Launching template runs

use reqwest::StatusCode;
use serde_json::{Map, Value, json};
use towerline_core::{LaunchSpec, TemplateKind};
use tracing::info;

use crate::error::{Result, TowerError};
use crate::events::RunningJob;
use crate::{TowerClient, parse_object};

impl TowerClient {
    /// Launch a template and return a handle on the new run
    ///
    /// Only populated, non-empty launch fields are sent. `inventory` is
    /// resolved to an ID first and the credential list is classified into
    /// whichever wire shape the mix of credential types requires; the
    /// remaining fields go out verbatim.
    pub async fn launch(
        &self,
        template_id: i64,
        spec: &LaunchSpec,
        kind: TemplateKind,
    ) -> Result<RunningJob> {
        let body = self.build_launch_body(spec).await?;
        let endpoint = format!("/{}/{}/launch/", kind.templates_path(), template_id);
        let (status, response) = self.post(&endpoint, &Value::Object(body)).await?;
        match status {
            StatusCode::CREATED => {
                let parsed = parse_object(&response)?;
                let job_id = parsed.get("id").and_then(Value::as_i64).ok_or_else(|| {
                    TowerError::ParseError("launch response carried no job ID".to_string())
                })?;
                info!(job_id, kind = %kind, "launched template run");
                Ok(RunningJob::new(job_id, kind))
            }
            StatusCode::BAD_REQUEST => Err(reject_launch(&response)),
            _ => Err(TowerError::api_error(status.as_u16(), response)),
        }
    }

    async fn build_launch_body(&self, spec: &LaunchSpec) -> Result<Map<String, Value>> {
        let mut body = Map::new();
        if let Some(inventory) = populated(&spec.inventory) {
            let id = match self.resolve_to_id(inventory, "/inventories/").await {
                Ok(id) => id,
                Err(error) if error.is_not_found() => {
                    return Err(TowerError::NotFound(format!(
                        "Inventory {inventory} does not exist on the server"
                    )));
                }
                Err(error) => return Err(error),
            };
            body.insert("inventory".to_string(), json!(id));
        }
        if let Some(credentials) = populated(&spec.credentials) {
            let bucket = self.classify_credentials(credentials).await?;
            bucket.encode_into(&mut body);
        }
        if let Some(limit) = populated(&spec.limit) {
            body.insert("limit".to_string(), json!(limit));
        }
        if let Some(job_tags) = populated(&spec.job_tags) {
            body.insert("job_tags".to_string(), json!(job_tags));
        }
        if let Some(skip_tags) = populated(&spec.skip_tags) {
            body.insert("skip_tags".to_string(), json!(skip_tags));
        }
        if let Some(job_type) = populated(&spec.job_type) {
            body.insert("job_type".to_string(), json!(job_type));
        }
        if let Some(extra_vars) = populated(&spec.extra_vars) {
            body.insert("extra_vars".to_string(), json!(extra_vars));
        }
        Ok(body)
    }
}

fn populated(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}

/// Map a launch rejection body onto the right error
///
/// A rejection that names `extra_vars` gets its own error so callers can
/// point at the variables instead of the launch as a whole.
fn reject_launch(response: &str) -> TowerError {
    if let Ok(parsed) = serde_json::from_str::<Value>(response) {
        if let Some(detail) = parsed.get("extra_vars") {
            return TowerError::ExtraVarsRejected(detail.to_string());
        }
    }
    TowerError::BadRequest(response.to_string())
}
