//! Credential classification for launch requests
//!
//! A launch may name several credentials. Tower wants them sorted by
//! credential type, so the machine and vault type IDs are looked up once
//! per launch and every resolved credential is bucketed by its type.

use reqwest::StatusCode;
use serde_json::Value;
use towerline_core::CredentialBucket;
use tracing::{debug, error};

use crate::error::{Result, TowerError};
use crate::{TowerClient, parse_object};

/// Server-assigned IDs of the machine and vault credential types
struct CredentialTypeIds {
    machine: Option<i64>,
    vault: Option<i64>,
}

impl TowerClient {
    /// Sort a comma-separated credential list into typed buckets
    ///
    /// Each entry may be a numeric ID or a unique name. Credentials of
    /// the machine and vault types land in their own buckets; everything
    /// else counts as an extra credential.
    pub(crate) async fn classify_credentials(&self, list: &str) -> Result<CredentialBucket> {
        let types = self.lookup_credential_type_ids().await?;
        let mut bucket = CredentialBucket::default();
        for entry in list.split(',') {
            let record = match self.find_in_collection(entry, "/credentials/").await {
                Ok(record) => record,
                Err(error) if error.is_not_found() => {
                    return Err(TowerError::NotFound(format!(
                        "Credential {entry} does not exist on the server"
                    )));
                }
                Err(error) => return Err(error),
            };
            let id = record.get("id").and_then(Value::as_i64).ok_or_else(|| {
                TowerError::ParseError(format!("credential {entry} returned no usable ID"))
            })?;
            match record.get("credential_type").and_then(Value::as_i64) {
                Some(type_id) if Some(type_id) == types.machine => bucket.machine.push(id),
                Some(type_id) if Some(type_id) == types.vault => bucket.vault.push(id),
                _ => bucket.extra.push(id),
            }
        }
        debug!(
            machine = bucket.machine.len(),
            vault = bucket.vault.len(),
            extra = bucket.extra.len(),
            "classified credentials"
        );
        Ok(bucket)
    }

    /// Look up the IDs of the machine and vault credential types
    ///
    /// The server must report both types. Failing to pick out one of the
    /// two IDs from the response is logged but tolerated; affected
    /// credentials then land in the extra bucket.
    async fn lookup_credential_type_ids(&self) -> Result<CredentialTypeIds> {
        let params = [
            ("or__kind", "ssh".to_string()),
            ("or__kind", "vault".to_string()),
        ];
        let (status, body) = self.get_with_params("/credential_types/", &params).await?;
        if status != StatusCode::OK {
            return Err(TowerError::api_error(status.as_u16(), body));
        }
        let page = parse_object(&body)?;
        if page.get("count").and_then(Value::as_i64) != Some(2) {
            return Err(TowerError::ParseError(
                "could not identify both the machine and vault credential types".to_string(),
            ));
        }
        let mut types = CredentialTypeIds {
            machine: None,
            vault: None,
        };
        if let Some(results) = page.get("results").and_then(Value::as_array) {
            for item in results {
                match item.get("kind").and_then(Value::as_str) {
                    Some("ssh") => types.machine = item.get("id").and_then(Value::as_i64),
                    Some("vault") => types.vault = item.get("id").and_then(Value::as_i64),
                    _ => {}
                }
            }
        }
        if types.machine.is_none() {
            error!("could not identify the machine credential type");
        }
        if types.vault.is_none() {
            error!("could not identify the vault credential type");
        }
        Ok(types)
    }
}
