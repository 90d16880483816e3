//! Name and ID lookups against API collections
//!
//! Most launch parameters accept either a numeric ID or a name. Numeric
//! identifiers are fetched directly; names go through the collection's
//! name filter and must match exactly one item.

use reqwest::StatusCode;
use serde_json::Value;
use towerline_core::{TemplateDetail, TemplateKind};
use tracing::debug;

use crate::error::{Result, TowerError};
use crate::{TowerClient, parse_object};

impl TowerClient {
    /// Fetch a template by name or numeric ID
    pub async fn get_template(&self, template: &str, kind: TemplateKind) -> Result<TemplateDetail> {
        let collection = format!("/{}/", kind.templates_path());
        let record = match self.find_in_collection(template, &collection).await {
            Ok(record) => record,
            Err(error) if error.is_not_found() => {
                return Err(TowerError::NotFound(format!(
                    "{} template {template} does not exist on the server",
                    kind.capitalized()
                )));
            }
            Err(error) => return Err(error),
        };
        serde_json::from_value(record).map_err(|error| {
            TowerError::ParseError(format!("template record was malformed: {error}"))
        })
    }

    /// Resolve a name or numeric ID to the item's ID
    pub(crate) async fn resolve_to_id(&self, identifier: &str, collection: &str) -> Result<i64> {
        let record = self.find_in_collection(identifier, collection).await?;
        record
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| TowerError::ParseError(format!("{identifier} returned no usable ID")))
    }

    /// Fetch one item from a collection by numeric ID or unique name
    pub(crate) async fn find_in_collection(
        &self,
        identifier: &str,
        collection: &str,
    ) -> Result<Value> {
        if identifier.parse::<i64>().is_ok() {
            let (status, body) = self.get(&format!("{collection}{identifier}/")).await?;
            if status != StatusCode::OK {
                return Err(TowerError::api_error(status.as_u16(), body));
            }
            let record = parse_object(&body)?;
            if record.get("id").and_then(Value::as_i64).is_none() {
                return Err(TowerError::NotFound(format!(
                    "{identifier} does not exist on the server"
                )));
            }
            return Ok(record);
        }

        debug!(identifier, collection, "looking up item by name");
        let (status, body) = self
            .get_with_params(collection, &[("name", identifier.to_string())])
            .await?;
        if status != StatusCode::OK {
            return Err(TowerError::api_error(status.as_u16(), body));
        }
        let page = parse_object(&body)?;
        let count = page
            .get("count")
            .and_then(Value::as_i64)
            .ok_or_else(|| TowerError::ParseError("lookup response had no count".to_string()))?;
        if count == 0 {
            return Err(TowerError::NotFound(format!(
                "{identifier} does not exist on the server"
            )));
        }
        if count > 1 {
            return Err(TowerError::NotUnique(format!(
                "the name {identifier} matched more than one item"
            )));
        }
        page.get("results")
            .and_then(Value::as_array)
            .and_then(|results| results.first())
            .cloned()
            .ok_or_else(|| TowerError::ParseError("lookup response had no results".to_string()))
    }
}
