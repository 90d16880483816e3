//! Credential buckets for launch bodies
//!
//! Tower takes credentials in two wire shapes. The legacy shape has one
//! `credential` scalar, one `vault_credential` scalar and an
//! `extra_credentials` array; it cannot carry more than one machine or
//! vault credential. The combined shape is a single `credentials` array
//! and carries any mix. The bucket picks the shape when encoding.

use serde_json::{Map, Value, json};

/// Credential IDs grouped by their credential type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialBucket {
    pub machine: Vec<i64>,
    pub vault: Vec<i64>,
    pub extra: Vec<i64>,
}

impl CredentialBucket {
    pub fn is_empty(&self) -> bool {
        self.machine.is_empty() && self.vault.is_empty() && self.extra.is_empty()
    }

    /// True when the legacy shape cannot carry this bucket
    pub fn needs_combined_form(&self) -> bool {
        self.machine.len() > 1 || self.vault.len() > 1
    }

    /// Write this bucket into a launch body
    pub fn encode_into(&self, body: &mut Map<String, Value>) {
        if self.needs_combined_form() {
            let all: Vec<i64> = self
                .machine
                .iter()
                .chain(&self.vault)
                .chain(&self.extra)
                .copied()
                .collect();
            body.insert("credentials".to_string(), json!(all));
            return;
        }
        if let Some(id) = self.machine.first() {
            body.insert("credential".to_string(), json!(id));
        }
        if let Some(id) = self.vault.first() {
            body.insert("vault_credential".to_string(), json!(id));
        }
        if !self.extra.is_empty() {
            body.insert("extra_credentials".to_string(), json!(self.extra));
        }
    }
}
