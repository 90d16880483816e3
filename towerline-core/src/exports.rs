//! Export extraction from streamed job output
//!
//! Playbooks hand values back to the pipeline by printing marker lines of
//! the form `JENKINS_EXPORT KEY=VALUE` (usually through a debug task) or
//! by setting an artifact under the same marker key. Both routes land in
//! an [`ExportMap`].

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Marker that flags a log line or artifact key as an export
pub const EXPORT_MARKER: &str = "JENKINS_EXPORT";

static ANSI_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[;0-9]*m").expect("ANSI color pattern is valid"));

static MARKER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*JENKINS_EXPORT ").expect("marker prefix pattern is valid"));

/// Remove ANSI color sequences from a line
pub fn strip_ansi(line: &str) -> std::borrow::Cow<'_, str> {
    ANSI_COLOR.replace_all(line, "")
}

/// Extract an exported key/value pair from a log line, if it carries one
///
/// Color sequences are always removed before scanning, regardless of how
/// the line is displayed. The key is whatever follows the last
/// `JENKINS_EXPORT ` marker up to the first `=`; the value is the rest of
/// the line with one surrounding quote pair removed. Marker lines without
/// a `=` yield nothing.
pub fn scan_export_line(line: &str) -> Option<(String, String)> {
    if !line.contains(EXPORT_MARKER) {
        return None;
    }
    let stripped = strip_ansi(line);
    let (key_part, value_part) = stripped.split_once('=')?;
    let key = MARKER_PREFIX.replace(key_part, "").into_owned();
    let value = value_part.strip_suffix('"').unwrap_or(value_part);
    let value = value.strip_prefix('"').unwrap_or(value);
    Some((key, value.to_string()))
}

/// Exported variables collected over the life of a run
///
/// Later writes to the same key replace earlier ones. Iteration order is
/// sorted by key, which keeps generated files stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportMap {
    entries: BTreeMap<String, String>,
}

impl ExportMap {
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Scan one log line and record the export it carries, if any
    pub fn absorb_line(&mut self, line: &str) {
        if let Some((key, value)) = scan_export_line(line) {
            self.entries.insert(key, value);
        }
    }

    /// Merge exports set as job artifacts
    ///
    /// `artifacts` is the job's artifact object; exports live under the
    /// marker key as an array of single-key objects. Any other shape is
    /// ignored.
    pub fn absorb_artifacts(&mut self, artifacts: &Value) {
        let Some(items) = artifacts.get(EXPORT_MARKER).and_then(Value::as_array) else {
            return;
        };
        for item in items {
            let Some(object) = item.as_object() else {
                continue;
            };
            for (key, value) in object {
                let rendered = match value.as_str() {
                    Some(text) => text.to_string(),
                    None => value.to_string(),
                };
                self.entries.insert(key.clone(), rendered);
            }
        }
    }
}
