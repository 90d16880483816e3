//! Template kinds and template details
//!
//! Tower exposes two launchable template collections: plain job templates
//! and workflow job templates. The kind decides every endpoint the client
//! touches for a run, so it is a closed enum rather than a free string.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when a template kind string is neither `job` nor `workflow`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("template kind can only be `job` or `workflow`, got `{0}`")]
pub struct InvalidTemplateKind(pub String);

/// The two launchable template collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    Job,
    Workflow,
}

impl TemplateKind {
    /// API collection holding templates of this kind
    pub fn templates_path(&self) -> &'static str {
        match self {
            TemplateKind::Job => "job_templates",
            TemplateKind::Workflow => "workflow_job_templates",
        }
    }

    /// API collection holding runs launched from this kind
    pub fn jobs_path(&self) -> &'static str {
        match self {
            TemplateKind::Job => "jobs",
            TemplateKind::Workflow => "workflow_jobs",
        }
    }

    /// Path segment used in browser-facing job URLs
    pub fn url_segment(&self) -> &'static str {
        match self {
            TemplateKind::Job => "jobs",
            TemplateKind::Workflow => "workflows",
        }
    }

    /// Kind name with a leading capital, for user-facing messages
    pub fn capitalized(&self) -> &'static str {
        match self {
            TemplateKind::Job => "Job",
            TemplateKind::Workflow => "Workflow",
        }
    }
}

impl FromStr for TemplateKind {
    type Err = InvalidTemplateKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "job" => Ok(TemplateKind::Job),
            "workflow" => Ok(TemplateKind::Workflow),
            _ => Err(InvalidTemplateKind(s.to_string())),
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateKind::Job => write!(f, "job"),
            TemplateKind::Workflow => write!(f, "workflow"),
        }
    }
}

/// Template record as returned by the templates collection
///
/// The `ask_*` flags tell whether the template prompts for a field on
/// launch. Each is `None` when the server omits the flag, which older
/// releases do; a warning about a field the template will ignore is only
/// warranted when the flag is present and false.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateDetail {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub ask_variables_on_launch: Option<bool>,
    pub ask_limit_on_launch: Option<bool>,
    pub ask_tags_on_launch: Option<bool>,
    pub ask_skip_tags_on_launch: Option<bool>,
    pub ask_job_type_on_launch: Option<bool>,
    pub ask_inventory_on_launch: Option<bool>,
    pub ask_credential_on_launch: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_kind() {
        assert_eq!("job".parse::<TemplateKind>().unwrap(), TemplateKind::Job);
        assert_eq!(
            "Workflow".parse::<TemplateKind>().unwrap(),
            TemplateKind::Workflow
        );
        assert_eq!("JOB".parse::<TemplateKind>().unwrap(), TemplateKind::Job);
    }

    #[test]
    fn test_parse_kind_rejects_anything_else() {
        let err = "pipeline".parse::<TemplateKind>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "template kind can only be `job` or `workflow`, got `pipeline`"
        );
    }

    #[test]
    fn test_paths() {
        assert_eq!(TemplateKind::Job.templates_path(), "job_templates");
        assert_eq!(TemplateKind::Job.jobs_path(), "jobs");
        assert_eq!(TemplateKind::Job.url_segment(), "jobs");
        assert_eq!(
            TemplateKind::Workflow.templates_path(),
            "workflow_job_templates"
        );
        assert_eq!(TemplateKind::Workflow.jobs_path(), "workflow_jobs");
        assert_eq!(TemplateKind::Workflow.url_segment(), "workflows");
    }

    #[test]
    fn test_template_detail_missing_flags_are_none() {
        let detail: TemplateDetail =
            serde_json::from_value(json!({"id": 7, "name": "deploy"})).unwrap();
        assert_eq!(detail.id, 7);
        assert_eq!(detail.ask_limit_on_launch, None);
        assert_eq!(detail.ask_variables_on_launch, None);
    }

    #[test]
    fn test_template_detail_explicit_flags() {
        let detail: TemplateDetail = serde_json::from_value(json!({
            "id": 7,
            "name": "deploy",
            "ask_variables_on_launch": false,
            "ask_limit_on_launch": true
        }))
        .unwrap();
        assert_eq!(detail.ask_variables_on_launch, Some(false));
        assert_eq!(detail.ask_limit_on_launch, Some(true));
    }
}
