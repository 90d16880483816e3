//! Launch parameters for a template run

use serde::{Deserialize, Serialize};

/// Optional parameters passed when launching a template
///
/// Every field is optional; only populated fields are sent to the server.
/// `inventory` and `credentials` accept either a numeric ID or a name, and
/// `credentials` may hold several of them separated by commas. The
/// remaining fields are forwarded verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSpec {
    pub extra_vars: Option<String>,
    pub limit: Option<String>,
    pub job_tags: Option<String>,
    pub skip_tags: Option<String>,
    pub job_type: Option<String>,
    pub inventory: Option<String>,
    pub credentials: Option<String>,
}

impl LaunchSpec {
    /// Drop fields that are present but empty
    ///
    /// CI parameter plumbing routinely hands over empty strings for unset
    /// fields. An empty string must behave exactly like an absent field,
    /// so it is normalized away before the launch body is assembled.
    pub fn normalized(self) -> Self {
        fn scrub(field: Option<String>) -> Option<String> {
            field.filter(|value| !value.is_empty())
        }
        Self {
            extra_vars: scrub(self.extra_vars),
            limit: scrub(self.limit),
            job_tags: scrub(self.job_tags),
            skip_tags: scrub(self.skip_tags),
            job_type: scrub(self.job_type),
            inventory: scrub(self.inventory),
            credentials: scrub(self.credentials),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_drops_empty_strings() {
        let spec = LaunchSpec {
            extra_vars: Some(String::new()),
            limit: Some("web*".to_string()),
            job_tags: Some(String::new()),
            ..Default::default()
        };
        let spec = spec.normalized();
        assert_eq!(spec.extra_vars, None);
        assert_eq!(spec.limit.as_deref(), Some("web*"));
        assert_eq!(spec.job_tags, None);
    }

    #[test]
    fn test_normalized_keeps_populated_fields() {
        let spec = LaunchSpec {
            inventory: Some("42".to_string()),
            credentials: Some("deploy-key,vault-pw".to_string()),
            ..Default::default()
        }
        .normalized();
        assert_eq!(spec.inventory.as_deref(), Some("42"));
        assert_eq!(spec.credentials.as_deref(), Some("deploy-key,vault-pw"));
    }
}
