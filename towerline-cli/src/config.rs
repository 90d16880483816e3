//! CLI configuration
//!
//! Connection settings shared by all commands, assembled from flags and
//! environment variables. CI parameter plumbing routinely hands over
//! empty strings for unset values, so empty settings count as absent.

use anyhow::{Result, bail};
use towerline_client::{ServerProfile, TowerCredentials};

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the Tower / AWX server
    pub base_url: String,
    /// Username for basic authentication
    pub username: Option<String>,
    /// Password for basic authentication
    pub password: Option<String>,
    /// OAuth token; wins over username/password when both are given
    pub oauth_token: Option<String>,
    /// Skip TLS certificate verification
    pub insecure: bool,
}

impl Config {
    /// Check the settings before any request goes out
    pub fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            bail!("the server URL must start with http:// or https://");
        }
        if populated(&self.username).is_some() != populated(&self.password).is_some() {
            bail!("username and password must be provided together");
        }
        Ok(())
    }

    /// Credential material for the client
    pub fn credentials(&self) -> TowerCredentials {
        if let Some(token) = populated(&self.oauth_token) {
            return TowerCredentials::Oauth {
                token: token.clone(),
            };
        }
        if let (Some(username), Some(password)) =
            (populated(&self.username), populated(&self.password))
        {
            return TowerCredentials::Basic {
                username: username.clone(),
                password: password.clone(),
            };
        }
        TowerCredentials::Anonymous
    }

    /// Server profile for the client
    pub fn profile(&self) -> ServerProfile {
        ServerProfile::new(self.base_url.clone())
            .with_credentials(self.credentials())
            .with_trust_all_certs(self.insecure)
    }
}

fn populated(value: &Option<String>) -> Option<&String> {
    value.as_ref().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            base_url: "https://tower.example.com".to_string(),
            username: None,
            password: None,
            oauth_token: None,
            insecure: false,
        }
    }

    #[test]
    fn test_oauth_wins_over_basic() {
        let config = Config {
            username: Some("ci".to_string()),
            password: Some("secret".to_string()),
            oauth_token: Some("token".to_string()),
            ..config()
        };
        assert!(matches!(
            config.credentials(),
            TowerCredentials::Oauth { .. }
        ));
    }

    #[test]
    fn test_empty_strings_count_as_absent() {
        let config = Config {
            username: Some(String::new()),
            password: Some(String::new()),
            oauth_token: Some(String::new()),
            ..config()
        };
        assert!(config.credentials().is_anonymous());
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_a_bare_hostname() {
        let config = Config {
            base_url: "tower.example.com".to_string(),
            ..config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_a_username_without_a_password() {
        let config = Config {
            username: Some("ci".to_string()),
            ..config()
        };
        assert!(config.validate().is_err());
    }
}
